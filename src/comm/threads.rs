use std::sync::{Arc, Barrier, Mutex, MutexGuard};
use std::thread;

use super::{CommError, Communicator, ROOT};

/// A process group simulated with OS threads.
///
/// Each simulated process owns one `ThreadComm` handle; the handles share a
/// slot vector per payload type and a barrier. A collective runs in two
/// barrier-separated phases: every rank deposits its contribution into its
/// own slot, then every rank reads the slots it needs. The second barrier
/// ends the read phase, so the next collective may overwrite the slots
/// without racing a slow reader.
///
/// This is the in-memory stand-in for a message-passing runtime; the whole
/// test suite runs on it.
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

struct Shared {
    size: usize,
    barrier: Barrier,
    ints: Mutex<Vec<Vec<i64>>>,
    floats: Mutex<Vec<Vec<f64>>>,
}

impl ThreadComm {
    /// Creates the handles of a `size`-process group. Handle `i` acts as
    /// rank `i`; each must be driven from its own thread.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0, "a process group needs at least one member");
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            ints: Mutex::new(vec![Vec::new(); size]),
            floats: Mutex::new(vec![Vec::new(); size]),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// Runs `f` once per rank on a scoped thread and returns the results in
    /// rank order. Panics if any rank panics.
    pub fn run<T, F>(size: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(ThreadComm) -> T + Sync,
    {
        let group = Self::group(size);
        thread::scope(|scope| {
            let handles: Vec<_> = group
                .into_iter()
                .map(|comm| {
                    let f = &f;
                    scope.spawn(move || f(comm))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("cluster thread panicked"))
                .collect()
        })
    }

    fn ints(&self) -> Result<MutexGuard<'_, Vec<Vec<i64>>>, CommError> {
        self.shared.ints.lock().map_err(|_| CommError::Poisoned)
    }

    fn floats(&self) -> Result<MutexGuard<'_, Vec<Vec<f64>>>, CommError> {
        self.shared.floats.lock().map_err(|_| CommError::Poisoned)
    }
}

impl Communicator for ThreadComm {
    fn size(&self) -> usize {
        self.shared.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn all_reduce_sum(&self, contrib: &[i64], out: &mut [i64]) -> Result<(), CommError> {
        assert_eq!(contrib.len(), out.len());
        self.ints()?[self.rank] = contrib.to_vec();
        self.shared.barrier.wait();
        {
            let slots = self.ints()?;
            out.fill(0);
            for slot in slots.iter() {
                for (acc, v) in out.iter_mut().zip(slot) {
                    *acc += v;
                }
            }
        }
        self.shared.barrier.wait();
        Ok(())
    }

    fn broadcast(&self, buf: &mut [f64]) -> Result<(), CommError> {
        if self.rank == ROOT {
            self.floats()?[ROOT] = buf.to_vec();
        }
        self.shared.barrier.wait();
        if self.rank != ROOT {
            buf.copy_from_slice(&self.floats()?[ROOT]);
        }
        self.shared.barrier.wait();
        Ok(())
    }

    fn gather_counts(&self, count: usize) -> Result<Option<Vec<usize>>, CommError> {
        self.ints()?[self.rank] = vec![count as i64];
        self.shared.barrier.wait();
        let gathered = if self.rank == ROOT {
            let slots = self.ints()?;
            Some(slots.iter().map(|slot| slot[0] as usize).collect())
        } else {
            None
        };
        self.shared.barrier.wait();
        Ok(gathered)
    }

    fn gather_varcount(
        &self,
        values: &[f64],
        counts: Option<&[usize]>,
    ) -> Result<Option<Vec<f64>>, CommError> {
        // A root without its count vector still has to complete both
        // barrier phases, or the rest of the group deadlocks.
        let missing = self.rank == ROOT && counts.is_none();
        self.floats()?[self.rank] = values.to_vec();
        self.shared.barrier.wait();
        let gathered = match (self.rank == ROOT, counts) {
            (true, Some(counts)) => {
                let total = counts.iter().sum();
                let slots = self.floats()?;
                let mut buffer = Vec::with_capacity(total);
                for slot in slots.iter() {
                    buffer.extend_from_slice(slot);
                }
                debug_assert_eq!(buffer.len(), total);
                Some(buffer)
            }
            _ => None,
        };
        self.shared.barrier.wait();
        if missing {
            return Err(CommError::MissingCounts);
        }
        Ok(gathered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_vectors_elementwise() {
        let sums = ThreadComm::run(4, |comm| {
            let rank = comm.rank() as i64;
            let mut out = [0i64; 2];
            comm.all_reduce_sum(&[rank, 1], &mut out).unwrap();
            out
        });
        // 0 + 1 + 2 + 3 = 6, and every rank counted once
        assert!(sums.iter().all(|&s| s == [6, 4]));
    }

    #[test]
    fn broadcast_overwrites_non_root() {
        let seen = ThreadComm::run(3, |comm| {
            let mut buf = if comm.rank() == 0 {
                [2.5, -1.0]
            } else {
                [f64::MAX, f64::MAX]
            };
            comm.broadcast(&mut buf).unwrap();
            buf
        });
        assert!(seen.iter().all(|&b| b == [2.5, -1.0]));
    }

    #[test]
    fn gathers_counts_on_root_only() {
        let gathered = ThreadComm::run(3, |comm| comm.gather_counts(comm.rank() * 10).unwrap());
        assert_eq!(gathered[0].as_deref(), Some(&[0, 10, 20][..]));
        assert_eq!(gathered[1], None);
        assert_eq!(gathered[2], None);
    }

    #[test]
    fn varcount_gather_concatenates_in_rank_order() {
        let gathered = ThreadComm::run(3, |comm| {
            let values: Vec<f64> = (0..comm.rank()).map(|i| i as f64).collect();
            let counts = comm.gather_counts(values.len()).unwrap();
            comm.gather_varcount(&values, counts.as_deref()).unwrap()
        });
        // rank 0 contributes nothing, rank 1 [0.0], rank 2 [0.0, 1.0]
        assert_eq!(gathered[0].as_deref(), Some(&[0.0, 0.0, 1.0][..]));
        assert_eq!(gathered[1], None);
    }

    #[test]
    fn root_must_supply_counts_for_varcount() {
        let results = ThreadComm::run(2, |comm| comm.gather_varcount(&[1.0], None));
        assert_eq!(results[0], Err(CommError::MissingCounts));
        assert_eq!(results[1], Ok(None));
    }

    #[test]
    fn consecutive_collectives_do_not_mix_slots() {
        let outputs = ThreadComm::run(2, |comm| {
            let mut first = [0i64];
            comm.all_reduce_sum(&[1], &mut first).unwrap();
            let mut second = [0i64];
            comm.all_reduce_sum(&[comm.rank() as i64 + 5], &mut second).unwrap();
            (first[0], second[0])
        });
        assert!(outputs.iter().all(|&o| o == (2, 11)));
    }
}
