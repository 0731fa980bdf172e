use mpi::collective::SystemOperation;
use mpi::datatype::PartitionMut;
use mpi::environment::Universe;
use mpi::topology::SystemCommunicator;
// The rsmpi communicator trait would shadow ours; import it anonymously.
use mpi::traits::{Communicator as _, CommunicatorCollectives, Root};
use mpi::Count;

use super::{CommError, Communicator, ROOT};

/// Collective transport over the system MPI world.
///
/// Counts travel as `u64` on the wire (`usize` has no MPI datatype) and are
/// converted to `Count` for the variable-length gather.
pub struct MpiComm {
    // Dropping the universe finalizes MPI, so it must outlive the world.
    #[allow(unused)]
    universe: Universe,
    world: SystemCommunicator,
}

impl MpiComm {
    /// Initializes the MPI runtime and binds to the world communicator.
    /// Returns `None` if MPI was already initialized in this process.
    pub fn init() -> Option<Self> {
        let universe = mpi::initialize()?;
        let world = universe.world();
        Some(MpiComm { universe, world })
    }
}

impl Communicator for MpiComm {
    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn all_reduce_sum(&self, contrib: &[i64], out: &mut [i64]) -> Result<(), CommError> {
        self.world
            .all_reduce_into(contrib, out, SystemOperation::sum());
        Ok(())
    }

    fn broadcast(&self, buf: &mut [f64]) -> Result<(), CommError> {
        self.world.process_at_rank(ROOT as i32).broadcast_into(buf);
        Ok(())
    }

    fn gather_counts(&self, count: usize) -> Result<Option<Vec<usize>>, CommError> {
        let root = self.world.process_at_rank(ROOT as i32);
        let send = count as u64;
        if self.rank() == ROOT {
            let mut counts = vec![0u64; self.size()];
            root.gather_into_root(&send, &mut counts[..]);
            Ok(Some(counts.into_iter().map(|c| c as usize).collect()))
        } else {
            root.gather_into(&send);
            Ok(None)
        }
    }

    fn gather_varcount(
        &self,
        values: &[f64],
        counts: Option<&[usize]>,
    ) -> Result<Option<Vec<f64>>, CommError> {
        let root = self.world.process_at_rank(ROOT as i32);
        if self.rank() == ROOT {
            let counts = counts.ok_or(CommError::MissingCounts)?;
            let counts: Vec<Count> = counts.iter().map(|&c| c as Count).collect();
            let displs: Vec<Count> = counts
                .iter()
                .scan(0, |acc, &c| {
                    let d = *acc;
                    *acc += c;
                    Some(d)
                })
                .collect();
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let mut buffer = vec![0.0f64; total];
            {
                let mut partition = PartitionMut::new(&mut buffer[..], &counts[..], &displs[..]);
                root.gather_varcount_into_root(values, &mut partition);
            }
            Ok(Some(buffer))
        } else {
            root.gather_varcount_into(values);
            Ok(None)
        }
    }
}
