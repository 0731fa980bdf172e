use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::comm::Communicator;
use crate::error::Error;
use crate::select::introselect;

/// Draws the per-level random subsamples and turns them into a pivot pair.
///
/// The generator is owned by the sampler and kept across recursion levels
/// and pivot retries, so a redraw at a stuck level produces a different
/// sample. Tests inject deterministic generators through the `R` parameter.
pub(crate) struct PivotSampler<R: Rng> {
    rng: R,
}

impl PivotSampler<StdRng> {
    /// Default sampler: deterministic per rank, identical across runs.
    pub fn seeded_for(rank: usize) -> Self {
        PivotSampler::new(StdRng::seed_from_u64(rank as u64))
    }
}

impl<R: Rng> PivotSampler<R> {
    pub fn new(rng: R) -> Self {
        PivotSampler { rng }
    }

    /// Computes a pivot pair `(lo, hi)` with `lo <= hi` that brackets the
    /// global rank `k` with high probability.
    ///
    /// Every rank draws `min(⌈sample_total / P⌉, |local|)` values uniformly
    /// with replacement; the samples are gathered onto the root, which
    /// selects the order statistics at the scaled rank ⌊k·S/N⌋ widened by a
    /// margin of ⌈√(S·ln N)⌉ on both sides, and broadcasts the pair. The
    /// second selection runs on the buffer the first one reordered, which
    /// is fine: selection is insensitive to the input permutation.
    pub fn pivot_pair<C: Communicator>(
        &mut self,
        comm: &C,
        local: &[f64],
        total: i64,
        k: i64,
        sample_total: i64,
    ) -> Result<(f64, f64), Error> {
        let per_rank = ceil_div(sample_total, comm.size() as i64) as usize;
        let drawn = per_rank.min(local.len());
        let mut sample = Vec::with_capacity(drawn);
        for _ in 0..drawn {
            sample.push(local[self.rng.gen_range(0..local.len())]);
        }

        let counts = comm.gather_counts(drawn)?;
        let pooled = comm.gather_varcount(&sample, counts.as_deref())?;

        let mut pair = [0.0f64; 2];
        if let Some(mut pool) = pooled {
            let s = pool.len() as i64;
            let scaled = (k as f64 * (s as f64 / total as f64)).floor() as i64;
            let margin = (s as f64 * (total as f64).ln()).sqrt().ceil() as i64;
            let k1 = (scaled - margin).max(0);
            let k2 = (scaled + margin).min(s - 1);
            pair[0] = introselect::select_nth(&mut pool, k1 as usize);
            pair[1] = introselect::select_nth(&mut pool, k2 as usize);
        }
        comm.broadcast(&mut pair)?;

        debug_assert!(pair[0] <= pair[1]);
        Ok((pair[0], pair[1]))
    }
}

fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}
