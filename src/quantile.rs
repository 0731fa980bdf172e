use crate::comm::Communicator;
use crate::error::Error;
use crate::select::{self, PivotSampler, SelectOptions};

/// Computes the q-quantile of a distributed multiset of `f64` values.
///
/// Must be called collectively by every process of `comm` with the same
/// `total_size` and `q`; every process receives the identical result. The
/// returned value is an element of the global multiset with 0-based sorted
/// rank `⌊q·total_size⌋`; `q = 1` is clamped to rank `total_size - 1`, so
/// it returns the maximum. The caller's slice is never mutated.
///
/// `local` may be empty on any subset of processes (including all but
/// one); only the global picture matters.
///
/// # Errors
/// - [`Error::QuantileOutOfRange`] if `q ∉ [0, 1]`;
/// - [`Error::EmptySelection`] if `total_size < 1`;
/// - [`Error::SizeMismatch`] if the local lengths do not sum to
///   `total_size` across the cluster;
/// - [`Error::NanInput`] if any process holds a NaN; detected through a
///   collective reduction, so every process observes the same failure;
/// - [`Error::Comm`] if the transport fails.
pub fn quantile<C: Communicator>(
    comm: &C,
    local: &[f64],
    total_size: i64,
    q: f64,
) -> Result<f64, Error> {
    quantile_with(comm, local, total_size, q, &SelectOptions::default())
}

/// [`quantile`] with explicit tuning knobs. The defaults of
/// [`SelectOptions`] reproduce `quantile` exactly.
pub fn quantile_with<C: Communicator>(
    comm: &C,
    local: &[f64],
    total_size: i64,
    q: f64,
    opts: &SelectOptions,
) -> Result<f64, Error> {
    if !(0.0..=1.0).contains(&q) {
        return Err(Error::QuantileOutOfRange(q));
    }
    if total_size < 1 {
        return Err(Error::EmptySelection(total_size));
    }

    // One fused reduction decides both precondition checks globally, so a
    // violation visible to a single process still fails every process.
    let nan_count = local.iter().filter(|v| v.is_nan()).count() as i64;
    let mut reduced = [0i64; 2];
    comm.all_reduce_sum(&[local.len() as i64, nan_count], &mut reduced)?;
    if reduced[1] > 0 {
        return Err(Error::NanInput);
    }
    if reduced[0] != total_size {
        return Err(Error::SizeMismatch {
            declared: total_size,
            actual: reduced[0],
        });
    }

    // ⌊q·N⌋, clamped: q = 1 would index one past the end
    let k = ((total_size as f64 * q).floor() as i64).min(total_size - 1);

    let mut sampler = PivotSampler::seeded_for(comm.rank());
    select::select_nth_global(comm, local.to_vec(), k, &mut sampler, opts)
}
