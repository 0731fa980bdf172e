use std::error::Error as StdError;
use std::fmt;

use crate::comm::CommError;

/// Failure modes of a distributed selection.
///
/// A selection either returns the exact order statistic on every process or
/// fails with one of these; partial results are never produced. The
/// precondition variants are raised identically on all processes (size and
/// NaN checks go through a collective reduction), so error paths never
/// diverge across the cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Quantile fraction outside [0, 1].
    QuantileOutOfRange(f64),
    /// The declared global size was zero or negative.
    EmptySelection(i64),
    /// Declared global size disagrees with the reduced sum of local sizes.
    SizeMismatch {
        /// Size the caller declared.
        declared: i64,
        /// Sum of local slice lengths across all processes.
        actual: i64,
    },
    /// NaN values in the input; `<` is not a total order over them and the
    /// partition counts would no longer tile the input.
    NanInput,
    /// Bucket counts no longer tile the current level. Indicates data
    /// corruption or a broken reduction, not a recoverable pivot failure.
    CountMismatch {
        /// Global counts of the three pivot buckets.
        counts: [i64; 3],
        /// Global size of the current recursion level.
        total: i64,
    },
    /// The underlying collective transport failed.
    Comm(CommError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::QuantileOutOfRange(q) => {
                write!(f, "quantile fraction {} is outside [0, 1]", q)
            }
            Error::EmptySelection(n) => {
                write!(f, "cannot select from a global array of size {}", n)
            }
            Error::SizeMismatch { declared, actual } => write!(
                f,
                "declared global size {} but local slices sum to {}",
                declared, actual
            ),
            Error::NanInput => write!(f, "input data contains NaN"),
            Error::CountMismatch { counts, total } => write!(
                f,
                "pivot bucket counts {:?} do not sum to level size {}",
                counts, total
            ),
            Error::Comm(e) => write!(f, "collective transport error: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Comm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for Error {
    fn from(e: CommError) -> Self {
        Error::Comm(e)
    }
}
