//! Collective transport.
//!
//! The selection algorithm is single-program-multiple-data: every process
//! executes the same sequence of collective operations in lockstep, and the
//! collectives are its only synchronization points. This module defines the
//! small set of primitives the algorithm needs and keeps the actual
//! runtime injectable, so the test suite can stand up a cluster out of OS
//! threads while production runs over MPI.

mod threads;

#[cfg(feature = "mpi")]
mod mpi;

#[cfg(feature = "mpi")]
pub use mpi::MpiComm;
pub use threads::ThreadComm;

use std::error::Error as StdError;
use std::fmt;

/// Rank of the process that performs pivot selection and the gathered
/// small-case selection.
pub(crate) const ROOT: usize = 0;

/// Failure of a collective primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    /// A peer process panicked while holding the shared collective state.
    Poisoned,
    /// The root called a variable-count gather without the count vector it
    /// gathered beforehand.
    MissingCounts,
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommError::Poisoned => {
                write!(f, "collective state poisoned by a crashed peer")
            }
            CommError::MissingCounts => {
                write!(f, "variable-count gather on root requires the gathered counts")
            }
        }
    }
}

impl StdError for CommError {}

/// The collective primitives the selection algorithm runs on.
///
/// All operations are synchronizing: every process of the group must call
/// the same sequence of collectives with compatible arguments, or the group
/// deadlocks. The trait deliberately mirrors the MPI collectives actually
/// used (`MPI_Allreduce`, `MPI_Bcast`, `MPI_Gather`, `MPI_Gatherv`) so a
/// real MPI world drops in without adaptation.
pub trait Communicator {
    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// Rank of the calling process, in `[0, size)`.
    fn rank(&self) -> usize;

    /// Element-wise sum of `contrib` across all processes; every process
    /// receives the reduced vector in `out`. `contrib` and `out` must have
    /// the same length on every process.
    fn all_reduce_sum(&self, contrib: &[i64], out: &mut [i64]) -> Result<(), CommError>;

    /// One-to-all broadcast from the root. On the root `buf` is the source;
    /// on every other process it is overwritten with the root's values.
    fn broadcast(&self, buf: &mut [f64]) -> Result<(), CommError>;

    /// Gathers one count per process onto the root, in rank order. Returns
    /// `Some` on the root and `None` everywhere else.
    fn gather_counts(&self, count: usize) -> Result<Option<Vec<usize>>, CommError>;

    /// Variable-count gather of `values` onto the root, concatenated in
    /// rank order. The root passes the per-rank counts it obtained from
    /// [`gather_counts`](Communicator::gather_counts) so it can size the
    /// receive buffer; other processes pass `None` and get `None` back.
    fn gather_varcount(
        &self,
        values: &[f64],
        counts: Option<&[usize]>,
    ) -> Result<Option<Vec<f64>>, CommError>;
}
