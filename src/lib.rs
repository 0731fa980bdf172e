//! Distributed selection of order statistics.
//!
//! The crate computes the k-th smallest element of a multiset of `f64`
//! values partitioned across the processes of a message-passing cluster,
//! where k is derived from a quantile fraction q ∈ [0, 1]. Small inputs are
//! gathered onto a root process and solved directly; large inputs are
//! reduced level by level through random sampling and three-way pivot
//! partitioning, so no process ever materializes the global array.
//!
//! The message-passing runtime is injected through the [`Communicator`]
//! trait. [`ThreadComm`] simulates a cluster with OS threads (used by the
//! test suite); the `mpi` cargo feature adds a backend over a real MPI
//! world.

mod comm;
mod error;
mod quantile;
mod select;

#[cfg(feature = "mpi")]
pub use comm::MpiComm;
pub use comm::{CommError, Communicator, ThreadComm};
pub use error::Error;
pub use quantile::{quantile, quantile_with};
pub use rand;
pub use select::SelectOptions;
