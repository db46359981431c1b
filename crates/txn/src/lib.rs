//! Serializable-snapshot-isolation transaction layer for tessera
//!
//! This crate implements the transaction coordinator:
//! - [`DescriptorStore`]: descriptor read-modify-write under leases, with
//!   one canonical acquisition order for two-descriptor sections
//! - [`Transaction`]: read/write/commit with rw-antidependency tracking
//!
//! Every read and write inspects the transactions it races with and
//! records conflict edges in the shared descriptors; commit turns the
//! accumulated flags into the final status. A transaction carrying both
//! an incoming and an outgoing edge is the pivot of a dangerous structure
//! and completes with failure.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptors;
pub mod transaction;

pub use descriptors::DescriptorStore;
pub use transaction::Transaction;
