//! Backend contracts for tessera
//!
//! This crate defines the two external collaborators the core consumes,
//! plus reference in-memory implementations:
//! - [`SortedStore`]: partitioned sorted rows with atomic insert-if-absent
//! - [`LeaseStore`]: leasable records with opaque metadata, the
//!   distributed mutex the transaction layer is built on
//! - [`with_lease`]: scoped acquisition with release on every exit path
//!
//! Remote adapters implement the same traits; the in-memory stores are the
//! reference semantics every adapter must match.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lease;
pub mod memory;
pub mod sorted;

pub use lease::{with_lease, LeaseStore, LeaseToken};
pub use memory::{MemoryLeaseStore, MemorySortedStore};
pub use sorted::{Row, SortedStore};
