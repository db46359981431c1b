//! # Tessera
//!
//! Multi-version key-value store with serializable snapshot isolation
//! over a shared sorted backend.
//!
//! Tessera lets many independent processes run serializable transactions
//! against shared keys with no central lock manager. The only
//! synchronization points are the backend's atomic insert-if-absent and a
//! leased record per transaction; conflict edges between concurrent
//! transactions are recorded in those records, and commit turns the
//! accumulated flags into the outcome.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! let db = Tessera::in_memory();
//!
//! let mut txn = db.begin()?;
//! txn.write("user:1", b"alice")?;
//! let value = txn.read("user:1")?;
//! let status = txn.commit()?;
//! assert!(status.is_success());
//! ```
//!
//! ## Layers
//!
//! - [`tessera_backend`]: the sorted-store and lease-store contracts plus
//!   in-memory implementations
//! - [`tessera_store`]: versioned key chains and the lock manager
//! - [`tessera_txn`]: the SSI transaction coordinator
//!
//! A non-serializable transaction is reported as
//! [`TxnStatus::CompletedWithFailure`] from commit — an expected outcome,
//! not an error.

#![warn(missing_docs)]

mod database;
mod workload;

pub mod prelude;

pub use database::{Tessera, TesseraBuilder};
pub use workload::{WorkloadReport, WorkloadRunner};

// Re-export the vocabulary callers need at the surface.
pub use tessera_core::{Error, Result, TxnDescriptor, TxnId, TxnStatus, Version};
pub use tessera_txn::Transaction;
