//! Shared types for tessera
//!
//! This crate defines the vocabulary used by every layer:
//! - [`TxnId`]: transaction identifier, totally ordered for lease ordering
//! - [`TxnDescriptor`]: the shared conflict-flag record for a transaction
//! - [`RecordMeta`]: backend-assigned sequence stamps on leased records
//! - [`Error`] / [`Result`]: the unified error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod error;
pub mod types;

pub use descriptor::{TxnDescriptor, TxnStatus};
pub use error::{Error, Result};
pub use types::{RecordMeta, TxnId, Version};
