//! Versioned key store and lock manager for tessera
//!
//! This crate implements the storage layer over the abstract sorted
//! backend:
//! - [`VersionedKeyStore`]: append-only multi-version chains per key with
//!   optimistic CAS inserts
//! - [`LockManager`]: exclusive write locks and shared SI-read-lock sets
//! - [`rows`]: the sort-key encoding shared by both
//!
//! Race safety comes entirely from the backend's insert-uniqueness: no
//! two conflicting inserts of the same row can both succeed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod locks;
pub mod rows;
pub mod versioned;

pub use locks::LockManager;
pub use versioned::VersionedKeyStore;
