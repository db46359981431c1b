//! Leased record store contract
//!
//! Records are small addressable blobs of opaque metadata. A lease is a
//! TTL-bounded exclusive grant on one record: metadata writes require a
//! live token, so read-modify-write under a lease is linearizable. A
//! crashed holder self-heals once its TTL runs out.
//!
//! Acquisition takes a caller-visible deadline distinct from the TTL: the
//! wait for a contended lease is bounded, failing with
//! [`tessera_core::Error::LeaseUnavailable`] when the deadline passes.

use std::time::{Duration, Instant};
use tessera_core::{RecordMeta, Result};

/// Proof of a held lease on one record.
///
/// Tokens are not cloneable; releasing consumes the token. A token goes
/// stale when its lease expires or the record is re-leased after expiry.
#[derive(Debug, PartialEq, Eq)]
pub struct LeaseToken {
    record: String,
    nonce: u64,
}

impl LeaseToken {
    /// Construct a token. Only lease store implementations mint these.
    pub fn new(record: impl Into<String>, nonce: u64) -> Self {
        LeaseToken {
            record: record.into(),
            nonce,
        }
    }

    /// The record this token leases.
    pub fn record(&self) -> &str {
        &self.record
    }

    /// The grant nonce, unique per acquisition.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

/// Abstract leased record store.
///
/// Implementations must guarantee:
/// - at most one live lease per record at any instant;
/// - every record carries [`RecordMeta`] sequence stamps drawn from one
///   monotone counter: `created_seq` at creation, `modified_seq` bumped on
///   every successful `write`;
/// - `write` with a stale token fails with
///   [`tessera_core::Error::LeaseUnavailable`] and leaves the record
///   unchanged.
pub trait LeaseStore: Send + Sync {
    /// Create an empty leasable record. Creating an existing record is a
    /// no-op.
    fn create_record(&self, id: &str) -> Result<()>;

    /// Acquire an exclusive lease, waiting until the current holder
    /// releases or its TTL expires, but no longer than `deadline`.
    fn acquire(&self, id: &str, ttl: Duration, deadline: Instant) -> Result<LeaseToken>;

    /// Read a record's metadata bytes and sequence stamps. No lease
    /// required.
    fn read(&self, id: &str) -> Result<(Option<Vec<u8>>, RecordMeta)>;

    /// Write metadata under a live lease.
    fn write(&self, token: &LeaseToken, data: &[u8]) -> Result<()>;

    /// Release a lease. Releasing an already-expired token is a no-op.
    fn release(&self, token: LeaseToken) -> Result<()>;
}

/// Scoped lease acquisition.
///
/// Acquires the lease, runs `f`, and releases on every exit path — the
/// release happens whether `f` succeeds or fails. All descriptor
/// read-modify-write goes through here; nothing else should call
/// [`LeaseStore::acquire`] directly.
pub fn with_lease<T>(
    store: &dyn LeaseStore,
    id: &str,
    ttl: Duration,
    deadline: Instant,
    f: impl FnOnce(&LeaseToken) -> Result<T>,
) -> Result<T> {
    let token = store.acquire(id, ttl, deadline)?;
    let outcome = f(&token);
    let released = store.release(token);
    let value = outcome?;
    released?;
    Ok(value)
}
