//! Main entry point for tessera.
//!
//! This module provides the `Tessera` struct, the handle from which
//! transactions are started, and its builder.

use std::sync::Arc;
use std::time::Duration;
use tessera_backend::{LeaseStore, MemoryLeaseStore, MemorySortedStore, SortedStore};
use tessera_core::Result;
use tessera_store::{LockManager, VersionedKeyStore};
use tessera_txn::{DescriptorStore, Transaction};

/// Default lease TTL on descriptor records.
const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(60);
/// Default bound on any single lease acquisition.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// The tessera database handle.
///
/// Cheap to clone; clones share the injected backends, so one handle per
/// process serves any number of worker threads, each running its own
/// transactions.
///
/// # Example
///
/// ```ignore
/// use tessera::prelude::*;
///
/// let db = Tessera::in_memory();
/// let mut txn = db.begin()?;
/// txn.write("k", b"v")?;
/// txn.commit()?;
/// ```
#[derive(Clone)]
pub struct Tessera {
    kvs: VersionedKeyStore,
    locks: LockManager,
    descriptors: DescriptorStore,
}

impl Tessera {
    /// A database over the in-memory backends.
    ///
    /// Single-process only: nothing survives the handle. Use
    /// [`Tessera::builder`] to inject remote backends.
    pub fn in_memory() -> Self {
        Self::builder()
            .sorted_store(Arc::new(MemorySortedStore::new()))
            .lease_store(Arc::new(MemoryLeaseStore::new()))
            .open()
    }

    /// Create a builder for backend and lease configuration.
    pub fn builder() -> TesseraBuilder {
        TesseraBuilder::default()
    }

    /// Start a new transaction.
    pub fn begin(&self) -> Result<Transaction> {
        Transaction::begin(
            self.kvs.clone(),
            self.locks.clone(),
            self.descriptors.clone(),
        )
    }

    /// Direct access to the versioned key store, bypassing transactions.
    ///
    /// Single operations only; no conflict tracking happens here.
    pub fn store(&self) -> &VersionedKeyStore {
        &self.kvs
    }

    /// Direct access to the lock manager.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Direct access to the descriptor store.
    pub fn descriptors(&self) -> &DescriptorStore {
        &self.descriptors
    }
}

/// Builder for [`Tessera`].
///
/// Backends default to fresh in-memory stores; lease timing defaults to a
/// 60s TTL and a 30s acquisition bound.
#[derive(Default)]
pub struct TesseraBuilder {
    sorted: Option<Arc<dyn SortedStore>>,
    leases: Option<Arc<dyn LeaseStore>>,
    lease_ttl: Option<Duration>,
    acquire_timeout: Option<Duration>,
}

impl TesseraBuilder {
    /// Inject the sorted row backend.
    pub fn sorted_store(mut self, store: Arc<dyn SortedStore>) -> Self {
        self.sorted = Some(store);
        self
    }

    /// Inject the leased record backend.
    pub fn lease_store(mut self, store: Arc<dyn LeaseStore>) -> Self {
        self.leases = Some(store);
        self
    }

    /// TTL granted on descriptor leases; a crashed holder wedges a record
    /// for at most this long.
    pub fn lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = Some(ttl);
        self
    }

    /// Bound on any single lease acquisition before it fails with
    /// [`tessera_core::Error::LeaseUnavailable`].
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Build the handle.
    pub fn open(self) -> Tessera {
        let sorted = self
            .sorted
            .unwrap_or_else(|| Arc::new(MemorySortedStore::new()));
        let leases = self
            .leases
            .unwrap_or_else(|| Arc::new(MemoryLeaseStore::new()));
        Tessera {
            kvs: VersionedKeyStore::new(sorted.clone()),
            locks: LockManager::new(sorted),
            descriptors: DescriptorStore::new(
                leases,
                self.lease_ttl.unwrap_or(DEFAULT_LEASE_TTL),
                self.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip() {
        let db = Tessera::in_memory();
        let mut txn = db.begin().unwrap();
        txn.write("k", b"v").unwrap();
        assert!(txn.commit().unwrap().is_success());

        let mut txn = db.begin().unwrap();
        assert_eq!(txn.read("k").unwrap(), b"v");
    }

    #[test]
    fn test_builder_shares_backends_across_clones() {
        let db = Tessera::in_memory();
        let db2 = db.clone();
        let mut txn = db.begin().unwrap();
        txn.write("k", b"v").unwrap();
        txn.commit().unwrap();
        let mut txn = db2.begin().unwrap();
        assert_eq!(txn.read("k").unwrap(), b"v", "clones see the same rows");
    }

    #[test]
    fn test_builder_lease_knobs() {
        let db = Tessera::builder()
            .lease_ttl(Duration::from_millis(200))
            .acquire_timeout(Duration::from_millis(100))
            .open();
        let mut txn = db.begin().unwrap();
        txn.write("k", b"v").unwrap();
        assert!(txn.commit().unwrap().is_success());
    }
}
