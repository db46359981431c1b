//! Descriptor persistence under leases
//!
//! A transaction's descriptor lives in one leased record addressed by its
//! id. Every mutation happens as read-modify-write while holding the
//! record's exclusive lease, so flag updates from different processes
//! never interleave.
//!
//! Sections that must hold two descriptors at once (a conflict edge
//! touches both ends) acquire the leases in ascending [`TxnId`] order and
//! release in reverse. Two transactions examining each other therefore
//! always contend on the same record first and cannot deadlock.
//!
//! Descriptors are written back only when their content changed: a
//! record's `modified_seq` advances exactly when its flags or status do,
//! which is what the write-side concurrency test relies on.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tessera_backend::{with_lease, LeaseStore};
use tessera_core::{RecordMeta, Result, TxnDescriptor, TxnId};

/// Descriptor read/write over the abstract lease store.
///
/// Cheap to clone; all clones share the injected store and timing
/// configuration.
#[derive(Clone)]
pub struct DescriptorStore {
    leases: Arc<dyn LeaseStore>,
    ttl: Duration,
    acquire_timeout: Duration,
}

impl DescriptorStore {
    /// Create a descriptor store.
    ///
    /// `ttl` bounds how long a crashed holder can wedge a record;
    /// `acquire_timeout` bounds how long any single lease acquisition
    /// may wait before failing with
    /// [`tessera_core::Error::LeaseUnavailable`].
    pub fn new(leases: Arc<dyn LeaseStore>, ttl: Duration, acquire_timeout: Duration) -> Self {
        DescriptorStore {
            leases,
            ttl,
            acquire_timeout,
        }
    }

    /// Create and persist the initial `Running` descriptor for a new
    /// transaction, returning the record's sequence stamps.
    pub fn begin(&self, txn: TxnId) -> Result<RecordMeta> {
        let id = txn.to_string();
        self.leases.create_record(&id)?;
        let initial = TxnDescriptor::default().encode()?;
        with_lease(
            self.leases.as_ref(),
            &id,
            self.ttl,
            self.deadline(),
            |token| self.leases.write(token, &initial),
        )?;
        let (_, meta) = self.leases.read(&id)?;
        tracing::debug!(%txn, created_seq = meta.created_seq, "transaction descriptor created");
        Ok(meta)
    }

    /// Read a descriptor without taking the lease.
    ///
    /// Useful for observers; mutators go through [`Self::update`] or
    /// [`Self::update_pair`].
    pub fn read(&self, txn: TxnId) -> Result<(TxnDescriptor, RecordMeta)> {
        let (data, meta) = self.leases.read(&txn.to_string())?;
        Ok((TxnDescriptor::decode(data.as_deref())?, meta))
    }

    /// Read-modify-write one descriptor under its lease.
    ///
    /// The descriptor is written back only if `f` changed it.
    pub fn update<T>(&self, txn: TxnId, f: impl FnOnce(&mut TxnDescriptor) -> T) -> Result<T> {
        let id = txn.to_string();
        with_lease(
            self.leases.as_ref(),
            &id,
            self.ttl,
            self.deadline(),
            |token| {
                let (data, _) = self.leases.read(&id)?;
                let mut descriptor = TxnDescriptor::decode(data.as_deref())?;
                let before = descriptor;
                let out = f(&mut descriptor);
                if descriptor != before {
                    self.leases.write(token, &descriptor.encode()?)?;
                }
                Ok(out)
            },
        )
    }

    /// Read-modify-write two descriptors while holding both leases.
    ///
    /// `f` receives `a`'s descriptor and stamps first, then `b`'s,
    /// regardless of acquisition order. Leases are acquired in ascending
    /// `TxnId` order; each descriptor is written back only if changed.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`; a conflict edge always has two distinct ends.
    pub fn update_pair<T>(
        &self,
        a: TxnId,
        b: TxnId,
        f: impl FnOnce(&mut TxnDescriptor, &RecordMeta, &mut TxnDescriptor, &RecordMeta) -> T,
    ) -> Result<T> {
        assert_ne!(a, b, "descriptor pair update needs distinct transactions");
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let (first_id, second_id) = (first.to_string(), second.to_string());
        with_lease(
            self.leases.as_ref(),
            &first_id,
            self.ttl,
            self.deadline(),
            |first_token| {
                with_lease(
                    self.leases.as_ref(),
                    &second_id,
                    self.ttl,
                    self.deadline(),
                    |second_token| {
                        let (data_a, meta_a) = self.leases.read(&a.to_string())?;
                        let (data_b, meta_b) = self.leases.read(&b.to_string())?;
                        let mut desc_a = TxnDescriptor::decode(data_a.as_deref())?;
                        let mut desc_b = TxnDescriptor::decode(data_b.as_deref())?;
                        let (before_a, before_b) = (desc_a, desc_b);

                        let out = f(&mut desc_a, &meta_a, &mut desc_b, &meta_b);

                        let (token_a, token_b) = if a == first {
                            (first_token, second_token)
                        } else {
                            (second_token, first_token)
                        };
                        if desc_a != before_a {
                            self.leases.write(token_a, &desc_a.encode()?)?;
                        }
                        if desc_b != before_b {
                            self.leases.write(token_b, &desc_b.encode()?)?;
                        }
                        Ok(out)
                    },
                )
            },
        )
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.acquire_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_backend::MemoryLeaseStore;
    use tessera_core::TxnStatus;

    fn descriptors() -> DescriptorStore {
        DescriptorStore::new(
            Arc::new(MemoryLeaseStore::new()),
            Duration::from_secs(5),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_begin_persists_running_descriptor() {
        let store = descriptors();
        let txn = TxnId::new();
        let meta = store.begin(txn).unwrap();
        let (descriptor, read_meta) = store.read(txn).unwrap();
        assert_eq!(descriptor, TxnDescriptor::default());
        assert_eq!(meta.created_seq, read_meta.created_seq);
    }

    #[test]
    fn test_update_persists_changes() {
        let store = descriptors();
        let txn = TxnId::new();
        store.begin(txn).unwrap();
        store
            .update(txn, |d| {
                d.in_conflict = true;
            })
            .unwrap();
        let (descriptor, _) = store.read(txn).unwrap();
        assert!(descriptor.in_conflict);
        assert!(!descriptor.out_conflict);
    }

    #[test]
    fn test_noop_update_does_not_bump_modified_seq() {
        let store = descriptors();
        let txn = TxnId::new();
        store.begin(txn).unwrap();
        let (_, before) = store.read(txn).unwrap();
        store.update(txn, |_| {}).unwrap();
        let (_, after) = store.read(txn).unwrap();
        assert_eq!(
            before.modified_seq, after.modified_seq,
            "examining a descriptor must not look like mutating it"
        );
    }

    #[test]
    fn test_update_pair_mutates_both_in_caller_order() {
        let store = descriptors();
        let a = TxnId::new();
        let b = TxnId::new();
        store.begin(a).unwrap();
        store.begin(b).unwrap();
        // Caller order (a, b) must hold whichever way the ids sort.
        store
            .update_pair(a, b, |da, _, db, _| {
                da.in_conflict = true;
                db.out_conflict = true;
            })
            .unwrap();
        let (desc_a, _) = store.read(a).unwrap();
        let (desc_b, _) = store.read(b).unwrap();
        assert!(desc_a.in_conflict && !desc_a.out_conflict);
        assert!(desc_b.out_conflict && !desc_b.in_conflict);
    }

    #[test]
    fn test_update_pair_writes_only_dirty_descriptor() {
        let store = descriptors();
        let a = TxnId::new();
        let b = TxnId::new();
        store.begin(a).unwrap();
        store.begin(b).unwrap();
        let (_, meta_b_before) = store.read(b).unwrap();
        store
            .update_pair(a, b, |da, _, _db, _| {
                da.out_conflict = true;
            })
            .unwrap();
        let (_, meta_b_after) = store.read(b).unwrap();
        assert_eq!(meta_b_before.modified_seq, meta_b_after.modified_seq);
    }

    #[test]
    fn test_update_pair_exposes_sequence_stamps() {
        let store = descriptors();
        let a = TxnId::new();
        let b = TxnId::new();
        let meta_a = store.begin(a).unwrap();
        store.begin(b).unwrap();
        let seen = store
            .update_pair(a, b, |_, ma, _, _| ma.created_seq)
            .unwrap();
        assert_eq!(seen, meta_a.created_seq);
    }

    #[test]
    fn test_status_transition_via_update() {
        let store = descriptors();
        let txn = TxnId::new();
        store.begin(txn).unwrap();
        let status = store
            .update(txn, |d| {
                d.status = TxnStatus::CompletedWithSuccess;
                d.status
            })
            .unwrap();
        assert_eq!(status, TxnStatus::CompletedWithSuccess);
        let (descriptor, _) = store.read(txn).unwrap();
        assert!(descriptor.status.is_success());
    }

    #[test]
    fn test_read_of_unknown_transaction_defaults_to_running() {
        let store = descriptors();
        let (descriptor, _) = store.read(TxnId::new()).unwrap();
        assert_eq!(descriptor.status, TxnStatus::Running);
    }
}
