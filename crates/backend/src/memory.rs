//! In-memory backend implementations
//!
//! Reference semantics for both backend contracts, used by every test and
//! by local single-process deployments. `MemorySortedStore` keeps rows in
//! a `BTreeMap` behind an `RwLock` so scans come back sorted for free.
//! `MemoryLeaseStore` keeps one slot per record: a `Mutex` + `Condvar`
//! pair gives bounded lease waits, and a single `AtomicU64` hands out the
//! sequence stamps.

use crate::lease::{LeaseStore, LeaseToken};
use crate::sorted::{Row, SortedStore};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::BTreeMap;
use std::ops::{Bound, Range};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tessera_core::{Error, RecordMeta, Result};

/// In-memory sorted store.
///
/// All operations take the single map lock; insert-if-absent is atomic
/// because check and insert happen under one write guard.
#[derive(Default)]
pub struct MemorySortedStore {
    rows: RwLock<BTreeMap<(String, String), Row>>,
}

impl MemorySortedStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all partitions.
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }
}

impl SortedStore for MemorySortedStore {
    fn insert(&self, partition: &str, sort_key: &str, row: Row) -> Result<()> {
        let mut rows = self.rows.write();
        let addr = (partition.to_string(), sort_key.to_string());
        if rows.contains_key(&addr) {
            return Err(Error::RowExists {
                partition: partition.to_string(),
                sort_key: sort_key.to_string(),
            });
        }
        rows.insert(addr, row);
        Ok(())
    }

    fn delete(&self, partition: &str, sort_key: &str) -> Result<()> {
        self.rows
            .write()
            .remove(&(partition.to_string(), sort_key.to_string()));
        Ok(())
    }

    fn get(&self, partition: &str, sort_key: &str) -> Result<Option<Row>> {
        Ok(self
            .rows
            .read()
            .get(&(partition.to_string(), sort_key.to_string()))
            .cloned())
    }

    fn scan(&self, partition: &str, range: Range<String>) -> Result<Vec<(String, Row)>> {
        let start = (partition.to_string(), range.start);
        let end = (partition.to_string(), range.end);
        Ok(self
            .rows
            .read()
            .range((Bound::Included(start), Bound::Excluded(end)))
            .map(|((_, sort_key), row)| (sort_key.clone(), row.clone()))
            .collect())
    }
}

struct LeaseGrant {
    nonce: u64,
    expires_at: Instant,
}

struct RecordState {
    data: Option<Vec<u8>>,
    meta: RecordMeta,
    lease: Option<LeaseGrant>,
}

struct Slot {
    state: Mutex<RecordState>,
    freed: Condvar,
}

impl Slot {
    fn new(seq: u64) -> Self {
        Slot {
            state: Mutex::new(RecordState {
                data: None,
                meta: RecordMeta {
                    created_seq: seq,
                    modified_seq: seq,
                },
                lease: None,
            }),
            freed: Condvar::new(),
        }
    }
}

/// In-memory leased record store.
///
/// One slot per record. Acquisition parks on the slot's condvar and wakes
/// either when the holder releases or when the holder's TTL expires; a
/// waiter never sleeps past the earlier of (holder expiry, caller
/// deadline).
pub struct MemoryLeaseStore {
    slots: DashMap<String, Arc<Slot>>,
    seq: AtomicU64,
    nonces: AtomicU64,
}

impl MemoryLeaseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryLeaseStore {
            slots: DashMap::new(),
            seq: AtomicU64::new(0),
            nonces: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn slot(&self, id: &str) -> Arc<Slot> {
        if let Some(slot) = self.slots.get(id) {
            return slot.value().clone();
        }
        let seq = self.next_seq();
        self.slots
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Slot::new(seq)))
            .value()
            .clone()
    }

}

impl Default for MemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseStore for MemoryLeaseStore {
    fn create_record(&self, id: &str) -> Result<()> {
        let _ = self.slot(id);
        Ok(())
    }

    fn acquire(&self, id: &str, ttl: Duration, deadline: Instant) -> Result<LeaseToken> {
        let slot = self.slot(id);
        let mut state = slot.state.lock();
        loop {
            let now = Instant::now();
            if let Some(grant) = &state.lease {
                if grant.expires_at <= now {
                    tracing::warn!(record = id, "taking over expired lease");
                    state.lease = None;
                }
            }
            if state.lease.is_none() {
                let nonce = self.nonces.fetch_add(1, Ordering::SeqCst) + 1;
                state.lease = Some(LeaseGrant {
                    nonce,
                    expires_at: now + ttl,
                });
                tracing::debug!(record = id, nonce, "lease acquired");
                return Ok(LeaseToken::new(id, nonce));
            }
            if now >= deadline {
                return Err(Error::LeaseUnavailable { id: id.to_string() });
            }
            // Wake at whichever comes first: holder expiry or our deadline.
            let holder_expiry = state
                .lease
                .as_ref()
                .map(|g| g.expires_at)
                .unwrap_or(deadline);
            let wake_at = holder_expiry.min(deadline);
            let _ = slot.freed.wait_until(&mut state, wake_at);
        }
    }

    fn read(&self, id: &str) -> Result<(Option<Vec<u8>>, RecordMeta)> {
        let slot = self.slot(id);
        let state = slot.state.lock();
        Ok((state.data.clone(), state.meta))
    }

    fn write(&self, token: &LeaseToken, data: &[u8]) -> Result<()> {
        let slot = self.slot(token.record());
        let mut state = slot.state.lock();
        let now = Instant::now();
        let held = match &state.lease {
            Some(g) => g.nonce == token.nonce() && g.expires_at > now,
            None => false,
        };
        if !held {
            return Err(Error::LeaseUnavailable {
                id: token.record().to_string(),
            });
        }
        state.data = Some(data.to_vec());
        state.meta.modified_seq = self.next_seq();
        Ok(())
    }

    fn release(&self, token: LeaseToken) -> Result<()> {
        let slot = self.slot(token.record());
        let mut state = slot.state.lock();
        if matches!(&state.lease, Some(g) if g.nonce == token.nonce()) {
            state.lease = None;
            tracing::debug!(record = token.record(), "lease released");
            slot.freed.notify_all();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::TxnId;

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    // ===== MemorySortedStore =====

    #[test]
    fn test_insert_if_absent_rejects_duplicate() {
        let store = MemorySortedStore::new();
        let txn = TxnId::new();
        store.insert("p", "a", Row::lock(txn)).unwrap();
        let err = store.insert("p", "a", Row::lock(txn)).unwrap_err();
        assert!(matches!(err, Error::RowExists { .. }));
        // Same sort key in another partition is a different row.
        store.insert("q", "a", Row::lock(txn)).unwrap();
    }

    #[test]
    fn test_scan_is_sorted_and_half_open() {
        let store = MemorySortedStore::new();
        let txn = TxnId::new();
        for sort_key in ["c", "a", "b", "d"] {
            store
                .insert("p", sort_key, Row::value(sort_key.into(), txn))
                .unwrap();
        }
        let rows = store.scan("p", "a".to_string().."d".to_string()).unwrap();
        let keys: Vec<_> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"], "ascending, end exclusive");
    }

    #[test]
    fn test_scan_does_not_cross_partitions() {
        let store = MemorySortedStore::new();
        let txn = TxnId::new();
        store.insert("p", "a", Row::lock(txn)).unwrap();
        store.insert("q", "b", Row::lock(txn)).unwrap();
        let rows = store.scan("p", String::new().."z".to_string()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_delete_is_unconditional() {
        let store = MemorySortedStore::new();
        let txn = TxnId::new();
        store.delete("p", "missing").unwrap();
        store.insert("p", "a", Row::lock(txn)).unwrap();
        store.delete("p", "a").unwrap();
        assert!(store.get("p", "a").unwrap().is_none());
        // Row can be re-inserted after delete.
        store.insert("p", "a", Row::lock(txn)).unwrap();
    }

    // ===== MemoryLeaseStore =====

    #[test]
    fn test_lease_mutual_exclusion_and_release() {
        let store = MemoryLeaseStore::new();
        store.create_record("r").unwrap();
        let token = store
            .acquire("r", Duration::from_secs(5), far_deadline())
            .unwrap();
        // Second acquire with an immediate deadline fails.
        let err = store
            .acquire("r", Duration::from_secs(5), Instant::now())
            .unwrap_err();
        assert!(matches!(err, Error::LeaseUnavailable { .. }));
        store.release(token).unwrap();
        let token2 = store
            .acquire("r", Duration::from_secs(5), far_deadline())
            .unwrap();
        store.release(token2).unwrap();
    }

    #[test]
    fn test_deadline_bounds_contended_acquire() {
        let store = MemoryLeaseStore::new();
        let _held = store
            .acquire("r", Duration::from_secs(5), far_deadline())
            .unwrap();
        let start = Instant::now();
        let err = store
            .acquire(
                "r",
                Duration::from_secs(5),
                Instant::now() + Duration::from_millis(50),
            )
            .unwrap_err();
        assert!(matches!(err, Error::LeaseUnavailable { .. }));
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "wait must be bounded by the deadline"
        );
    }

    #[test]
    fn test_expired_lease_self_heals_and_stale_token_rejected() {
        let store = MemoryLeaseStore::new();
        let stale = store
            .acquire("r", Duration::from_millis(10), far_deadline())
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));
        // TTL ran out: a new holder takes over without a release.
        let fresh = store
            .acquire("r", Duration::from_secs(5), far_deadline())
            .unwrap();
        let err = store.write(&stale, b"late").unwrap_err();
        assert!(matches!(err, Error::LeaseUnavailable { .. }));
        store.write(&fresh, b"ok").unwrap();
        // Releasing the stale token must not free the fresh lease.
        store.release(stale).unwrap();
        store.write(&fresh, b"still ok").unwrap();
        store.release(fresh).unwrap();
    }

    #[test]
    fn test_sequence_stamps_bump_on_write_only() {
        let store = MemoryLeaseStore::new();
        store.create_record("r").unwrap();
        let (_, before) = store.read("r").unwrap();
        assert_eq!(before.created_seq, before.modified_seq);

        let token = store
            .acquire("r", Duration::from_secs(5), far_deadline())
            .unwrap();
        let (_, after_acquire) = store.read("r").unwrap();
        assert_eq!(
            after_acquire.modified_seq, before.modified_seq,
            "acquire alone must not bump modified_seq"
        );
        store.write(&token, b"data").unwrap();
        let (data, after_write) = store.read("r").unwrap();
        assert_eq!(data.as_deref(), Some(&b"data"[..]));
        assert!(after_write.modified_seq > before.modified_seq);
        assert_eq!(after_write.created_seq, before.created_seq);
        store.release(token).unwrap();
    }

    #[test]
    fn test_records_created_later_have_larger_created_seq() {
        let store = MemoryLeaseStore::new();
        store.create_record("a").unwrap();
        let (_, meta_a) = store.read("a").unwrap();
        store.create_record("b").unwrap();
        let (_, meta_b) = store.read("b").unwrap();
        assert!(meta_b.created_seq > meta_a.created_seq);
    }

    #[test]
    fn test_contended_acquire_succeeds_after_release() {
        let store = Arc::new(MemoryLeaseStore::new());
        let token = store
            .acquire("r", Duration::from_secs(5), far_deadline())
            .unwrap();
        let waiter = {
            let store = store.clone();
            std::thread::spawn(move || {
                store.acquire("r", Duration::from_secs(5), far_deadline())
            })
        };
        std::thread::sleep(Duration::from_millis(20));
        store.release(token).unwrap();
        let token2 = waiter.join().unwrap().unwrap();
        store.release(token2).unwrap();
    }
}
