//! Write locks and SI read locks
//!
//! Both lock kinds are plain backend rows, so mutual exclusion is the
//! backend's insert-uniqueness and nothing else. The write lock is one
//! row per key; SI read locks are one row per (key, transaction) and only
//! collide when the same transaction re-registers.
//!
//! `release_write_lock` is an unconditional delete: it does not check the
//! holder. Callers release only keys they know they locked.

use crate::rows::{
    parse_si_read_sort_key, si_read_sort_key, SI_READ_PREFIX, SI_READ_PREFIX_END, WRITE_LOCK_KEY,
};
use std::sync::Arc;
use tessera_backend::{Row, SortedStore};
use tessera_core::{Error, Result, TxnId};

/// Lock operations over the abstract sorted backend.
///
/// Cheap to clone; all clones share the injected backend.
#[derive(Clone)]
pub struct LockManager {
    backend: Arc<dyn SortedStore>,
}

impl LockManager {
    /// Create a lock manager over the given backend.
    pub fn new(backend: Arc<dyn SortedStore>) -> Self {
        LockManager { backend }
    }

    /// Take the exclusive write lock on `key`.
    ///
    /// Fails with [`Error::LockContention`] if any transaction (including
    /// `txn` itself) already holds it.
    pub fn acquire_write_lock(&self, key: &str, txn: TxnId) -> Result<()> {
        self.backend
            .insert(key, WRITE_LOCK_KEY, Row::lock(txn))
            .map_err(|e| match e {
                Error::RowExists { .. } => Error::LockContention {
                    key: key.to_string(),
                },
                other => other,
            })?;
        tracing::debug!(key, %txn, "write lock acquired");
        Ok(())
    }

    /// Drop the write lock on `key`. Unconditional; the holder is not
    /// checked.
    pub fn release_write_lock(&self, key: &str, txn: TxnId) -> Result<()> {
        self.backend.delete(key, WRITE_LOCK_KEY)?;
        tracing::debug!(key, %txn, "write lock released");
        Ok(())
    }

    /// Current write-lock holder, if any.
    pub fn write_lock_owner(&self, key: &str) -> Result<Option<TxnId>> {
        Ok(self
            .backend
            .get(key, WRITE_LOCK_KEY)?
            .map(|row| row.creator))
    }

    /// Register `txn`'s read intent on `key`.
    ///
    /// Fails with [`Error::LockContention`] only when `txn` already holds
    /// an SI read lock on this key.
    pub fn add_si_read_lock(&self, key: &str, txn: TxnId) -> Result<()> {
        self.backend
            .insert(key, &si_read_sort_key(txn), Row::lock(txn))
            .map_err(|e| match e {
                Error::RowExists { .. } => Error::LockContention {
                    key: key.to_string(),
                },
                other => other,
            })?;
        tracing::debug!(key, %txn, "si read lock added");
        Ok(())
    }

    /// Drop `txn`'s SI read lock on `key`.
    pub fn release_si_read_lock(&self, key: &str, txn: TxnId) -> Result<()> {
        self.backend.delete(key, &si_read_sort_key(txn))
    }

    /// Every transaction currently holding an SI read lock on `key`.
    pub fn si_read_holders(&self, key: &str) -> Result<Vec<TxnId>> {
        let range = SI_READ_PREFIX.to_string()..SI_READ_PREFIX_END.to_string();
        let mut holders = Vec::new();
        for (sort_key, row) in self.backend.scan(key, range)? {
            match parse_si_read_sort_key(&sort_key) {
                Some(txn) => holders.push(txn),
                None => {
                    return Err(Error::BackendUnavailable(format!(
                        "malformed si read lock row {sort_key} under {key}"
                    )))
                }
            }
            debug_assert_eq!(parse_si_read_sort_key(&sort_key), Some(row.creator));
        }
        Ok(holders)
    }
}
