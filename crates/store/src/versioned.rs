//! Append-only multi-version key store
//!
//! Every write inserts a new immutable version row; nothing is ever
//! mutated or deleted, so reads need no locks. The CAS operations
//! (`update`, `delete`) precondition on "expected version is still
//! current" and rely on the backend's insert-uniqueness to stay correct
//! under concurrency: two racers computing the same next version cannot
//! both insert it.

use crate::rows::{version_sort_key, VERSION_PREFIX_END};
use std::sync::Arc;
use tessera_backend::{Row, SortedStore};
use tessera_core::{Error, Result, TxnId, Version};

/// Multi-version store over the abstract sorted backend.
///
/// Cheap to clone; all clones share the injected backend.
#[derive(Clone)]
pub struct VersionedKeyStore {
    backend: Arc<dyn SortedStore>,
}

impl VersionedKeyStore {
    /// Create a store over the given backend.
    pub fn new(backend: Arc<dyn SortedStore>) -> Self {
        VersionedKeyStore { backend }
    }

    /// Insert the first live version of `key`.
    ///
    /// Fails with [`Error::AlreadyExists`] if a live version exists. On a
    /// tombstoned key the chain restarts at (tombstone version + 1).
    pub fn create(&self, key: &str, value: &[u8], txn: TxnId) -> Result<Version> {
        let versions = self.versions_from(key, 0)?;
        let next = match versions.last() {
            Some((last, row)) if row.tombstoned => last + 1,
            Some(_) => {
                return Err(Error::AlreadyExists {
                    key: key.to_string(),
                })
            }
            None => 0,
        };
        self.insert_version(key, next, Row::value(value.to_vec(), txn))
            .map_err(|e| match e {
                // A racer created the same version first.
                Error::RowExists { .. } => Error::AlreadyExists {
                    key: key.to_string(),
                },
                other => other,
            })?;
        Ok(next)
    }

    /// Blind write: insert at (latest version + 1) regardless of
    /// tombstone state, or at 0 on an empty chain.
    pub fn overwrite(&self, key: &str, value: &[u8], txn: TxnId) -> Result<Version> {
        let versions = self.versions_from(key, 0)?;
        let next = match versions.last() {
            Some((last, _)) => last + 1,
            None => 0,
        };
        self.insert_version(key, next, Row::value(value.to_vec(), txn))
            .map_err(|e| match e {
                Error::RowExists { .. } => Error::Conflict {
                    key: key.to_string(),
                    expected: next,
                },
                other => other,
            })?;
        Ok(next)
    }

    /// CAS write: succeeds only while `expected` is still the current
    /// version, inserting at (expected + 1).
    pub fn update(&self, key: &str, value: &[u8], expected: Version, txn: TxnId) -> Result<Version> {
        let current = self.cas_current(key, expected)?;
        let next = current + 1;
        self.insert_version(key, next, Row::value(value.to_vec(), txn))
            .map_err(|e| match e {
                Error::RowExists { .. } => Error::Conflict {
                    key: key.to_string(),
                    expected,
                },
                other => other,
            })?;
        Ok(next)
    }

    /// CAS delete: inserts a tombstone at (expected + 1).
    ///
    /// Fails with [`Error::NotFound`] when the chain is empty or the
    /// current version is already tombstoned, and with
    /// [`Error::Conflict`] when `expected` is stale.
    pub fn delete(&self, key: &str, expected: Version, txn: TxnId) -> Result<Version> {
        let versions = self.versions_from(key, expected)?;
        if versions.is_empty() {
            return Err(Error::NotFound {
                key: key.to_string(),
            });
        }
        if versions.len() > 1 {
            return Err(Error::Conflict {
                key: key.to_string(),
                expected,
            });
        }
        let (current, row) = &versions[0];
        if row.tombstoned {
            return Err(Error::NotFound {
                key: key.to_string(),
            });
        }
        let next = current + 1;
        self.insert_version(key, next, Row::tombstone(txn))
            .map_err(|e| match e {
                Error::RowExists { .. } => Error::Conflict {
                    key: key.to_string(),
                    expected,
                },
                other => other,
            })?;
        Ok(next)
    }

    /// Read the current value and its version.
    ///
    /// Fails with [`Error::NotFound`] when no rows exist or the latest
    /// row is a tombstone.
    pub fn read(&self, key: &str) -> Result<(Vec<u8>, Version)> {
        let versions = self.versions_from(key, 0)?;
        match versions.last() {
            None => Err(Error::NotFound {
                key: key.to_string(),
            }),
            Some((_, row)) if row.tombstoned => Err(Error::NotFound {
                key: key.to_string(),
            }),
            Some((version, row)) => {
                let value = row.value.clone().ok_or_else(|| {
                    Error::BackendUnavailable(format!("live version row for {key} has no value"))
                })?;
                Ok((value, *version))
            }
        }
    }

    /// Creators of every version strictly newer than `version`, in
    /// ascending version order.
    pub fn creators_after(&self, key: &str, version: Version) -> Result<Vec<TxnId>> {
        let min = match version.checked_add(1) {
            Some(min) => min,
            None => return Ok(Vec::new()),
        };
        Ok(self
            .versions_from(key, min)?
            .into_iter()
            .map(|(_, row)| row.creator)
            .collect())
    }

    /// All version rows of `key` at or above `min`, ascending.
    fn versions_from(&self, key: &str, min: Version) -> Result<Vec<(Version, Row)>> {
        let range = version_sort_key(min)..VERSION_PREFIX_END.to_string();
        let mut versions = Vec::new();
        for (sort_key, row) in self.backend.scan(key, range)? {
            match crate::rows::parse_version_sort_key(&sort_key) {
                Some(version) => versions.push((version, row)),
                None => {
                    return Err(Error::BackendUnavailable(format!(
                        "malformed version row {sort_key} under {key}"
                    )))
                }
            }
        }
        Ok(versions)
    }

    /// Shared CAS precondition: `expected` must still be current.
    ///
    /// The chain is gap-free, so "exactly one row at or above expected"
    /// is equivalent to "expected is the latest version".
    fn cas_current(&self, key: &str, expected: Version) -> Result<Version> {
        let versions = self.versions_from(key, expected)?;
        if versions.len() != 1 {
            return Err(Error::Conflict {
                key: key.to_string(),
                expected,
            });
        }
        Ok(versions[0].0)
    }

    fn insert_version(&self, key: &str, version: Version, row: Row) -> Result<()> {
        tracing::trace!(key, version, tombstoned = row.tombstoned, "insert version row");
        self.backend.insert(key, &version_sort_key(version), row)
    }
}
