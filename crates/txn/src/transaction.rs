//! The transaction coordinator
//!
//! A [`Transaction`] tracks rw-antidependency edges as it goes:
//!
//! - **read** registers an SI read-intent lock, flags an edge toward any
//!   uncommitted writer of the key, then flags edges with every
//!   transaction that committed a newer version than the one it saw;
//! - **write** takes the key's exclusive write lock, flags edges with
//!   every concurrent reader of the key, then persists the value with a
//!   CAS against the version this transaction last observed;
//! - **commit** inspects the accumulated flags: both edges present means
//!   the transaction pivots a dangerous structure and completes with
//!   failure; otherwise it completes with success. Either way the write
//!   locks are released and the outcome is returned as a status, not an
//!   error.
//!
//! SI read locks are left in place after commit: later writers must keep
//! seeing committed readers to classify their own conflicts.

use crate::descriptors::DescriptorStore;
use rustc_hash::{FxHashMap, FxHashSet};
use tessera_core::{Error, Result, TxnId, TxnStatus, Version};
use tessera_store::{LockManager, VersionedKeyStore};

/// A running transaction.
///
/// Local state is owned exclusively by this value; everything shared
/// (version rows, lock rows, descriptors) lives behind the injected
/// stores. Not `Clone`: one value per transaction.
pub struct Transaction {
    id: TxnId,
    created_seq: u64,
    kvs: VersionedKeyStore,
    locks: LockManager,
    descriptors: DescriptorStore,
    /// Last version of each key this transaction observed; CAS input for
    /// its writes.
    key_versions: FxHashMap<String, Version>,
    /// Keys whose write lock this transaction holds.
    written_keys: FxHashSet<String>,
}

impl Transaction {
    /// Start a transaction: allocate an id and publish its `Running`
    /// descriptor.
    pub fn begin(
        kvs: VersionedKeyStore,
        locks: LockManager,
        descriptors: DescriptorStore,
    ) -> Result<Self> {
        let id = TxnId::new();
        let meta = descriptors.begin(id)?;
        tracing::debug!(%id, "transaction started");
        Ok(Transaction {
            id,
            created_seq: meta.created_seq,
            kvs,
            locks,
            descriptors,
            key_versions: FxHashMap::default(),
            written_keys: FxHashSet::default(),
        })
    }

    /// This transaction's id.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Read `key`, recording every rw-antidependency the read exposes.
    pub fn read(&mut self, key: &str) -> Result<Vec<u8>> {
        match self.locks.add_si_read_lock(key, self.id) {
            Ok(()) => {}
            // Re-reading a key we already registered on is fine.
            Err(Error::LockContention { .. }) => {
                tracing::trace!(key, txn = %self.id, "si read lock already held");
            }
            Err(e) => return Err(e),
        }

        // An uncommitted writer of this key supersedes whatever we are
        // about to read: edge from us to it.
        if let Some(writer) = self.locks.write_lock_owner(key)? {
            if writer != self.id {
                self.descriptors
                    .update_pair(writer, self.id, |writer_desc, _, self_desc, _| {
                        writer_desc.in_conflict = true;
                        self_desc.out_conflict = true;
                    })?;
                tracing::debug!(key, %writer, txn = %self.id, "read under foreign write lock");
            }
        }

        let (value, version) = self.kvs.read(key)?;
        self.key_versions.insert(key.to_string(), version);

        // Transactions that already committed a newer version than the
        // one we saw: we read stale state relative to each of them.
        for racer in self.kvs.creators_after(key, version)? {
            if racer == self.id {
                continue;
            }
            self.descriptors
                .update_pair(racer, self.id, |racer_desc, _, self_desc, _| {
                    if racer_desc.status == TxnStatus::CompletedWithSuccess
                        && racer_desc.out_conflict
                    {
                        // The racer already carries an outgoing edge; the
                        // edge we are adding lands us inside its
                        // structure on both sides.
                        self_desc.in_conflict = true;
                        self_desc.out_conflict = true;
                    }
                    racer_desc.in_conflict = true;
                    self_desc.out_conflict = true;
                })?;
            tracing::debug!(key, %racer, txn = %self.id, "read raced a newer committed version");
        }

        Ok(value)
    }

    /// Write `key`, recording every rw-antidependency the write exposes.
    ///
    /// Writes are pessimistically serialized per key: a foreign write
    /// lock surfaces as [`Error::LockContention`], never as a conflict
    /// flag.
    pub fn write(&mut self, key: &str, value: &[u8]) -> Result<()> {
        // written_keys tracks exactly the locks we hold, so a rewrite of
        // our own key skips acquisition and a failed acquisition never
        // queues a foreign lock for release at commit.
        if !self.written_keys.contains(key) {
            self.locks.acquire_write_lock(key, self.id)?;
            self.written_keys.insert(key.to_string());
        }

        let created_seq = self.created_seq;
        for reader in self.locks.si_read_holders(key)? {
            if reader == self.id {
                continue;
            }
            self.descriptors.update_pair(
                reader,
                self.id,
                |reader_desc, reader_meta, self_desc, _| {
                    let concurrent = reader_desc.status == TxnStatus::Running
                        || reader_meta.modified_seq > created_seq;
                    if !concurrent {
                        return;
                    }
                    if reader_desc.status == TxnStatus::CompletedWithSuccess
                        && reader_desc.in_conflict
                    {
                        // Reader committed with an incoming edge; our
                        // edge toward it closes a structure around us.
                        self_desc.in_conflict = true;
                        self_desc.out_conflict = true;
                    } else {
                        reader_desc.out_conflict = true;
                        self_desc.in_conflict = true;
                    }
                },
            )?;
        }

        let version = match self.key_versions.get(key) {
            Some(observed) => self.kvs.update(key, value, *observed, self.id)?,
            None => self.kvs.create(key, value, self.id)?,
        };
        self.key_versions.insert(key.to_string(), version);
        tracing::debug!(key, version, txn = %self.id, "value written");
        Ok(())
    }

    /// Decide the outcome from the accumulated conflict flags and release
    /// the write locks.
    ///
    /// Returns the terminal status as a value: a non-serializable
    /// transaction is an expected outcome, not an error.
    pub fn commit(&mut self) -> Result<TxnStatus> {
        let status = self.descriptors.update(self.id, |descriptor| {
            descriptor.status = if descriptor.has_dangerous_structure() {
                TxnStatus::CompletedWithFailure
            } else {
                TxnStatus::CompletedWithSuccess
            };
            descriptor.status
        })?;

        for key in self.written_keys.drain() {
            self.locks.release_write_lock(&key, self.id)?;
        }

        tracing::info!(txn = %self.id, %status, "transaction committed");
        Ok(status)
    }
}
