//! Identifier and version types
//!
//! This module defines the fundamental types used throughout the system:
//! - [`TxnId`]: Unique identifier for transactions
//! - [`Version`]: Position in a key's append-only version chain
//! - [`RecordMeta`]: Sequence stamps attached to leased records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of a row in a key's version chain.
///
/// Versions for a key start at 0 and are gap-free up to the current
/// maximum, except that a tombstoned version may be followed by a fresh
/// chain restarting at (tombstone version + 1).
pub type Version = u64;

/// Unique identifier for a transaction
///
/// TxnId is used throughout the system to identify transactions. It appears
/// in:
/// - Version rows (as the creator)
/// - Write-lock and SI-read-lock rows (as the holder)
/// - Leased descriptor records (as the record address)
///
/// TxnId is totally ordered; the ordering is what makes two-descriptor
/// lease acquisition deterministic across processes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TxnId(Uuid);

impl TxnId {
    /// Create a new random TxnId using UUID v4
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_core::TxnId;
    ///
    /// let id1 = TxnId::new();
    /// let id2 = TxnId::new();
    /// assert_ne!(id1, id2); // Each TxnId is unique
    /// ```
    pub fn new() -> Self {
        TxnId(Uuid::new_v4())
    }

    /// Create TxnId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        TxnId(Uuid::from_bytes(bytes))
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TxnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TxnId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(TxnId(Uuid::parse_str(s)?))
    }
}

/// Backend-assigned sequence stamps on a leased record
///
/// The leased record store draws both stamps from one monotone counter:
/// `created_seq` is assigned when the record is created, `modified_seq`
/// every time its metadata is written. Comparing another record's
/// `modified_seq` against a transaction's own `created_seq` is the
/// concurrency test used by the write-side conflict check — no wall
/// clocks involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Sequence number assigned at record creation
    pub created_seq: u64,
    /// Sequence number of the most recent metadata write
    pub modified_seq: u64,
}
