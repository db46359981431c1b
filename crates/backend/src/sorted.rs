//! Sorted key-value store contract
//!
//! Rows are addressed by `(partition, sort_key)`. The single primitive the
//! upper layers rely on for correctness is insert-if-absent: two
//! concurrent inserts of the same row cannot both succeed, and the loser
//! gets a failure distinct from every other error kind.

use std::ops::Range;
use tessera_core::{Result, TxnId};

/// A stored row.
///
/// Version rows use every field; lock rows carry only `creator` (the
/// holding transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Payload bytes; `None` for tombstones and lock rows
    pub value: Option<Vec<u8>>,
    /// Whether this row marks its key as logically deleted
    pub tombstoned: bool,
    /// Transaction that created the row
    pub creator: TxnId,
}

impl Row {
    /// A live value row.
    pub fn value(value: Vec<u8>, creator: TxnId) -> Self {
        Row {
            value: Some(value),
            tombstoned: false,
            creator,
        }
    }

    /// A tombstone row: no payload, marks the key deleted.
    pub fn tombstone(creator: TxnId) -> Self {
        Row {
            value: None,
            tombstoned: true,
            creator,
        }
    }

    /// A lock row: carries only the holder.
    pub fn lock(holder: TxnId) -> Self {
        Row {
            value: None,
            tombstoned: false,
            creator: holder,
        }
    }
}

/// Abstract sorted key-value store.
///
/// Implementations must guarantee:
/// - `insert` is atomic and fails with [`tessera_core::Error::RowExists`]
///   when the `(partition, sort_key)` pair is already present — this
///   failure is distinct from every transport error;
/// - `scan` returns rows of one partition in ascending sort-key order;
/// - rows are never mutated in place.
pub trait SortedStore: Send + Sync {
    /// Atomic insert-if-absent.
    fn insert(&self, partition: &str, sort_key: &str, row: Row) -> Result<()>;

    /// Unconditional delete; absent rows are not an error.
    fn delete(&self, partition: &str, sort_key: &str) -> Result<()>;

    /// Point lookup of a single row.
    fn get(&self, partition: &str, sort_key: &str) -> Result<Option<Row>>;

    /// Range scan within one partition, ascending by sort key.
    ///
    /// The range is half-open: `range.start <= sort_key < range.end`.
    fn scan(&self, partition: &str, range: Range<String>) -> Result<Vec<(String, Row)>>;
}
