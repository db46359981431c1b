//! Sort-key encoding for the three row kinds
//!
//! Each key is one backend partition. Within the partition:
//! - version rows sort under `KEY-<version>` with the version printed as
//!   zero-padded decimal at the width of `u64::MAX`, so lexicographic
//!   order equals numeric order;
//! - the single write-lock row is `LOCK-WRITE`;
//! - SI read locks are `LOCK-SIR-<txn>`, one per holding transaction.
//!
//! Prefix-range ends (`KEZ`, `LOCK-SIS`) are the prefix with its last
//! byte bumped, giving half-open scan ranges that cover exactly one row
//! kind.

use std::str::FromStr;
use tessera_core::{TxnId, Version};

/// Prefix of version-row sort keys.
pub const VERSION_PREFIX: &str = "KEY-";
/// Exclusive end of the version-row range.
pub const VERSION_PREFIX_END: &str = "KEZ";
/// Sort key of the (at most one) write-lock row.
pub const WRITE_LOCK_KEY: &str = "LOCK-WRITE";
/// Prefix of SI-read-lock sort keys.
pub const SI_READ_PREFIX: &str = "LOCK-SIR-";
/// Exclusive end of the SI-read-lock range.
pub const SI_READ_PREFIX_END: &str = "LOCK-SIS";

// Width of u64::MAX in decimal.
const VERSION_WIDTH: usize = 20;

/// Sort key for the version row at `version`.
pub fn version_sort_key(version: Version) -> String {
    format!("{VERSION_PREFIX}{version:0width$}", width = VERSION_WIDTH)
}

/// Recover the version from a version-row sort key.
pub fn parse_version_sort_key(sort_key: &str) -> Option<Version> {
    sort_key
        .strip_prefix(VERSION_PREFIX)
        .and_then(|digits| digits.parse().ok())
}

/// Sort key for `txn`'s SI read lock.
pub fn si_read_sort_key(txn: TxnId) -> String {
    format!("{SI_READ_PREFIX}{txn}")
}

/// Recover the holder from an SI-read-lock sort key.
pub fn parse_si_read_sort_key(sort_key: &str) -> Option<TxnId> {
    sort_key
        .strip_prefix(SI_READ_PREFIX)
        .and_then(|id| TxnId::from_str(id).ok())
}
