//! Transaction descriptor records
//!
//! A descriptor is the small shared record every transaction publishes
//! about itself: its status plus the two rw-antidependency flags. It is
//! mutated by its own transaction and by any transaction that detects a
//! conflict edge with it, always under an exclusive lease on the record.
//!
//! Descriptors travel as JSON inside the leased record's opaque metadata.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle of a transaction
///
/// `Running` transitions to exactly one of the terminal states at commit;
/// there are no further transitions after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnStatus {
    /// Transaction is still executing reads and writes
    Running,
    /// Commit decided the transaction is not serializable
    CompletedWithFailure,
    /// Transaction committed
    CompletedWithSuccess,
}

impl TxnStatus {
    /// Whether the status is one of the two terminal states.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxnStatus::Running)
    }

    /// Whether the transaction committed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, TxnStatus::CompletedWithSuccess)
    }
}

impl std::fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxnStatus::Running => "running",
            TxnStatus::CompletedWithFailure => "completed-with-failure",
            TxnStatus::CompletedWithSuccess => "completed-with-success",
        };
        write!(f, "{}", s)
    }
}

/// Shared per-transaction conflict record
///
/// `in_conflict` records an incoming rw-antidependency edge (some other
/// transaction read a version this one superseded); `out_conflict` records
/// an outgoing edge (this transaction read a version someone else
/// superseded). A transaction carrying both at commit time sits in the
/// middle of a dangerous structure and must not commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnDescriptor {
    /// Current lifecycle state
    pub status: TxnStatus,
    /// Incoming rw-antidependency edge observed
    pub in_conflict: bool,
    /// Outgoing rw-antidependency edge observed
    pub out_conflict: bool,
}

impl TxnDescriptor {
    /// Both conflict edges present: committing would violate
    /// serializability.
    pub fn has_dangerous_structure(&self) -> bool {
        self.in_conflict && self.out_conflict
    }

    /// Encode to the wire form stored in the leased record's metadata.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::from)
    }

    /// Decode from leased-record metadata bytes.
    ///
    /// `None` or empty bytes decode to the default descriptor: a record
    /// created by a process that has not yet persisted state reads as a
    /// running transaction with no flags.
    pub fn decode(data: Option<&[u8]>) -> Result<Self> {
        match data {
            None => Ok(Self::default()),
            Some(b) if b.is_empty() => Ok(Self::default()),
            Some(b) => serde_json::from_slice(b).map_err(Error::from),
        }
    }
}

impl Default for TxnDescriptor {
    fn default() -> Self {
        TxnDescriptor {
            status: TxnStatus::Running,
            in_conflict: false,
            out_conflict: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptor_is_running_without_flags() {
        let d = TxnDescriptor::default();
        assert_eq!(d.status, TxnStatus::Running);
        assert!(!d.in_conflict);
        assert!(!d.out_conflict);
        assert!(!d.has_dangerous_structure());
    }

    #[test]
    fn test_dangerous_structure_requires_both_edges() {
        let mut d = TxnDescriptor::default();
        d.in_conflict = true;
        assert!(!d.has_dangerous_structure());
        d.out_conflict = true;
        assert!(d.has_dangerous_structure());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let d = TxnDescriptor {
            status: TxnStatus::CompletedWithSuccess,
            in_conflict: true,
            out_conflict: false,
        };
        let bytes = d.encode().unwrap();
        let restored = TxnDescriptor::decode(Some(&bytes)).unwrap();
        assert_eq!(d, restored);
    }

    #[test]
    fn test_decode_missing_metadata_defaults() {
        assert_eq!(
            TxnDescriptor::decode(None).unwrap(),
            TxnDescriptor::default()
        );
        assert_eq!(
            TxnDescriptor::decode(Some(&[])).unwrap(),
            TxnDescriptor::default()
        );
    }

    #[test]
    fn test_decode_garbage_is_serialization_error() {
        let err = TxnDescriptor::decode(Some(b"not json")).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_status_predicates() {
        assert!(!TxnStatus::Running.is_terminal());
        assert!(TxnStatus::CompletedWithFailure.is_terminal());
        assert!(TxnStatus::CompletedWithSuccess.is_terminal());
        assert!(TxnStatus::CompletedWithSuccess.is_success());
        assert!(!TxnStatus::CompletedWithFailure.is_success());
    }
}
