//! Unified error types for tessera.
//!
//! One taxonomy serves every layer. Store-level CAS failures and lock
//! collisions are expected outcomes callers retry on; lease expiry and
//! backend trouble are infrastructure failures. A non-serializable
//! transaction is NOT an error — commit reports it as a status value.

use thiserror::Error;

/// All tessera errors.
///
/// This is the canonical error type for every operation in the workspace.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Create on a key with a live (non-tombstoned) version
    #[error("already exists: {key}")]
    AlreadyExists {
        /// Key whose chain already has a live head
        key: String,
    },

    /// Read or delete on a missing or tombstoned key
    #[error("not found: {key}")]
    NotFound {
        /// Key with no live version
        key: String,
    },

    /// Update/delete with an expected version that is no longer current
    #[error("conflict on {key}: version {expected} is not current")]
    Conflict {
        /// Key being written
        key: String,
        /// The stale expected version supplied by the caller
        expected: u64,
    },

    /// Write-lock or SI-read-lock insert collision
    #[error("lock contention on {key}")]
    LockContention {
        /// Key whose lock row already exists
        key: String,
    },

    /// Backend insert-if-absent hit an existing row
    ///
    /// This is the raw backend signal; the store layer translates it into
    /// [`Error::AlreadyExists`], [`Error::Conflict`] or
    /// [`Error::LockContention`] depending on which row collided.
    #[error("row exists: {partition}/{sort_key}")]
    RowExists {
        /// Partition key of the colliding row
        partition: String,
        /// Sort key of the colliding row
        sort_key: String,
    },

    /// Lease could not be acquired before the caller's deadline, or a
    /// lease token went stale mid-operation
    #[error("lease unavailable: {id}")]
    LeaseUnavailable {
        /// Record id the lease was requested on
        id: String,
    },

    /// Transport-level failure from the backend, not otherwise classified
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Descriptor encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for tessera operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retryable errors (CAS conflicts, lock collisions) may succeed on
    /// retry with fresh state. The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Conflict { .. } | Error::LockContention { .. } | Error::RowExists { .. }
        )
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is a CAS conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this is a lock collision.
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, Error::LockContention { .. })
    }

    /// Check if this is a lease acquisition/validity failure.
    pub fn is_lease_unavailable(&self) -> bool {
        matches!(self, Error::LeaseUnavailable { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
