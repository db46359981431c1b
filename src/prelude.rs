//! Convenience re-exports for tessera users.
//!
//! ```ignore
//! use tessera::prelude::*;
//! ```

pub use crate::database::{Tessera, TesseraBuilder};
pub use crate::workload::{WorkloadReport, WorkloadRunner};
pub use tessera_core::{Error, Result, TxnId, TxnStatus};
pub use tessera_txn::Transaction;
