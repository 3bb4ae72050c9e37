//! Transaction Manager Module
//!
//! Snapshot-based transactions over a `VersionedStore`: BEGIN captures a
//! baseline, ROLLBACK restores it, COMMIT appends the end state to a
//! bounded history. Savepoints give partial rollback inside a transaction.
//!
//! # Example
//! ```ignore
//! use snapvault::txn::{TransactionManager, TxnConfig};
//!
//! let mgr = TransactionManager::with_config(store, TxnConfig::default().max_history(50));
//! mgr.begin("T1")?;
//! // ... mutate through the store ...
//! mgr.commit()?;
//! ```

mod history;
mod manager;
mod snapshot;
mod traits;
mod transaction;

pub use history::HistoryEntry;
pub use manager::{batch_op, BatchOperation, TransactionManager};
pub use snapshot::Snapshot;
pub use traits::SnapshotSource;
pub use transaction::{Savepoint, Transaction, TxnId, TxnIdGenerator, TxnState};

use crate::error::Result;
use serde::Deserialize;

/// Transaction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TxnConfig {
    /// Committed snapshots kept in history; the oldest is evicted past this
    pub max_history: usize,
}

impl Default for TxnConfig {
    fn default() -> Self {
        Self { max_history: 10 }
    }
}

impl TxnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set history bound (0 is treated as 1)
    pub fn max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    /// Parse from a JSON document; missing keys take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        assert_eq!(TxnConfig::default().max_history, 10);
        assert_eq!(TxnConfig::new().max_history(3).max_history, 3);
        assert_eq!(TxnConfig::from_json("{}").unwrap().max_history, 10);
        assert_eq!(TxnConfig::from_json(r#"{"max_history": 2}"#).unwrap().max_history, 2);
    }
}
