// Snapvault - In-memory versioned store
// Whole-state snapshots, savepoints, bounded commit history, atomic batches

pub mod error;
pub mod types;
pub mod store;
pub mod tables;
pub mod journal;
pub mod txn;

// Re-export main types
pub use error::{BoxError, Result, StoreError};
pub use types::{Fields, Record};
pub use store::{StoreConfig, VersionedStore};
pub use tables::TableStore;
pub use txn::{batch_op, BatchOperation, HistoryEntry, Snapshot, SnapshotSource, TransactionManager, TxnConfig, TxnState};
