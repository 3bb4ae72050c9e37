//! Error types for the store and transaction manager

use thiserror::Error;

/// Boxed error returned by batch operations.
///
/// Anything that converts into it (including `StoreError`) can abort a batch.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },

    #[error("Invalid transaction state: {0}")]
    InvalidTransactionState(String),

    #[error("Savepoint not found: {0}")]
    SavepointNotFound(String),

    #[error("History index {index} out of range (history size {len})")]
    HistoryIndexOutOfRange { index: usize, len: usize },

    #[error("Batch '{batch}' failed at operation {step}: {source}")]
    BatchOperationFailed {
        batch: String,
        step: usize,
        #[source]
        source: BoxError,
    },

    #[error("Invalid fields: {0}")]
    InvalidFields(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl StoreError {
    /// True for the wrong-state family of errors (stray commit, double begin...)
    pub fn is_state_violation(&self) -> bool {
        matches!(self, StoreError::InvalidTransactionState(_))
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
