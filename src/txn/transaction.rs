//! Transaction Implementation

use super::Snapshot;
use crate::types::now_millis;
use ahash::AHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique transaction identifier
pub type TxnId = u64;

/// Manager state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// No transaction open
    Idle,
    /// One transaction in progress
    Active,
}

/// A named in-transaction snapshot
#[derive(Debug, Clone)]
pub struct Savepoint {
    pub name: String,
    pub snapshot: Snapshot,
    /// Creation order within the transaction
    pub ordinal: u64,
}

/// The open transaction
pub struct Transaction {
    /// Unique transaction ID
    pub id: TxnId,
    pub name: String,
    /// Captured at begin, used by rollback
    pub baseline: Snapshot,
    pub started_at: u64,
    /// Opened by `execute_batch`; only the batch may end it
    pub batch: bool,
    savepoints: AHashMap<String, Savepoint>,
    next_ordinal: u64,
}

impl Transaction {
    /// Create a new transaction
    pub fn new(id: TxnId, name: &str, baseline: Snapshot) -> Self {
        Self {
            id,
            name: name.to_string(),
            baseline,
            started_at: now_millis(),
            batch: false,
            savepoints: AHashMap::new(),
            next_ordinal: 0,
        }
    }

    /// Store a savepoint, replacing any earlier one of the same name.
    /// Returns true if one was replaced.
    pub fn add_savepoint(&mut self, name: &str, snapshot: Snapshot) -> bool {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.savepoints
            .insert(
                name.to_string(),
                Savepoint {
                    name: name.to_string(),
                    snapshot,
                    ordinal,
                },
            )
            .is_some()
    }

    pub fn savepoint(&self, name: &str) -> Option<&Savepoint> {
        self.savepoints.get(name)
    }

    pub fn remove_savepoint(&mut self, name: &str) -> bool {
        self.savepoints.remove(name).is_some()
    }

    /// Savepoint names, oldest first
    pub fn savepoint_names(&self) -> Vec<String> {
        let mut sps: Vec<&Savepoint> = self.savepoints.values().collect();
        sps.sort_by_key(|sp| sp.ordinal);
        sps.into_iter().map(|sp| sp.name.clone()).collect()
    }

    pub fn savepoint_count(&self) -> usize {
        self.savepoints.len()
    }
}

/// Transaction ID generator
pub struct TxnIdGenerator {
    next_id: AtomicU64,
}

impl TxnIdGenerator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> TxnId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for TxnIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
