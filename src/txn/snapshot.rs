//! Snapshot Implementation

use crate::types::{now_millis, Record, StoreState};

/// An immutable capture of the whole store at a point in time
///
/// Holds its own deep copy of every collection, record, property and
/// active user. Nothing done to the live store afterwards is visible
/// through it, and the only way back into a store is `restore`, which
/// copies again.
#[derive(Debug, Clone)]
pub struct Snapshot {
    state: StoreState,
    /// Transaction counter value at capture
    sequence: u64,
    /// Unix millis at capture
    taken_at: u64,
}

impl Snapshot {
    pub(crate) fn capture(state: StoreState) -> Self {
        Self {
            sequence: state.transaction_counter,
            state,
            taken_at: now_millis(),
        }
    }

    pub(crate) fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn taken_at(&self) -> u64 {
        self.taken_at
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.state.collections.keys().cloned().collect()
    }

    /// Record count of a captured collection, 0 if it was absent
    pub fn record_count(&self, collection: &str) -> usize {
        self.state
            .collections
            .get(collection)
            .map(|c| c.records.len())
            .unwrap_or(0)
    }

    pub fn record(&self, collection: &str, id: &str) -> Option<&Record> {
        self.state.collections.get(collection)?.get(id)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.state.properties.get(key).map(String::as_str)
    }

    pub fn active_users(&self) -> Vec<String> {
        self.state.active_users.iter().cloned().collect()
    }

    pub fn auto_commit(&self) -> bool {
        self.state.auto_commit
    }

    /// Content digest; equal for snapshots of deep-equal states
    pub fn fingerprint(&self) -> u64 {
        self.state.fingerprint()
    }
}
