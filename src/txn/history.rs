//! Bounded commit history
//!
//! FIFO: eviction is driven purely by insertion count.

use super::{Snapshot, TxnId};
use std::collections::VecDeque;

/// Summary of one retained commit
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub txn_id: TxnId,
    pub name: String,
    /// Snapshot sequence of the committed state
    pub sequence: u64,
    pub committed_at: u64,
}

struct Committed {
    entry: HistoryEntry,
    snapshot: Snapshot,
}

pub struct TxnHistory {
    entries: VecDeque<Committed>,
    max: usize,
    /// Commits ever pushed, evicted ones included
    total: u64,
}

impl TxnHistory {
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            entries: VecDeque::with_capacity(max.min(64)),
            max,
            total: 0,
        }
    }

    /// Append a commit. Returns the evicted entry, if the bound was hit.
    pub fn push(&mut self, txn_id: TxnId, name: &str, snapshot: Snapshot) -> Option<HistoryEntry> {
        let entry = HistoryEntry {
            txn_id,
            name: name.to_string(),
            sequence: snapshot.sequence(),
            committed_at: snapshot.taken_at(),
        };
        self.entries.push_back(Committed { entry, snapshot });
        self.total += 1;

        if self.entries.len() > self.max {
            self.entries.pop_front().map(|c| c.entry)
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index).map(|c| &c.snapshot)
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.back().map(|c| &c.snapshot)
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().map(|c| c.entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoreState;

    fn snap(seq: u64) -> Snapshot {
        let mut state = StoreState::default();
        state.transaction_counter = seq;
        Snapshot::capture(state)
    }

    #[test]
    fn test_fifo_eviction() {
        let mut history = TxnHistory::new(2);
        assert!(history.push(1, "a", snap(1)).is_none());
        assert!(history.push(2, "b", snap(2)).is_none());

        let evicted = history.push(3, "c", snap(3)).unwrap();
        assert_eq!(evicted.name, "a");

        let names: Vec<String> = history.entries().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(history.latest().unwrap().sequence(), 3);
        assert_eq!(history.total(), 3);
    }

    #[test]
    fn test_clear_keeps_total() {
        let mut history = TxnHistory::new(0);
        assert_eq!(history.max(), 1);
        history.push(1, "a", snap(1));
        history.clear();
        assert!(history.is_empty());
        assert!(history.get(0).is_none());
        assert_eq!(history.total(), 1);
    }
}
