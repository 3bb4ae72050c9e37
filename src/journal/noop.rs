//! No-Op Journal Implementation
//!
//! Keeps nothing. Sequence numbers still advance so callers can correlate
//! log lines, but `recent()` is always empty and `len()` always 0: callers
//! reading activity back must check `is_enabled()` first.

use super::{Journal, JournalEntry, JournalOp, Seq};
use std::sync::atomic::{AtomicU64, Ordering};

/// Journal used when activity tracking is off. Appends are accepted and
/// numbered, then discarded.
pub struct NoOpJournal {
    seq: AtomicU64,
}

impl NoOpJournal {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
        }
    }
}

impl Default for NoOpJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal for NoOpJournal {
    fn append(&self, _op: JournalOp) -> Seq {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn recent(&self, _n: usize) -> Vec<JournalEntry> {
        vec![]
    }

    fn len(&self) -> usize {
        0
    }

    fn clear(&self) {}

    fn current_seq(&self) -> Seq {
        self.seq.load(Ordering::Relaxed)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
