//! In-memory Journal Implementation
//!
//! Bounded ring buffer: once `capacity` entries are held, each append
//! evicts the oldest one.

use super::{Journal, JournalEntry, JournalOp, Seq};
use crate::types::now_millis;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Journal that keeps the most recent entries in memory
pub struct MemoryJournal {
    inner: Mutex<Ring>,
    capacity: usize,
}

struct Ring {
    entries: VecDeque<JournalEntry>,
    next_seq: Seq,
}

impl MemoryJournal {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                next_seq: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Journal for MemoryJournal {
    fn append(&self, op: JournalOp) -> Seq {
        let mut ring = self.inner.lock();
        let seq = ring.next_seq;
        ring.next_seq += 1;

        if ring.entries.len() == self.capacity {
            ring.entries.pop_front();
        }
        ring.entries.push_back(JournalEntry {
            seq,
            timestamp: now_millis(),
            op,
        });
        seq
    }

    fn recent(&self, n: usize) -> Vec<JournalEntry> {
        let ring = self.inner.lock();
        let skip = ring.entries.len().saturating_sub(n);
        ring.entries.iter().skip(skip).cloned().collect()
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    fn current_seq(&self) -> Seq {
        self.inner.lock().next_seq
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
