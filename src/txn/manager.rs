//! Transaction Manager
//!
//! Flat Idle/Active state machine over one store: baseline snapshot at
//! begin, named savepoints inside the transaction, bounded history of
//! committed snapshots, and all-or-nothing batches.

use super::history::{HistoryEntry, TxnHistory};
use super::{SnapshotSource, Transaction, TxnConfig, TxnId, TxnIdGenerator, TxnState};
use crate::error::{BoxError, Result, StoreError};
use crate::store::VersionedStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One unit of work in a batch. Runs exactly once, in order.
pub type BatchOperation<'a, S = VersionedStore> =
    Box<dyn FnOnce(&S) -> std::result::Result<(), BoxError> + 'a>;

/// Box a closure as a batch operation against a `VersionedStore`
pub fn batch_op<'a, F>(f: F) -> BatchOperation<'a>
where
    F: FnOnce(&VersionedStore) -> std::result::Result<(), BoxError> + 'a,
{
    Box::new(f)
}

struct TxnInner {
    current: Option<Transaction>,
    history: TxnHistory,
}

/// Transaction manager bound to a single store.
///
/// Only one transaction can be open at a time; a `begin` from any caller
/// while one is active is rejected, never queued. Wrong-state calls return
/// `InvalidTransactionState` and change nothing.
pub struct TransactionManager<S: SnapshotSource = VersionedStore> {
    store: Arc<S>,
    config: TxnConfig,
    ids: TxnIdGenerator,
    inner: Mutex<TxnInner>,
}

fn not_active(op: &str) -> StoreError {
    warn!(op, "no active transaction");
    StoreError::InvalidTransactionState(format!("{} requires an active transaction", op))
}

fn still_active(op: &str, txn: &Transaction) -> StoreError {
    warn!(op, txn = %txn.name, "transaction still active");
    StoreError::InvalidTransactionState(format!(
        "{} not allowed while transaction '{}' is active",
        op, txn.name
    ))
}

fn batch_owned(op: &str, txn: &Transaction) -> StoreError {
    warn!(op, txn = %txn.name, "transaction owned by a running batch");
    StoreError::InvalidTransactionState(format!(
        "{} not allowed: transaction '{}' belongs to a running batch",
        op, txn.name
    ))
}

/// Rolls the batch's transaction back unless disarmed; covers panicking operations.
struct BatchGuard<'m, S: SnapshotSource> {
    mgr: &'m TransactionManager<S>,
    id: TxnId,
    armed: bool,
}

impl<S: SnapshotSource> Drop for BatchGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.mgr.rollback_txn(self.id) {
                warn!(id = self.id, error = %e, "batch cleanup rollback failed");
            }
        }
    }
}

impl<S: SnapshotSource> TransactionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, TxnConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: TxnConfig) -> Self {
        let history = TxnHistory::new(config.max_history);
        Self {
            store,
            config,
            ids: TxnIdGenerator::new(),
            inner: Mutex::new(TxnInner {
                current: None,
                history,
            }),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &TxnConfig {
        &self.config
    }

    // --- Lifecycle ---

    /// Open a transaction: capture the baseline and turn auto-commit off.
    pub fn begin(&self, name: &str) -> Result<TxnId> {
        self.open(name, false)
    }

    fn open(&self, name: &str, batch: bool) -> Result<TxnId> {
        let mut inner = self.inner.lock();
        if let Some(txn) = &inner.current {
            return Err(still_active(if batch { "execute_batch" } else { "begin" }, txn));
        }

        let baseline = self.store.snapshot();
        self.store.set_auto_commit(false);

        let id = self.ids.next();
        info!(txn = name, id, batch, sequence = baseline.sequence(), "transaction started");
        let mut txn = Transaction::new(id, name, baseline);
        txn.batch = batch;
        inner.current = Some(txn);
        Ok(id)
    }

    /// The open transaction, unless a batch owns it
    fn caller_txn<'i>(inner: &'i mut TxnInner, op: &str) -> Result<&'i mut Transaction> {
        match inner.current.as_mut() {
            None => Err(not_active(op)),
            Some(txn) if txn.batch => Err(batch_owned(op, txn)),
            Some(txn) => Ok(txn),
        }
    }

    /// Take the open transaction out only if it is still `id`
    fn take_txn(inner: &mut TxnInner, id: TxnId, op: &str) -> Result<Transaction> {
        match inner.current.as_ref().map(|t| t.id) {
            Some(found) if found == id => inner.current.take().ok_or_else(|| not_active(op)),
            Some(found) => {
                warn!(op, expected = id, found, "transaction was replaced");
                Err(StoreError::InvalidTransactionState(format!(
                    "{}: transaction {} is no longer the open transaction",
                    op, id
                )))
            }
            None => Err(not_active(op)),
        }
    }

    /// Append the end state to history, drop savepoints, re-enable auto-commit.
    pub fn commit(&self) -> Result<TxnId> {
        let mut inner = self.inner.lock();
        let id = Self::caller_txn(&mut inner, "commit")?.id;
        let txn = Self::take_txn(&mut inner, id, "commit")?;
        Ok(self.finish_commit(&mut inner, txn))
    }

    fn commit_txn(&self, id: TxnId) -> Result<TxnId> {
        let mut inner = self.inner.lock();
        let txn = Self::take_txn(&mut inner, id, "commit")?;
        Ok(self.finish_commit(&mut inner, txn))
    }

    fn finish_commit(&self, inner: &mut TxnInner, txn: Transaction) -> TxnId {
        let end = self.store.snapshot();
        if let Some(evicted) = inner.history.push(txn.id, &txn.name, end) {
            debug!(evicted = %evicted.name, max = inner.history.max(), "history bound reached");
        }
        self.store.set_auto_commit(true);

        info!(
            txn = %txn.name,
            id = txn.id,
            savepoints = txn.savepoint_count(),
            history = inner.history.len(),
            "transaction committed"
        );
        txn.id
    }

    /// Put the store back to the baseline, drop savepoints, re-enable auto-commit.
    pub fn rollback(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let id = Self::caller_txn(&mut inner, "rollback")?.id;
        let txn = Self::take_txn(&mut inner, id, "rollback")?;
        self.finish_rollback(txn);
        Ok(())
    }

    fn rollback_txn(&self, id: TxnId) -> Result<()> {
        let mut inner = self.inner.lock();
        let txn = Self::take_txn(&mut inner, id, "rollback")?;
        self.finish_rollback(txn);
        Ok(())
    }

    fn finish_rollback(&self, txn: Transaction) {
        self.store.restore(&txn.baseline);
        self.store.set_auto_commit(true);
        info!(txn = %txn.name, id = txn.id, "transaction rolled back");
    }

    // --- Savepoints ---

    /// Capture the in-transaction state under `name`, replacing any earlier one.
    pub fn create_savepoint(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let txn = Self::caller_txn(&mut inner, "create_savepoint")?;

        let snap = self.store.snapshot();
        let replaced = txn.add_savepoint(name, snap);
        debug!(txn = %txn.name, savepoint = name, replaced, "savepoint created");
        Ok(())
    }

    /// Restore the named savepoint. The transaction stays open and every
    /// other savepoint stays registered, later ones included.
    pub fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let txn = Self::caller_txn(&mut inner, "rollback_to_savepoint")?;
        let sp = txn.savepoint(name).ok_or_else(|| {
            warn!(txn = %txn.name, savepoint = name, "unknown savepoint");
            StoreError::SavepointNotFound(name.to_string())
        })?;

        self.store.restore(&sp.snapshot);
        info!(txn = %txn.name, savepoint = name, "rolled back to savepoint");
        Ok(())
    }

    /// Forget a savepoint without touching the store
    pub fn release_savepoint(&self, name: &str) -> bool {
        let mut inner = self.inner.lock();
        let released = Self::caller_txn(&mut inner, "release_savepoint")
            .map(|txn| txn.remove_savepoint(name))
            .unwrap_or(false);
        if released {
            debug!(savepoint = name, "savepoint released");
        }
        released
    }

    // --- History ---

    /// Restore the committed snapshot at `index` (0 = oldest retained).
    pub fn rollback_to_transaction(&self, index: usize) -> Result<()> {
        let inner = self.inner.lock();
        if let Some(txn) = &inner.current {
            return Err(still_active("rollback_to_transaction", txn));
        }
        self.restore_committed(&inner, index)
    }

    pub fn rollback_to_latest_transaction(&self) -> Result<()> {
        let inner = self.inner.lock();
        if let Some(txn) = &inner.current {
            return Err(still_active("rollback_to_latest_transaction", txn));
        }
        if inner.history.is_empty() {
            return Err(StoreError::HistoryIndexOutOfRange { index: 0, len: 0 });
        }
        self.restore_committed(&inner, inner.history.len() - 1)
    }

    fn restore_committed(&self, inner: &TxnInner, index: usize) -> Result<()> {
        let snap = inner
            .history
            .get(index)
            .ok_or(StoreError::HistoryIndexOutOfRange {
                index,
                len: inner.history.len(),
            })?;

        self.store.restore(snap);
        // committed snapshots are taken with auto-commit off
        self.store.set_auto_commit(true);
        info!(index, sequence = snap.sequence(), "rolled back to committed transaction");
        Ok(())
    }

    /// Empty the history. Only while idle.
    pub fn clear_history(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(txn) = &inner.current {
            return Err(still_active("clear_history", txn));
        }
        let dropped = inner.history.len();
        inner.history.clear();
        info!(dropped, "history cleared");
        Ok(())
    }

    // --- Batch ---

    /// Run `operations` in order inside one transaction named `name`.
    ///
    /// Commits if all succeed. On the first failure the transaction is rolled
    /// back to its baseline before the error is returned, so nothing the batch
    /// did is visible afterwards. `step` in the error is the index of the
    /// failing operation. While the batch runs, other callers cannot commit,
    /// roll back or touch savepoints of its transaction. A panicking operation
    /// still rolls the transaction back while unwinding.
    pub fn execute_batch(&self, operations: Vec<BatchOperation<'_, S>>, name: &str) -> Result<()> {
        let id = self.open(name, true)?;
        let mut guard = BatchGuard {
            mgr: self,
            id,
            armed: true,
        };
        let total = operations.len();

        for (step, op) in operations.into_iter().enumerate() {
            if let Err(source) = op(self.store.as_ref()) {
                warn!(batch = name, step, total, error = %source, "batch operation failed");
                guard.armed = false;
                self.rollback_txn(id)?;
                return Err(StoreError::BatchOperationFailed {
                    batch: name.to_string(),
                    step,
                    source,
                });
            }
        }

        guard.armed = false;
        self.commit_txn(id)?;
        debug!(batch = name, total, "batch committed");
        Ok(())
    }

    // --- Introspection ---

    pub fn state(&self) -> TxnState {
        if self.inner.lock().current.is_some() {
            TxnState::Active
        } else {
            TxnState::Idle
        }
    }

    pub fn is_in_transaction(&self) -> bool {
        self.state() == TxnState::Active
    }

    /// Name of the open transaction
    pub fn current_transaction(&self) -> Option<String> {
        self.inner.lock().current.as_ref().map(|t| t.name.clone())
    }

    pub fn current_txn_id(&self) -> Option<TxnId> {
        self.inner.lock().current.as_ref().map(|t| t.id)
    }

    /// Savepoints of the open transaction, oldest first
    pub fn savepoint_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .current
            .as_ref()
            .map(|t| t.savepoint_names())
            .unwrap_or_default()
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().history.entries()
    }

    /// Commits ever made, including ones evicted from history
    pub fn committed_count(&self) -> u64 {
        self.inner.lock().history.total()
    }
}
