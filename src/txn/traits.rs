//! Transaction Manager Traits

use super::Snapshot;

/// Something whose entire state can be captured and put back.
///
/// `TransactionManager` only reaches the store through this trait, so
/// record-level mutation always stays on the store's own API.
pub trait SnapshotSource: Send + Sync {
    /// Capture a deep copy of the current state
    fn snapshot(&self) -> Snapshot;

    /// Replace the current state wholesale with a copy of `snapshot`
    fn restore(&self, snapshot: &Snapshot);

    /// Flip the auto-commit flag
    fn set_auto_commit(&self, enabled: bool);
}
