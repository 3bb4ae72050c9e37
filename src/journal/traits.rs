//! Journal Trait Definitions

/// Journal sequence number
pub type Seq = u64;

/// A single journal entry
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub seq: Seq,
    pub timestamp: u64,
    pub op: JournalOp,
}

/// Store activity that can be journaled
#[derive(Debug, Clone, PartialEq)]
pub enum JournalOp {
    CreateCollection { name: String },
    DropCollection { name: String },
    Insert { collection: String, id: String, user: String },
    Update { collection: String, id: String, user: String },
    Delete { collection: String, id: String },
    /// Whole-state replacement from a snapshot
    Restore { sequence: u64 },
    SetProperty { key: String, value: String },
    RegisterUser { user: String },
    UnregisterUser { user: String },
    SetAutoCommit { enabled: bool },
}

impl JournalOp {
    /// Short operation name, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            JournalOp::CreateCollection { .. } => "create_collection",
            JournalOp::DropCollection { .. } => "drop_collection",
            JournalOp::Insert { .. } => "insert",
            JournalOp::Update { .. } => "update",
            JournalOp::Delete { .. } => "delete",
            JournalOp::Restore { .. } => "restore",
            JournalOp::SetProperty { .. } => "set_property",
            JournalOp::RegisterUser { .. } => "register_user",
            JournalOp::UnregisterUser { .. } => "unregister_user",
            JournalOp::SetAutoCommit { .. } => "set_auto_commit",
        }
    }
}

/// Activity journal trait
///
/// Implementations:
/// - `NoOpJournal`: Does nothing (fastest)
/// - `MemoryJournal`: Bounded in-memory ring of recent entries
pub trait Journal: Send + Sync {
    /// Append an operation, returns its sequence number
    fn append(&self, op: JournalOp) -> Seq;

    /// Most recent entries, oldest first, at most `n`
    fn recent(&self, n: usize) -> Vec<JournalEntry>;

    /// Number of retained entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all retained entries (sequence numbers keep counting)
    fn clear(&self);

    /// Next sequence number to be assigned
    fn current_seq(&self) -> Seq;

    /// Whether entries are retained at all
    fn is_enabled(&self) -> bool;
}
