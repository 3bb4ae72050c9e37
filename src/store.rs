use crate::error::{Result, StoreError};
use crate::journal::{Journal, JournalConfig, JournalOp};
use crate::tables::TableStore;
use crate::txn::{Snapshot, SnapshotSource};
use crate::types::{into_fields, Collection, Record, StoreState};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Store configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub journal: JournalConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set journal config
    pub fn journal(mut self, journal: JournalConfig) -> Self {
        self.journal = journal;
        self
    }

    /// Parse from a JSON document; missing keys take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// In-memory store of named collections with whole-state snapshots.
///
/// All state sits behind one lock, so every mutation is serialized and
/// `snapshot`/`restore` are atomic with respect to other calls.
pub struct VersionedStore {
    state: RwLock<StoreState>,
    journal: Box<dyn Journal>,
}

impl Default for VersionedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionedStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            journal: config.journal.build(),
        }
    }

    // --- Resource Accessors (Public API) ---

    /// Borrowed accessor scoped to one collection
    pub fn table<'s>(&'s self, name: &'s str) -> TableStore<'s> {
        TableStore::new(self, name)
    }

    pub fn journal(&self) -> &dyn Journal {
        self.journal.as_ref()
    }

    fn record_activity(&self, op: JournalOp) {
        let seq = self.journal.append(op);
        debug!(seq, "journal append");
    }

    // --- Collections ---

    /// Register an empty collection. Returns false if the name is taken.
    pub fn create_collection(&self, name: &str) -> bool {
        {
            let mut state = self.state.write();
            if state.collections.contains_key(name) {
                warn!(collection = name, "collection already exists");
                return false;
            }
            state.collections.insert(name.to_string(), Collection::new(name));
        }
        debug!(collection = name, "created collection");
        self.record_activity(JournalOp::CreateCollection { name: name.to_string() });
        true
    }

    /// Remove a collection with all its records
    pub fn drop_collection(&self, name: &str) -> bool {
        let removed = self.state.write().collections.remove(name);
        match removed {
            Some(coll) => {
                debug!(collection = name, records = coll.records.len(), "dropped collection");
                self.record_activity(JournalOp::DropCollection { name: name.to_string() });
                true
            }
            None => false,
        }
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.state.read().collections.contains_key(name)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.state.read().collections.keys().cloned().collect()
    }

    /// Record count, 0 for a missing collection
    pub fn count(&self, collection: &str) -> usize {
        self.state
            .read()
            .collections
            .get(collection)
            .map(|c| c.records.len())
            .unwrap_or(0)
    }

    // --- Records ---

    /// Insert a record built from a JSON object; returns its new id.
    /// `user` becomes the modifier and is registered as active.
    pub fn insert(&self, collection: &str, payload: Value, user: &str) -> Result<String> {
        let fields = into_fields(payload)?;
        let id = {
            let mut state = self.state.write();
            let coll = state
                .collections
                .get_mut(collection)
                .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
            let (seq, id) = coll.next_id();
            coll.records.insert(seq, Record::new(id.clone(), fields, user));
            state.active_users.insert(user.to_string());
            id
        };

        debug!(collection, id = %id, user, "inserted record");
        self.record_activity(JournalOp::Insert {
            collection: collection.to_string(),
            id: id.clone(),
            user: user.to_string(),
        });
        Ok(id)
    }

    /// Merge the payload's fields into an existing record
    pub fn update(&self, collection: &str, id: &str, payload: Value, user: &str) -> Result<()> {
        let fields = into_fields(payload)?;
        {
            let mut state = self.state.write();
            let coll = state
                .collections
                .get_mut(collection)
                .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
            let record = coll.get_mut(id).ok_or_else(|| StoreError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
            record.merge(fields, user);
        }

        debug!(collection, id, user, "updated record");
        self.record_activity(JournalOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            user: user.to_string(),
        });
        Ok(())
    }

    /// Remove a record. Ok(false) if the id was not present.
    pub fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let removed = {
            let mut state = self.state.write();
            let coll = state
                .collections
                .get_mut(collection)
                .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
            match coll.seq_of(id) {
                Some(seq) => coll.records.remove(&seq).is_some(),
                None => false,
            }
        };

        if removed {
            debug!(collection, id, "deleted record");
            self.record_activity(JournalOp::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(removed)
    }

    /// Copy of one record
    pub fn select(&self, collection: &str, id: &str) -> Result<Record> {
        let state = self.state.read();
        let coll = state
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        coll.get(id).cloned().ok_or_else(|| StoreError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    /// Copies of every record in insertion order; empty for a missing collection
    pub fn select_all(&self, collection: &str) -> Vec<Record> {
        self.state
            .read()
            .collections
            .get(collection)
            .map(|c| c.records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Copies of the records whose `field` equals `value`
    pub fn select_where(&self, collection: &str, field: &str, value: &Value) -> Vec<Record> {
        self.state
            .read()
            .collections
            .get(collection)
            .map(|c| {
                c.records
                    .values()
                    .filter(|r| r.fields.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- Snapshots ---

    /// Deep copy of the whole state, then bump the transaction counter.
    /// Restoring the result gives back exactly the state seen here.
    pub fn snapshot(&self) -> Snapshot {
        let mut state = self.state.write();
        let snap = Snapshot::capture(state.clone());
        state.transaction_counter += 1;
        debug!(sequence = snap.sequence(), "captured snapshot");
        snap
    }

    /// Replace the entire live state with a copy of `snapshot`
    pub fn restore(&self, snapshot: &Snapshot) {
        *self.state.write() = snapshot.state().clone();
        info!(sequence = snapshot.sequence(), "restored snapshot");
        self.record_activity(JournalOp::Restore { sequence: snapshot.sequence() });
    }

    /// Digest of the live state; matches `Snapshot::fingerprint` of a deep-equal state
    pub fn fingerprint(&self) -> u64 {
        self.state.read().fingerprint()
    }

    pub fn transaction_counter(&self) -> u64 {
        self.state.read().transaction_counter
    }

    // --- Session state ---

    pub fn set_auto_commit(&self, enabled: bool) {
        self.state.write().auto_commit = enabled;
        debug!(enabled, "auto-commit");
        self.record_activity(JournalOp::SetAutoCommit { enabled });
    }

    pub fn is_auto_commit(&self) -> bool {
        self.state.read().auto_commit
    }

    pub fn set_property(&self, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.state.write().properties.insert(key.to_string(), value.clone());
        debug!(key, value = %value, "set property");
        self.record_activity(JournalOp::SetProperty {
            key: key.to_string(),
            value,
        });
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.state.read().properties.get(key).cloned()
    }

    pub fn properties(&self) -> BTreeMap<String, String> {
        self.state.read().properties.clone()
    }

    /// Returns false if the user was already active
    pub fn register_user(&self, user: &str) -> bool {
        let added = self.state.write().active_users.insert(user.to_string());
        if added {
            debug!(user, "registered user");
            self.record_activity(JournalOp::RegisterUser { user: user.to_string() });
        }
        added
    }

    /// Returns false if the user was not active
    pub fn unregister_user(&self, user: &str) -> bool {
        let removed = self.state.write().active_users.remove(user);
        if removed {
            debug!(user, "unregistered user");
            self.record_activity(JournalOp::UnregisterUser { user: user.to_string() });
        }
        removed
    }

    pub fn active_users(&self) -> Vec<String> {
        self.state.read().active_users.iter().cloned().collect()
    }
}

impl SnapshotSource for VersionedStore {
    fn snapshot(&self) -> Snapshot {
        VersionedStore::snapshot(self)
    }

    fn restore(&self, snapshot: &Snapshot) {
        VersionedStore::restore(self, snapshot)
    }

    fn set_auto_commit(&self, enabled: bool) {
        VersionedStore::set_auto_commit(self, enabled)
    }
}
