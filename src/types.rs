use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, StoreError};

/// Field name → dynamically typed value
pub type Fields = Map<String, Value>;

/// Unix time in milliseconds
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Accept a JSON payload only if it is an object
pub(crate) fn into_fields(payload: Value) -> Result<Fields> {
    match payload {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidFields(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// A single row of a collection.
///
/// `id` is fixed at creation; everything else moves with updates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    id: String,
    pub fields: Fields,
    pub modified_at: u64,
    pub modified_by: String,
}

impl Record {
    pub(crate) fn new(id: String, fields: Fields, user: &str) -> Self {
        Self {
            id,
            fields,
            modified_at: now_millis(),
            modified_by: user.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read one field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Merge `fields` over the current ones (upsert of fields, not a replace)
    pub(crate) fn merge(&mut self, fields: Fields, user: &str) {
        for (k, v) in fields {
            self.fields.insert(k, v);
        }
        self.modified_at = now_millis();
        self.modified_by = user.to_string();
    }
}

/// A named table. Records are keyed by their insertion sequence so
/// iteration follows insertion order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Collection {
    pub name: String,
    pub next_seq: u64,
    pub records: BTreeMap<u64, Record>,
}

impl Collection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            next_seq: 1,
            records: BTreeMap::new(),
        }
    }

    /// Allocate the next `{name}_{n}` id
    pub fn next_id(&mut self) -> (u64, String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        (seq, format!("{}_{}", self.name, seq))
    }

    /// Map an id back to its sequence. Only the exact `{name}_{n}` spelling
    /// matches, so `users_01` or `users_+1` never reach `users_1`.
    pub fn seq_of(&self, id: &str) -> Option<u64> {
        let seq: u64 = id
            .strip_prefix(self.name.as_str())?
            .strip_prefix('_')?
            .parse()
            .ok()?;
        (format!("{}_{}", self.name, seq) == id).then_some(seq)
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.seq_of(id).and_then(|seq| self.records.get(&seq))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Record> {
        let seq = self.seq_of(id)?;
        self.records.get_mut(&seq)
    }
}

/// Everything a snapshot captures and a restore replaces.
///
/// Ordered maps keep the encoded form deterministic, which `fingerprint`
/// relies on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct StoreState {
    pub collections: BTreeMap<String, Collection>,
    pub active_users: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
    pub transaction_counter: u64,
    pub auto_commit: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            collections: BTreeMap::new(),
            active_users: BTreeSet::new(),
            properties: BTreeMap::new(),
            transaction_counter: 0,
            auto_commit: true,
        }
    }
}

impl StoreState {
    /// seahash over the bincode encoding of the whole state
    pub fn fingerprint(&self) -> u64 {
        match bincode::serialize(self) {
            Ok(bytes) => seahash::hash(&bytes),
            // Every field here is serializable; keep the fallback total anyway
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_scoped_and_monotonic() {
        let mut users = Collection::new("users");
        assert_eq!(users.next_id(), (1, "users_1".to_string()));
        assert_eq!(users.next_id(), (2, "users_2".to_string()));

        assert_eq!(users.seq_of("users_2"), Some(2));
        assert_eq!(users.seq_of("orders_2"), None);
        assert_eq!(users.seq_of("users_x"), None);
        assert_eq!(users.seq_of("users2"), None);
    }

    #[test]
    fn test_only_canonical_ids_resolve() {
        let mut users = Collection::new("users");
        let (seq, id) = users.next_id();
        users.records.insert(seq, Record::new(id, Fields::new(), "admin"));

        assert!(users.get("users_1").is_some());
        for alias in ["users_01", "users_+1", "users_001", "users_1 "] {
            assert_eq!(users.seq_of(alias), None, "{} must not resolve", alias);
            assert!(users.get(alias).is_none());
        }
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let mut rec = Record::new(
            "users_1".into(),
            into_fields(json!({"name": "Alice"})).unwrap(),
            "admin",
        );
        rec.merge(into_fields(json!({"age": 30})).unwrap(), "bob");

        assert_eq!(rec.get("name"), Some(&json!("Alice")));
        assert_eq!(rec.get("age"), Some(&json!(30)));
        assert_eq!(rec.modified_by, "bob");
        assert_eq!(rec.id(), "users_1");
    }

    #[test]
    fn test_non_object_payload_rejected() {
        assert!(matches!(
            into_fields(json!([1, 2])),
            Err(StoreError::InvalidFields(_))
        ));
        assert!(into_fields(json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut a = StoreState::default();
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());

        a.properties.insert("isolation".into(), "serializable".into());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
