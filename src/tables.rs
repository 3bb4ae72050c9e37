use crate::error::Result;
use crate::store::VersionedStore;
use crate::types::Record;
use serde_json::Value;

// ============ TABLE STORE ============

/// Borrowed wrapper scoping record operations to one collection.
pub struct TableStore<'s> {
    store: &'s VersionedStore,
    name: &'s str,
}

impl<'s> TableStore<'s> {
    pub(crate) fn new(store: &'s VersionedStore, name: &'s str) -> Self {
        Self { store, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Insert a record, returns its id
    pub fn insert(&self, payload: Value, user: &str) -> Result<String> {
        self.store.insert(self.name, payload, user)
    }

    /// Merge fields into a record
    pub fn update(&self, id: &str, payload: Value, user: &str) -> Result<()> {
        self.store.update(self.name, id, payload, user)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(self.name, id)
    }

    pub fn get(&self, id: &str) -> Result<Record> {
        self.store.select(self.name, id)
    }

    pub fn all(&self) -> Vec<Record> {
        self.store.select_all(self.name)
    }

    pub fn where_eq(&self, field: &str, value: &Value) -> Vec<Record> {
        self.store.select_where(self.name, field, value)
    }

    pub fn count(&self) -> usize {
        self.store.count(self.name)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::VersionedStore;
    use serde_json::json;

    #[test]
    fn test_table_forwards_to_store() {
        let store = VersionedStore::new();
        store.create_collection("items");
        let items = store.table("items");

        let a = items.insert(json!({"sku": "A", "qty": 1}), "clerk").unwrap();
        items.insert(json!({"sku": "B", "qty": 1}), "clerk").unwrap();
        items.update(&a, json!({"qty": 3}), "clerk").unwrap();

        assert_eq!(items.count(), 2);
        assert_eq!(items.get(&a).unwrap().get("qty"), Some(&json!(3)));
        assert_eq!(items.where_eq("qty", &json!(1)).len(), 1);
        assert!(items.delete(&a).unwrap());
        assert_eq!(items.all().len(), 1);
        assert_eq!(items.name(), "items");
    }
}
