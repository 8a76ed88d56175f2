//! Resource model contract and the shared table engine behind it

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use serde_json::{json, Number, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tallyweb_store::{AuditAction, Record, StoreRef};
use tokio::sync::Mutex;

/// Query string parameters handed to `find`
pub type Query = HashMap<String, String>;

/// Model reference type
pub type ModelRef = Arc<dyn ResourceModel>;

/// CRUD operations exposed by every resource
#[async_trait]
pub trait ResourceModel: Send + Sync {
    /// Resource name used in logs and errors
    fn name(&self) -> &str;

    /// All records, in insertion order. The query is accepted but not applied.
    async fn find(&self, query: &Query) -> CoreResult<Vec<Record>>;

    /// Record at a positional index of the data array
    async fn get(&self, index: &str) -> CoreResult<Record>;

    /// Store a new record and return it with its assigned id
    async fn post(&self, data: Record) -> CoreResult<Record>;

    /// Merge `data` into the record whose `id` matches; `value` accumulates
    async fn patch(&self, id: &Value, data: Record) -> CoreResult<Record>;

    /// Remove the record whose `id` matches
    async fn delete(&self, id: &Value) -> CoreResult<()>;
}

/// Read-modify-write engine over one table document.
///
/// All mutations of a table run under its lock, so in-process callers never
/// interleave their load and save.
pub struct Table {
    resource: String,
    store: StoreRef,
    lock: Mutex<()>,
}

impl Table {
    /// Open a table, seeding its document if it does not exist yet
    pub async fn open(resource: &str, store: StoreRef) -> CoreResult<Self> {
        store.ensure().await?;
        Ok(Self {
            resource: resource.to_string(),
            store,
            lock: Mutex::new(()),
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub async fn find(&self) -> CoreResult<Vec<Record>> {
        let _guard = self.lock.lock().await;
        Ok(self.store.load().await?.data)
    }

    pub async fn get(&self, index: &str) -> CoreResult<Record> {
        let position: usize = index
            .trim()
            .parse()
            .map_err(|_| CoreError::not_found(&self.resource, index))?;

        let _guard = self.lock.lock().await;
        let mut document = self.store.load().await?;
        if position >= document.data.len() {
            return Err(CoreError::not_found(&self.resource, index));
        }
        Ok(document.data.swap_remove(position))
    }

    pub async fn post(&self, data: Record) -> CoreResult<Record> {
        let _guard = self.lock.lock().await;
        let mut document = self.store.load().await?;

        let mut record = data;
        record.insert("active".to_string(), Value::Bool(true));
        record.insert("id".to_string(), Value::from(document.meta.next_index));

        document.data.push(record.clone());
        document.touch();
        document.meta.next_index += 1;
        document.audit(AuditAction::Create, Value::Object(record.clone()));

        self.store.save(&document).await?;
        Ok(record)
    }

    pub async fn patch(&self, id: &Value, data: Record) -> CoreResult<Record> {
        let _guard = self.lock.lock().await;
        let mut document = self.store.load().await?;

        let position = document
            .position_of(id)
            .ok_or_else(|| CoreError::not_found(&self.resource, display_key(id)))?;

        // A record keeps the id it was created with
        let mut changes = data;
        changes.remove("id");

        let merged = {
            let record = &mut document.data[position];
            let value = accumulate(record.get("value"), changes.get("value"))?;

            tallyweb_utils::deep_merge(record, &changes);
            if let Some(value) = value {
                record.insert("value".to_string(), value);
            }
            record.insert(
                "updatedAt".to_string(),
                Value::String(tallyweb_utils::now_iso()),
            );
            record.clone()
        };

        let record_id = merged.get("id").cloned().unwrap_or(Value::Null);
        document.touch();
        document.audit(AuditAction::Patch, json!({ "id": record_id, "data": changes }));

        self.store.save(&document).await?;
        Ok(merged)
    }

    pub async fn delete(&self, id: &Value) -> CoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.store.load().await?;

        let position = document
            .position_of(id)
            .ok_or_else(|| CoreError::not_found(&self.resource, display_key(id)))?;

        let removed = document.data.remove(position);
        let record_id = removed.get("id").cloned().unwrap_or(Value::Null);
        document.touch();
        document.audit(AuditAction::Delete, json!({ "id": record_id }));

        self.store.save(&document).await?;
        Ok(())
    }
}

fn display_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric<'a>(field: &str, value: Option<&'a Value>) -> CoreResult<Option<&'a Number>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n)),
        Some(other) => Err(CoreError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a number, got {}", other),
        }),
    }
}

/// New `value` for a patch: the existing value plus the delta.
/// Returns `None` when the patch carries no delta.
fn accumulate(existing: Option<&Value>, delta: Option<&Value>) -> CoreResult<Option<Value>> {
    let delta = match numeric("value", delta)? {
        Some(delta) => delta,
        None => return Ok(None),
    };

    let total = match numeric("value", existing)? {
        Some(current) => tallyweb_utils::add_numbers(current, delta).ok_or_else(|| {
            CoreError::InvalidValue {
                field: "value".to_string(),
                reason: "sum is not representable".to_string(),
            }
        })?,
        None => delta.clone(),
    };

    Ok(Some(Value::Number(total)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tallyweb_store::{JsonFileStore, TableDocument, TableStore};
    use tempfile::TempDir;

    pub(crate) fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    pub(crate) fn temp_store(dir: &TempDir, file: &str) -> StoreRef {
        Arc::new(JsonFileStore::new(dir.path().join(file)))
    }

    async fn table() -> (TempDir, StoreRef, Table) {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir, "table.json");
        let table = Table::open("things", store.clone()).await.unwrap();
        (dir, store, table)
    }

    #[tokio::test]
    async fn test_open_seeds_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("things.json");
        let store: StoreRef = Arc::new(JsonFileStore::new(&path));

        Table::open("things", store).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_post_assigns_increasing_ids() {
        let (_dir, store, table) = table().await;

        for expected in 1..=4u64 {
            let created = table.post(record(json!({"name": format!("n{}", expected)}))).await.unwrap();
            assert_eq!(created["id"], json!(expected));
            assert_eq!(created["active"], json!(true));
        }

        let document = store.load().await.unwrap();
        assert_eq!(document.meta.next_index, 5);
        assert_eq!(document.transactions.len(), 4);
        assert!(document.transactions.iter().all(|t| t.action == AuditAction::Create));
    }

    #[tokio::test]
    async fn test_find_returns_insertion_order() {
        let (_dir, _store, table) = table().await;
        for name in ["a", "b", "c"] {
            table.post(record(json!({"name": name}))).await.unwrap();
        }

        let names: Vec<Value> = table.find().await.unwrap().into_iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[tokio::test]
    async fn test_get_uses_position() {
        let (_dir, _store, table) = table().await;
        table.post(record(json!({"name": "a"}))).await.unwrap();
        table.post(record(json!({"name": "b"}))).await.unwrap();

        assert_eq!(table.get("0").await.unwrap()["name"], json!("a"));
        assert_eq!(table.get("1").await.unwrap()["id"], json!(2));
        assert!(matches!(table.get("2").await, Err(CoreError::NotFound { .. })));
        assert!(matches!(table.get("-1").await, Err(CoreError::NotFound { .. })));
        assert!(matches!(table.get("abc").await, Err(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_patch_accumulates_value() {
        let (_dir, store, table) = table().await;
        table.post(record(json!({"name": "food", "value": 5}))).await.unwrap();

        let patched = table.patch(&json!(1), record(json!({"value": 12, "label": "groceries"}))).await.unwrap();
        assert_eq!(patched["value"], json!(17));
        assert_eq!(patched["label"], json!("groceries"));
        assert_eq!(patched["name"], json!("food"));
        assert!(patched["updatedAt"].is_string());

        let document = store.load().await.unwrap();
        assert_eq!(document.data[0]["value"], json!(17));
        let last = document.transactions.last().unwrap();
        assert_eq!(last.action, AuditAction::Patch);
        assert_eq!(last.data, json!({"id": 1, "data": {"value": 12, "label": "groceries"}}));
    }

    #[tokio::test]
    async fn test_patch_cannot_change_id() {
        let (_dir, store, table) = table().await;
        table.post(record(json!({"name": "a"}))).await.unwrap();
        table.post(record(json!({"name": "b"}))).await.unwrap();

        let patched = table.patch(&json!(1), record(json!({"id": 2, "name": "renamed"}))).await.unwrap();
        assert_eq!(patched["id"], json!(1));
        assert_eq!(patched["name"], json!("renamed"));

        let document = store.load().await.unwrap();
        let ids: Vec<Value> = document.data.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
        assert_eq!(document.meta.next_index, 3);
        assert_eq!(
            document.transactions.last().unwrap().data,
            json!({"id": 1, "data": {"name": "renamed"}})
        );
        assert_eq!(table.patch(&json!(1), Record::new()).await.unwrap()["name"], json!("renamed"));
    }

    #[tokio::test]
    async fn test_patch_null_replaces_field() {
        let (_dir, _store, table) = table().await;
        table.post(record(json!({"note": "x", "value": 3}))).await.unwrap();

        let patched = table.patch(&json!(1), record(json!({"note": null, "value": null}))).await.unwrap();
        assert_eq!(patched["note"], Value::Null);
        assert_eq!(patched["value"], json!(3));
    }

    #[tokio::test]
    async fn test_patch_matches_numeric_string_id() {
        let (_dir, _store, table) = table().await;
        table.post(record(json!({"value": 1.5}))).await.unwrap();

        let patched = table.patch(&json!("1"), record(json!({"value": 1}))).await.unwrap();
        assert_eq!(patched["value"].as_f64(), Some(2.5));
    }

    #[tokio::test]
    async fn test_patch_without_value_leaves_it() {
        let (_dir, _store, table) = table().await;
        table.post(record(json!({"value": 3}))).await.unwrap();

        let patched = table.patch(&json!(1), record(json!({"note": "x"}))).await.unwrap();
        assert_eq!(patched["value"], json!(3));
    }

    #[tokio::test]
    async fn test_patch_missing_id_changes_nothing() {
        let (_dir, store, table) = table().await;
        table.post(record(json!({"value": 3}))).await.unwrap();
        let before: TableDocument = store.load().await.unwrap();

        let err = table.patch(&json!(9), record(json!({"value": 1}))).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(store.load().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_patch_rejects_non_numeric_value() {
        let (_dir, store, table) = table().await;
        table.post(record(json!({"value": 3}))).await.unwrap();
        let before = store.load().await.unwrap();

        let err = table.patch(&json!(1), record(json!({"value": "lots"}))).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { .. }));
        assert_eq!(store.load().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_persists_removal() {
        let (_dir, store, table) = table().await;
        table.post(record(json!({"name": "a"}))).await.unwrap();
        table.post(record(json!({"name": "b"}))).await.unwrap();

        table.delete(&json!(1)).await.unwrap();

        let document = store.load().await.unwrap();
        assert_eq!(document.data.len(), 1);
        assert_eq!(document.data[0]["id"], json!(2));
        assert_eq!(document.meta.next_index, 3);
        let last = document.transactions.last().unwrap();
        assert_eq!(last.action, AuditAction::Delete);
        assert_eq!(last.data, json!({"id": 1}));
    }

    #[tokio::test]
    async fn test_delete_missing_id() {
        let (_dir, store, table) = table().await;
        let before = store.load().await.unwrap();

        assert!(matches!(table.delete(&json!(1)).await, Err(CoreError::NotFound { .. })));
        assert_eq!(store.load().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_concurrent_posts_do_not_lose_updates() {
        let (_dir, store, table) = table().await;
        let table = Arc::new(table);

        let mut handles = Vec::new();
        for n in 0..10 {
            let table = table.clone();
            handles.push(tokio::spawn(async move {
                table.post(record(json!({"n": n}))).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let document = store.load().await.unwrap();
        assert_eq!(document.data.len(), 10);
        assert_eq!(document.meta.next_index, 11);
    }

    #[test]
    fn test_accumulate() {
        assert_eq!(accumulate(Some(&json!(5)), Some(&json!(12))).unwrap(), Some(json!(17)));
        assert_eq!(accumulate(None, Some(&json!(2))).unwrap(), Some(json!(2)));
        assert_eq!(accumulate(Some(&json!(5)), None).unwrap(), None);
        assert_eq!(accumulate(Some(&json!(5)), Some(&Value::Null)).unwrap(), None);
        assert!(accumulate(Some(&json!("5")), Some(&json!(1))).is_err());
    }
}
