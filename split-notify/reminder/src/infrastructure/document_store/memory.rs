use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::domain::model::{Document, FetchResult};
use crate::domain::repository::DocumentStore;
use crate::error::{ReminderError, Result};

/// 内存文档存储，本地运行与测试使用
///
/// 种子文件格式：`{"users": {"U1": {"name": "Alice"}}, "splits": {...}}`
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ReminderError::Config(format!("unable to read seed file {}: {e}", path.display()))
        })?;
        let seed: Value = serde_json::from_str(&content).map_err(|e| {
            ReminderError::Config(format!("invalid seed file {}: {e}", path.display()))
        })?;
        let store = Self::from_seed(seed)?;
        info!(path = %path.display(), documents = store.len(), "Loaded in-memory documents");
        Ok(store)
    }

    pub fn from_seed(seed: Value) -> Result<Self> {
        let Value::Object(collections) = seed else {
            return Err(ReminderError::Config(
                "seed must be an object of collections".to_string(),
            ));
        };

        let store = Self::new();
        for (collection, documents) in collections {
            let Value::Object(documents) = documents else {
                return Err(ReminderError::Config(format!(
                    "seed collection `{collection}` must be an object of documents"
                )));
            };
            for (id, fields) in documents {
                store.insert(&collection, &id, fields);
            }
        }
        Ok(store)
    }

    /// 写入文档；非对象值按空文档处理
    ///
    /// 锁中毒时沿用内部数据，写入不会丢失
    pub fn insert(&self, collection: &str, id: &str, fields: Value) {
        let document = match fields {
            Value::Object(map) => map,
            _ => Document::new(),
        };
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    pub fn len(&self) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<FetchResult> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .map(FetchResult::Found)
            .unwrap_or(FetchResult::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_distinguishes_found_and_missing() {
        let store = InMemoryDocumentStore::new();
        store.insert("users", "U1", json!({"name": "Alice"}));

        let found = store.get("users", "U1").await.unwrap();
        assert!(found.is_found());
        assert_eq!(store.get("users", "U2").await.unwrap(), FetchResult::NotFound);
        assert_eq!(store.get("splits", "U1").await.unwrap(), FetchResult::NotFound);
    }

    #[test]
    fn seed_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(
            &path,
            json!({
                "users": {"U1": {"name": "Alice"}, "U2": {"fcmToken": "tok2"}},
                "splits": {"S1": {"description": "Lunch"}}
            })
            .to_string(),
        )
        .unwrap();

        let store = InMemoryDocumentStore::from_seed_file(&path).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn writes_survive_a_poisoned_lock() {
        let store = std::sync::Arc::new(InMemoryDocumentStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.collections.write().unwrap();
            panic!("writer panicked while holding the lock");
        })
        .join();
        assert!(store.collections.is_poisoned());

        store.insert("users", "U1", json!({"name": "Alice"}));

        assert_eq!(store.len(), 1);
        assert!(store.get("users", "U1").await.unwrap().is_found());
    }

    #[test]
    fn malformed_seed_is_rejected() {
        assert!(InMemoryDocumentStore::from_seed(json!(["users"])).is_err());
        assert!(InMemoryDocumentStore::from_seed(json!({"users": "U1"})).is_err());
    }
}
