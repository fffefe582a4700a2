

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::store::{document_id, Collection, Document, DocumentStore, Filter, StoreError};

/// In-process document store. Serves local runs and the engine tests;
/// individual collections can be switched to fail reads or writes.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Document>>>,
    failing_reads: RwLock<HashSet<Collection>>,
    failing_writes: RwLock<HashSet<Collection>>,
    read_counts: RwLock<HashMap<Collection, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }


    pub fn insert(&self, collection: Collection, doc: Document) {
        if let Some(id) = document_id(&doc).map(str::to_string) {
            self.collections
                .write()
                .entry(collection)
                .or_default()
                .insert(id, doc);
        }
    }


    pub fn get(&self, collection: Collection, id: &str) -> Option<Document> {
        self.collections
            .read()
            .get(&collection)
            .and_then(|docs| docs.get(id).cloned())
    }


    pub fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }


    pub fn fail_reads(&self, collection: Collection, failing: bool) {
        toggle(&self.failing_reads, collection, failing);
    }


    pub fn fail_writes(&self, collection: Collection, failing: bool) {
        toggle(&self.failing_writes, collection, failing);
    }


    pub fn reads(&self, collection: Collection) -> usize {
        self.read_counts.read().get(&collection).copied().unwrap_or(0)
    }

    fn check_read(&self, collection: Collection) -> Result<(), StoreError> {
        *self.read_counts.write().entry(collection).or_default() += 1;
        if self.failing_reads.read().contains(&collection) {
            return Err(StoreError::Unavailable(format!("read from {} refused", collection)));
        }
        Ok(())
    }

    fn check_write(&self, collection: Collection) -> Result<(), StoreError> {
        if self.failing_writes.read().contains(&collection) {
            return Err(StoreError::Unavailable(format!("write to {} refused", collection)));
        }
        Ok(())
    }
}

fn toggle(set: &RwLock<HashSet<Collection>>, collection: Collection, on: bool) {
    let mut set = set.write();
    if on {
        set.insert(collection);
    } else {
        set.remove(&collection);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_read(collection)?;
        Ok(self.get(collection, id))
    }

    async fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.check_read(collection)?;
        let docs = self.collections.read();
        Ok(docs
            .get(&collection)
            .map(|docs| docs.values().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_one(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        self.check_write(collection)?;
        let removed = self
            .collections
            .write()
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        debug!("memory store: delete {}/{} -> {}", collection, id, removed);
        Ok(removed)
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        self.check_write(collection)?;
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|_, doc| !filter.matches(doc));
        Ok(before - docs.len())
    }

    async fn save(&self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        self.check_write(collection)?;
        let id = document_id(&doc)
            .ok_or_else(|| StoreError::InvalidDocument {
                collection,
                reason: "missing _id".to_string(),
            })?
            .to_string();
        self.collections
            .write()
            .entry(collection)
            .or_default()
            .insert(id, doc);
        Ok(())
    }
}
