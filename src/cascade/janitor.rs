//! Best-effort blob cleanup.
//!
//! Delete requests are queued per unit of work and issued together with
//! bounded concurrency. A key is attempted at most once per run; failures
//! are logged and returned as outcomes, never raised.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::models::BlobOutcome;
use crate::models::{BlobKind, EntityKind};
use crate::storage::{BlobRef, BlobStore};

struct BlobTask {
    entity: EntityKind,
    entity_id: String,
    kind: BlobKind,
    key: String,
}


pub struct BlobJanitor {
    store: Arc<dyn BlobStore>,
    concurrency: usize,
    seen: HashSet<String>,
    pending: Vec<BlobTask>,
}

impl BlobJanitor {
    pub fn new(store: Arc<dyn BlobStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
            seen: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Returns false when the reference resolves to no key or the key was already queued this run.
    pub fn queue(&mut self, entity: EntityKind, entity_id: &str, kind: BlobKind, blob: &BlobRef) -> bool {
        let Some(key) = blob.resolve_key(self.store.bucket()) else {
            debug!("{} {}: {} has no resolvable key, skipping", entity, entity_id, kind);
            return false;
        };
        if !self.seen.insert(key.clone()) {
            debug!("Blob {} already scheduled in this run", key);
            return false;
        }
        self.pending.push(BlobTask {
            entity,
            entity_id: entity_id.to_string(),
            kind,
            key,
        });
        true
    }


    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Issues every queued delete and waits for all of them.
    pub async fn flush(&mut self) -> Vec<BlobOutcome> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let tasks = std::mem::take(&mut self.pending);
        debug!("Flushing {} blob delete(s) (concurrency {})", tasks.len(), self.concurrency);

        let store = Arc::clone(&self.store);
        stream::iter(tasks)
            .map(|task| {
                let store = Arc::clone(&store);
                async move {
                    let error = match store.delete_object(&task.key).await {
                        Ok(()) => None,
                        Err(e) => {
                            warn!(
                                "Blob cleanup failed: {} {} {} key={} op=delete_object: {}",
                                task.entity, task.entity_id, task.kind, task.key, e
                            );
                            Some(e.to_string())
                        }
                    };
                    BlobOutcome {
                        entity: task.entity,
                        entity_id: task.entity_id,
                        kind: task.kind,
                        key: task.key,
                        error,
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await
    }
}
