

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::blob::{BlobError, BlobStore};

/// Blob store that only records delete requests. Used for dry local runs
/// and tests; specific keys, or every key, can be made to fail.
pub struct MemoryBlobStore {
    bucket_name: String,
    objects: Mutex<HashSet<String>>,
    attempts: Mutex<Vec<String>>,
    failing_keys: Mutex<HashSet<String>>,
    fail_all: Mutex<bool>,
}

impl MemoryBlobStore {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            objects: Mutex::new(HashSet::new()),
            attempts: Mutex::new(Vec::new()),
            failing_keys: Mutex::new(HashSet::new()),
            fail_all: Mutex::new(false),
        }
    }


    pub fn put(&self, key: impl Into<String>) {
        self.objects.lock().insert(key.into());
    }


    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains(key)
    }

    /// Every delete request seen so far, in arrival order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }


    pub fn attempt_count(&self, key: &str) -> usize {
        self.attempts.lock().iter().filter(|k| k.as_str() == key).count()
    }


    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing_keys.lock().insert(key.into());
    }


    pub fn fail_all(&self, failing: bool) {
        *self.fail_all.lock() = failing;
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        self.attempts.lock().push(key.to_string());

        if *self.fail_all.lock() {
            return Err(BlobError::Unavailable("blob store offline".to_string()));
        }
        if self.failing_keys.lock().contains(key) {
            return Err(BlobError::Rejected {
                key: key.to_string(),
                reason: "access denied".to_string(),
            });
        }

        self.objects.lock().remove(key);
        Ok(())
    }
}
