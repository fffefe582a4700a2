//! Blob-store contract and blob references held by records.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use url::Url;


#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("Blob store unavailable: {0}")]
    Unavailable(String),
    #[error("Delete of {key} rejected: {reason}")]
    Rejected { key: String, reason: String },
}

/// Deleting a key that does not exist counts as success.
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn bucket(&self) -> &str;

    async fn delete_object(&self, key: &str) -> Result<(), BlobError>;
}

/// A file stored outside the document store, as referenced by a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl BlobRef {
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            url: None,
            key: Some(key.into()),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            key: None,
        }
    }

    /// Object key to delete, if the reference resolves to one.
    pub fn resolve_key(&self, bucket: &str) -> Option<String> {
        if let Some(key) = self.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }
        self.url
            .as_deref()
            .and_then(|url| key_from_url(url, bucket))
    }
}

/// Object key addressed by a stored file URL. The URL path is
/// percent-decoded, since S3 keys are stored unescaped.
pub fn key_from_url(raw: &str, bucket: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let Ok(parsed) = Url::parse(raw) else {
        // Not an absolute URL: records written by older uploads store the bare key.
        let key = raw.trim_start_matches('/');
        return (!key.is_empty()).then(|| key.to_string());
    };

    let path = match percent_decode_str(parsed.path()).decode_utf8() {
        Ok(path) => path,
        Err(e) => {
            warn!("Skipping blob URL {} with a non-UTF-8 path: {}", raw, e);
            return None;
        }
    };
    let path = path.trim_start_matches('/');
    let bucket_prefix = format!("{}/", bucket);
    let key = if !bucket.is_empty() && path.starts_with(&bucket_prefix) {
        &path[bucket_prefix.len()..]
    } else {
        path
    };

    (!key.is_empty()).then(|| key.to_string())
}
