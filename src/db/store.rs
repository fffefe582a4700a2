//! Document-store contract used by the cascade engine.
//!
//! Records are JSON documents keyed by `_id`. The store offers plain
//! per-collection CRUD with field filters and no multi-document
//! transactions; everything above it must tolerate partial progress.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter};
use thiserror::Error;

use super::client::HelixClientError;


pub type Document = Value;


pub const ID_FIELD: &str = "_id";


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Display, AsRefStr, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Teachers,
    Batches,
    Students,
    Assignments,
    Notes,
    Quizzes,
    Messages,
}


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid document in {collection}: {reason}")]
    InvalidDocument { collection: Collection, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<HelixClientError> for StoreError {
    fn from(err: HelixClientError) -> Self {
        match err {
            HelixClientError::Serialization(e) => Self::Serialization(e),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Field predicate. Dotted paths descend into embedded documents and
/// match if any element of an embedded list matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    All,
    Eq { field: String, value: Value },
    IsEmpty { field: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_empty(field: impl Into<String>) -> Self {
        Self::IsEmpty { field: field.into() }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => {
                let segments: Vec<&str> = field.split('.').collect();
                path_matches(doc, &segments, value)
            }
            Filter::IsEmpty { field } => match lookup(doc, field) {
                None | Some(Value::Null) => true,
                Some(Value::Array(items)) => items.is_empty(),
                Some(_) => false,
            },
        }
    }
}

fn path_matches(node: &Value, segments: &[&str], target: &Value) -> bool {
    if let Value::Array(items) = node {
        return items.iter().any(|item| path_matches(item, segments, target));
    }
    match segments.split_first() {
        None => node == target,
        Some((head, rest)) => node
            .get(*head)
            .is_some_and(|child| path_matches(child, rest, target)),
    }
}

fn lookup<'a>(doc: &'a Document, field: &str) -> Option<&'a Value> {
    field.split('.').try_fold(doc, |node, segment| node.get(segment))
}


pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}


#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    async fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete_one(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError>;

    /// Upsert keyed by the document's `_id`.
    async fn save(&self, collection: Collection, doc: Document) -> Result<(), StoreError>;
}


pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}


pub async fn fetch<T: Record>(store: &dyn DocumentStore, id: &str) -> Result<Option<T>, StoreError> {
    match store.find_by_id(T::COLLECTION, id).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}


pub async fn fetch_many<T: Record>(store: &dyn DocumentStore, filter: &Filter) -> Result<Vec<T>, StoreError> {
    store
        .find_many(T::COLLECTION, filter)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}


pub async fn persist<T: Record>(store: &dyn DocumentStore, record: &T) -> Result<(), StoreError> {
    let doc = serde_json::to_value(record)?;
    store.save(T::COLLECTION, doc).await
}


pub async fn remove<T: Record>(store: &dyn DocumentStore, record: &T) -> Result<bool, StoreError> {
    store.delete_one(T::COLLECTION, record.id()).await
}

/// An undecodable document fails the whole read; callers treat that as a
/// structural read failure and keep the owning unit for a later run.
fn decode<T: Record>(doc: Document) -> Result<T, StoreError> {
    let id = document_id(&doc).unwrap_or("<no _id>").to_string();
    serde_json::from_value(doc).map_err(|e| StoreError::InvalidDocument {
        collection: T::COLLECTION,
        reason: format!("{}: {}", id, e),
    })
}
