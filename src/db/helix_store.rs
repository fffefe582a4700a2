

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::HelixClient;
use super::store::{document_id, Collection, Document, DocumentStore, Filter, StoreError};

#[derive(Serialize)]
struct IdInput<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct FilterInput<'a> {
    filter: &'a Filter,
}

#[derive(Serialize)]
struct SaveInput<'a> {
    id: &'a str,
    document: &'a Document,
}

#[derive(Deserialize)]
struct DeletedCount {
    #[serde(default)]
    deleted_count: usize,
}

/// `DocumentStore` backed by HelixDB. Each operation maps onto a deployed
/// named query: `get_<collection>`, `find_<collection>`, `delete_<collection>`,
/// `delete_many_<collection>` and `save_<collection>`.
pub struct HelixStore {
    client: Arc<HelixClient>,
}

impl HelixStore {
    pub fn new(client: Arc<HelixClient>) -> Self {
        Self { client }
    }

    fn query_name(op: &str, collection: Collection) -> String {
        format!("{}_{}", op, collection)
    }
}

#[async_trait]
impl DocumentStore for HelixStore {
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let query = Self::query_name("get", collection);
        match self.client.execute_query::<Document, _>(&query, &IdInput { id }).await {
            Ok(Document::Null) => Ok(None),
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.is_not_found() => {
                debug!("{} {} not found", collection, id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let query = Self::query_name("find", collection);
        match self
            .client
            .execute_query::<Vec<Document>, _>(&query, &FilterInput { filter })
            .await
        {
            Ok(docs) => Ok(docs),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_one(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let query = Self::query_name("delete", collection);
        match self.client.execute_query::<bool, _>(&query, &IdInput { id }).await {
            Ok(removed) => Ok(removed),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        let query = Self::query_name("delete_many", collection);
        let result: DeletedCount = self
            .client
            .execute_query(&query, &FilterInput { filter })
            .await?;
        Ok(result.deleted_count)
    }

    async fn save(&self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        let id = document_id(&doc).ok_or_else(|| StoreError::InvalidDocument {
            collection,
            reason: "missing _id".to_string(),
        })?;
        let query = Self::query_name("save", collection);
        self.client
            .execute_query::<Document, _>(&query, &SaveInput { id, document: &doc })
            .await?;
        Ok(())
    }
}
