

use std::time::Duration;
use helix_rs::{HelixDB, HelixDBClient, HelixError};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::CoachConfig;


const DEFAULT_MAX_RETRIES: u32 = 3;

const INITIAL_RETRY_DELAY_MS: u64 = 100;

const MAX_RETRY_DELAY_MS: u64 = 10000;


#[derive(Debug, Error)]
pub enum HelixClientError {
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Helix error: {0}")]
    Helix(#[from] HelixError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Retry exhausted after {0} attempts: {1}")]
    RetryExhausted(u32, String),
}

impl HelixClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}


pub struct HelixClient {

    inner: HelixDB,

    base_url: String,

    max_retries: u32,
}

impl HelixClient {

    pub fn new(host: &str, port: u16) -> Self {
        let endpoint = format!("http://{}", host);
        let base_url = format!("http://{}:{}", host, port);

        let inner = <HelixDB as HelixDBClient>::new(Some(&endpoint), Some(port), None);

        info!("HelixClient created for {}", base_url);

        Self {
            inner,
            base_url,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }


    pub fn from_config(config: &CoachConfig) -> Self {
        let mut client = Self::new(&config.helix_host, config.helix_port);
        client.max_retries = config.max_retries.max(1);
        client
    }

    /// Retries transient failures with exponential backoff; "not found" is returned at once.
    pub async fn execute_query<T, P>(&self, query_name: &str, params: &P) -> Result<T, HelixClientError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        let mut last_error = None;
        let mut delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);

        for attempt in 1..=self.max_retries {
            debug!("Executing query: {} (attempt {})", query_name, attempt);

            match self.inner.query::<P, T>(query_name, params).await {
                Ok(result) => {
                    debug!("Query {} succeeded", query_name);
                    return Ok(result);
                }
                Err(e) => {
                    let err_str = e.to_string();

                    if err_str.contains("not found") || err_str.contains("No value") {
                        debug!("Query {} returned not found", query_name);
                        return Err(HelixClientError::NotFound(err_str));
                    }

                    debug!("Query {} failed (attempt {}): {}", query_name, attempt, e);
                    last_error = Some(err_str);

                    if attempt < self.max_retries {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
                    }
                }
            }
        }

        Err(HelixClientError::RetryExhausted(
            self.max_retries,
            last_error.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }


    pub async fn health_check(&self) -> Result<(), HelixClientError> {
        match self
            .inner
            .query::<_, serde_json::Value>("health", &serde_json::json!({}))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let err_str = e.to_string().to_lowercase();
                // A 404 for the query itself still proves the server answered.
                if err_str.contains("404")
                    || err_str.contains("not found")
                    || err_str.contains("couldn't find")
                {
                    Ok(())
                } else {
                    Err(HelixClientError::Query(err_str))
                }
            }
        }
    }


    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
