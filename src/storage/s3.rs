use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::Client;
use tracing::{debug, error, info};

use super::blob::{BlobError, BlobStore};
use crate::core::config::CoachConfig;

pub struct S3BlobStore {
    client: Client,
    bucket_name: String,
}

impl S3BlobStore {
    /// Builds the AWS client from the default credential chain.
    /// A configured endpoint switches to path-style addressing (MinIO and friends).
    pub async fn from_config(config: &CoachConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.s3_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            "S3 blob store initialized for bucket {} ({})",
            config.s3_bucket, config.s3_region
        );

        Self {
            client: Client::from_conf(builder.build()),
            bucket_name: config.s3_bucket.clone(),
        }
    }


    pub fn with_client(client: Client, bucket_name: impl Into<String>) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        debug!("Deleting from S3 bucket {} with key: {}", self.bucket_name, key);

        match self
            .client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
        {
            Ok(_) => {
                debug!("Deleted from S3 bucket {} with key: {}", self.bucket_name, key);
                Ok(())
            }
            Err(e) => {
                if let Some(service_error) = e.as_service_error() {
                    if service_error.code() == Some("NoSuchKey") {
                        debug!("S3 key {} already absent", key);
                        return Ok(());
                    }
                    error!(
                        "S3 DELETE rejected - Bucket: {}, Key: {}, Error: {:?}",
                        self.bucket_name, key, service_error
                    );
                    return Err(BlobError::Rejected {
                        key: key.to_string(),
                        reason: service_error
                            .message()
                            .unwrap_or("service error")
                            .to_string(),
                    });
                }
                error!(
                    "S3 DELETE failed - Bucket: {}, Key: {}, Error: {}",
                    self.bucket_name, key, e
                );
                Err(BlobError::Unavailable(e.to_string()))
            }
        }
    }
}
