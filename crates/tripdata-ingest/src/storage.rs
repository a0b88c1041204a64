//! S3-compatible object store publisher
//!
//! Wraps the AWS S3 client for bucket-and-key publishing against AWS or
//! MinIO endpoints. Uploads are idempotent (skip when the object exists
//! unless overwrite is requested), retried under a [`RetryPolicy`], and
//! verified with an existence probe after each attempt.

use anyhow::{anyhow, Context, Result};
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::checksum::sha256_file;
use crate::retry::RetryPolicy;

/// Object store configuration.
///
/// Credential resolution order: explicit `access_key`/`secret_key` in
/// the config, then the `S3_ACCESS_KEY`/`AWS_ACCESS_KEY_ID` environment
/// pairs (via [`ObjectStoreConfig::from_env`]), then the ambient AWS
/// provider chain (named `profile` when set, otherwise default profile,
/// instance metadata, SSO).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub profile: Option<String>,
    pub path_style: bool,
}

impl ObjectStoreConfig {
    /// Build a config for `bucket` from the environment
    ///
    /// - `S3_ENDPOINT`: custom endpoint (MinIO); unset for AWS
    /// - `S3_REGION`: region, default `us-east-1`
    /// - `S3_ACCESS_KEY` / `AWS_ACCESS_KEY_ID`: access key
    /// - `S3_SECRET_KEY` / `AWS_SECRET_ACCESS_KEY`: secret key
    /// - `S3_PATH_STYLE`: force path-style addressing (true/false)
    pub fn from_env(bucket: impl Into<String>) -> Self {
        Self {
            endpoint: std::env::var("S3_ENDPOINT").ok(),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            bucket: bucket.into(),
            access_key: std::env::var("S3_ACCESS_KEY")
                .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
                .ok(),
            secret_key: std::env::var("S3_SECRET_KEY")
                .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
                .ok(),
            profile: None,
            path_style: std::env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: "us-east-1".to_string(),
            bucket: bucket.into(),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            profile: None,
            path_style: true,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: i64,
}

/// Outcome of publishing one local file
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    Uploaded(UploadResult),
    SkippedExists,
}

#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
    region: String,
}

impl ObjectStore {
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        debug!(
            endpoint = ?config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing object store client"
        );

        let client = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials =
                    Credentials::new(access_key, secret_key, None, None, "tripdata-storage");

                let mut builder = aws_sdk_s3::Config::builder()
                    .credentials_provider(credentials)
                    .region(Region::new(config.region.clone()))
                    .force_path_style(config.path_style);

                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint);
                }

                Client::from_conf(builder.build())
            },
            _ => {
                // Ambient credentials: profile, instance metadata, SSO.
                let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
                if let Some(profile) = &config.profile {
                    loader = loader.profile_name(profile);
                }
                let shared = loader.load().await;

                let mut builder = aws_sdk_s3::config::Builder::from(&shared)
                    .region(Region::new(config.region.clone()))
                    .force_path_style(config.path_style);

                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint);
                }

                Client::from_conf(builder.build())
            },
        };

        info!(bucket = %config.bucket, "Object store client initialized");

        Ok(Self {
            client,
            bucket: config.bucket,
            region: config.region,
        })
    }

    /// Return the existing bucket or create it; fail fast when the name
    /// is taken by an inaccessible bucket.
    pub async fn ensure_bucket(&self) -> Result<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, "Bucket found");
                Ok(())
            },
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                warn!(bucket = %self.bucket, "Bucket not found, creating");

                let mut request = self.client.create_bucket().bucket(&self.bucket);

                if self.region != "us-east-1" {
                    request = request.create_bucket_configuration(
                        CreateBucketConfiguration::builder()
                            .location_constraint(BucketLocationConstraint::from(
                                self.region.as_str(),
                            ))
                            .build(),
                    );
                }

                request
                    .send()
                    .await
                    .with_context(|| format!("Failed to create bucket {}", self.bucket))?;

                info!(bucket = %self.bucket, "Created bucket");
                Ok(())
            },
            Err(e) => Err(anyhow!(
                "Bucket '{}' exists but is inaccessible (likely owned by another account): {}",
                self.bucket,
                e
            )),
        }
    }

    /// Check whether `key` exists in the bucket
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(anyhow!("Failed to check object existence: {}", e))
                }
            },
        }
    }

    /// Upload a local file to `key`
    pub async fn upload_file(&self, key: &str, path: &Path) -> Result<UploadResult> {
        let size = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len() as i64;
        let checksum = sha256_file(path)?;

        debug!(
            key = %key,
            bucket = %self.bucket,
            size,
            "Uploading file to object store"
        );

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to upload s3://{}/{}", self.bucket, key))?;

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }

    /// Delete `key` from the bucket
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete s3://{}/{}", self.bucket, key))?;

        Ok(())
    }

    /// Publish a local file under the retry policy.
    ///
    /// Skips when the object exists and `overwrite` is false. Each upload
    /// attempt is verified with an existence probe; a missing object after
    /// upload counts as a retryable failure. The final attempt's error is
    /// returned once the policy is exhausted.
    pub async fn publish_file(
        &self,
        path: &Path,
        key: &str,
        overwrite: bool,
        policy: &RetryPolicy,
    ) -> Result<PublishOutcome> {
        if !overwrite && self.exists(key).await? {
            info!(key = %key, "Already in object store, skipping upload");
            return Ok(PublishOutcome::SkippedExists);
        }

        let result = policy
            .run(|attempt| {
                let key = key.to_string();
                let path = path.to_path_buf();

                async move {
                    info!(
                        key = %key,
                        bucket = %self.bucket,
                        attempt,
                        "Uploading"
                    );

                    let result = self.upload_file(&key, &path).await?;

                    if self.exists(&key).await? {
                        Ok(result)
                    } else {
                        warn!(key = %key, attempt, "Verification failed after upload");
                        Err(anyhow!(
                            "Object s3://{}/{} not visible after upload",
                            self.bucket,
                            key
                        ))
                    }
                }
            })
            .await?;

        info!(
            key = %result.key,
            size = result.size,
            checksum = %result.checksum,
            "Uploaded"
        );

        Ok(PublishOutcome::Uploaded(result))
    }
}

/// Join an optional key prefix with a file name
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_without_prefix() {
        assert_eq!(
            object_key("", "yellow_tripdata_2024-01.parquet"),
            "yellow_tripdata_2024-01.parquet"
        );
    }

    #[test]
    fn test_object_key_with_prefix() {
        assert_eq!(
            object_key("raw/yellow", "yellow_tripdata_2024-01.parquet"),
            "raw/yellow/yellow_tripdata_2024-01.parquet"
        );
        assert_eq!(object_key("raw/", "f.parquet"), "raw/f.parquet");
    }

    #[test]
    fn test_for_minio_config() {
        let config = ObjectStoreConfig::for_minio("http://localhost:9000", "test-bucket");
        assert_eq!(config.endpoint, Some("http://localhost:9000".to_string()));
        assert_eq!(config.bucket, "test-bucket");
        assert!(config.path_style);
        assert_eq!(config.access_key.as_deref(), Some("minioadmin"));
    }
}
