//! Storage Abstraction
//!
//! Object store destinations for migrated attachments.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use glm_core::S3Config;
use opendal::{services, Operator};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage configuration error: {0}")]
    Configuration(String),
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ => Self::BackendError(err.to_string()),
        }
    }
}

/// Metadata of a stored object
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Size in bytes
    pub size: u64,
    /// Content type the object was stored with
    pub content_type: Option<String>,
    /// SHA256 digest of the content
    pub digest: String,
}

impl FileMetadata {
    fn for_data(data: &[u8], content_type: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self {
            size: data.len() as u64,
            content_type: content_type.map(str::to_string),
            digest: hex::encode(hasher.finalize()),
        }
    }
}

/// Storage trait - object store destination
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store data under `key`; the object is durable once this returns `Ok`
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<FileMetadata>;

    /// Public URL of the object stored under `key`
    fn object_url(&self, key: &str) -> String;

    /// Get storage name for logging
    fn name(&self) -> &str;
}

/// S3 storage backed by an OpenDAL operator.
///
/// Credentials are read from the usual AWS environment variables.
pub struct S3Storage {
    config: S3Config,
    operator: Operator,
}

impl S3Storage {
    /// Region used for signing when none is configured
    pub const DEFAULT_REGION: &'static str = "us-east-1";

    pub fn new(config: S3Config) -> StorageResult<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::Configuration("bucket is required".to_string()));
        }

        let region = config
            .region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(Self::DEFAULT_REGION);

        let mut builder = services::S3::default().bucket(&config.bucket).region(region);
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)?.finish();

        info!(bucket = %config.bucket, region = %region, "S3 storage initialized");
        Ok(Self { config, operator })
    }
}

#[async_trait]
impl Storage for S3Storage {
    #[instrument(skip(self, data), fields(storage = "s3", bucket = %self.config.bucket))]
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<FileMetadata> {
        let metadata = FileMetadata::for_data(&data, content_type);

        let mut write = self.operator.write_with(key, data);
        if let Some(content_type) = content_type {
            write = write.content_type(content_type);
        }
        write.await?;

        debug!(key = key, size = metadata.size, "Object stored");
        Ok(metadata)
    }

    fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }

    fn name(&self) -> &str {
        "s3"
    }
}

/// In-memory storage for testing
pub struct MemoryStorage {
    config: S3Config,
    objects: RwLock<HashMap<String, (Bytes, FileMetadata)>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(S3Config::new("memory"))
    }
}

impl MemoryStorage {
    /// `config` only determines the URLs handed out
    pub fn new(config: S3Config) -> Self {
        Self {
            config,
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<(Bytes, FileMetadata)> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<FileMetadata> {
        let metadata = FileMetadata::for_data(&data, content_type);
        let mut objects = self.objects.write().await;
        objects.insert(key.to_string(), (data, metadata.clone()));
        Ok(metadata)
    }

    fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
