//! Attachment Migrator
//!
//! Rewrites links to files uploaded on the source instance so that they point
//! at copies published to the destination.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use glm_core::NamespaceId;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::reference::{AttachmentReference, RewriteMap};
use crate::source::AttachmentSource;
use crate::storage::Storage;
use crate::uploader::{FileUploader, UploadError};

/// Migration errors. Any of these aborts the whole body.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Attachment {path} not downloaded")]
    SourceUnavailable { path: String },
    #[error("Attachment upload failed: {0}")]
    UploadRejected(String),
    #[error("Attachment upload failed: {0}")]
    Upload(UploadError),
    #[error("Failed to stage attachment: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for MigrationError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Rejected(stderr) => Self::UploadRejected(stderr),
            other => Self::Upload(other),
        }
    }
}

pub type MigrationResult<T> = Result<T, MigrationError>;

/// Where migrated attachments are published
#[derive(Clone)]
pub enum Destination {
    /// Object store; unavailable attachments are skipped
    ObjectStore(Arc<dyn Storage>),
    /// External upload helper; unavailable attachments abort the migration
    Uploader(Arc<dyn FileUploader>),
}

impl Destination {
    pub fn name(&self) -> &str {
        match self {
            Self::ObjectStore(storage) => storage.name(),
            Self::Uploader(_) => "uploader",
        }
    }
}

/// A reference that now points at its published copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedAttachment {
    pub path: String,
    pub url: String,
}

/// Rewritten body plus what happened to each reference
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub body: String,
    pub migrated: Vec<MigratedAttachment>,
    /// Source paths left unresolved in `body`
    pub skipped: Vec<String>,
}

impl MigrationReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Attachment migrator
pub struct AttachmentMigrator<Src: AttachmentSource> {
    source: Arc<Src>,
    destination: Destination,
}

impl<Src: AttachmentSource> AttachmentMigrator<Src> {
    pub fn new(source: Arc<Src>, destination: Destination) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Migrate every attachment referenced in `body` and return the rewritten text
    pub async fn migrate(
        &self,
        body: &str,
        namespace: Option<NamespaceId>,
    ) -> MigrationResult<String> {
        Ok(self.migrate_with_report(body, namespace).await?.body)
    }

    /// Like [`migrate`](Self::migrate), also reporting which references were skipped
    #[instrument(skip(self, body), fields(destination = %self.destination.name()))]
    pub async fn migrate_with_report(
        &self,
        body: &str,
        namespace: Option<NamespaceId>,
    ) -> MigrationResult<MigrationReport> {
        let references = AttachmentReference::scan(body);
        let mut report = MigrationReport::default();

        if references.is_empty() {
            report.body = body.to_string();
            return Ok(report);
        }

        let mut rewrites = RewriteMap::new();

        for reference in &references {
            match self.resolve(reference, namespace).await? {
                Some(url) => {
                    rewrites.insert(reference.offset, reference.render(&url));
                    report.migrated.push(MigratedAttachment {
                        path: reference.path.clone(),
                        url,
                    });
                }
                None => report.skipped.push(reference.path.clone()),
            }
        }

        report.body = rewrites.apply(body);

        info!(
            found = references.len(),
            migrated = report.migrated.len(),
            skipped = report.skipped.len(),
            "Attachments migrated"
        );

        Ok(report)
    }

    /// Publish one reference, returning its new URL, or `None` to leave it as is
    async fn resolve(
        &self,
        reference: &AttachmentReference,
        namespace: Option<NamespaceId>,
    ) -> MigrationResult<Option<String>> {
        let data = self.source.fetch(&reference.path).await;

        match &self.destination {
            Destination::ObjectStore(storage) => {
                let Some(data) = data else {
                    warn!(path = %reference.path, "Attachment unavailable, leaving link unchanged");
                    return Ok(None);
                };
                Ok(self.publish(storage.as_ref(), reference, data, namespace).await)
            }
            Destination::Uploader(uploader) => {
                let data = data.ok_or_else(|| MigrationError::SourceUnavailable {
                    path: reference.path.clone(),
                })?;
                let url = self.upload(uploader.as_ref(), reference, data).await?;
                Ok(Some(url))
            }
        }
    }

    async fn publish(
        &self,
        storage: &dyn Storage,
        reference: &AttachmentReference,
        data: Bytes,
        namespace: Option<NamespaceId>,
    ) -> Option<String> {
        let key = reference.storage_key(namespace);
        let url = storage.object_url(&key);
        let content_type = reference.content_type();

        info!(file = %reference.basename(), url = %url, "Uploading attachment");

        match storage.put(&key, data, content_type.as_deref()).await {
            Ok(metadata) => {
                debug!(key = %key, size = metadata.size, "Upload done");
                Some(url)
            }
            Err(e) => {
                error!(key = %key, error = %e, "Upload failed, leaving link unchanged");
                None
            }
        }
    }

    async fn upload(
        &self,
        uploader: &dyn FileUploader,
        reference: &AttachmentReference,
        data: Bytes,
    ) -> MigrationResult<String> {
        // Keeps the original file name visible to the helper
        let staging = tempfile::Builder::new().prefix("glm-attachment").tempdir()?;
        let file: PathBuf = staging.path().join(reference.basename());
        tokio::fs::write(&file, &data).await?;
        debug!(file = ?file, size = data.len(), "Attachment staged");

        let url = uploader.upload(&file).await?;

        staging.close()?;
        Ok(url)
    }
}
