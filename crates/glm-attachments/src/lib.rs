//! # glm-attachments
//!
//! Attachment link migration for the GitLab migrator.
//!
//! ## Features
//!
//! - Scanning issue and comment bodies for links to uploaded files
//! - Downloading uploads from the source GitLab project
//! - Publishing to an S3 bucket or through an external upload helper
//! - Rewriting the links to their new location
//!
//! ## Example
//!
//! ```rust,ignore
//! use glm_attachments::{AttachmentMigrator, Destination, GitlabSource, S3Storage};
//! use std::sync::Arc;
//!
//! let source = Arc::new(GitlabSource::new(&config.gitlab)?);
//! let storage = Arc::new(S3Storage::new(s3_config)?);
//! let migrator = AttachmentMigrator::new(source, Destination::ObjectStore(storage));
//!
//! let body = migrator.migrate(&issue.description, Some(repo_id)).await?;
//! ```

pub mod migrator;
pub mod reference;
pub mod source;
pub mod storage;
pub mod uploader;

pub use migrator::{
    AttachmentMigrator, Destination, MigratedAttachment, MigrationError, MigrationReport,
    MigrationResult,
};
pub use reference::{AttachmentReference, RewriteMap, ATTACHMENT_PATTERN};
pub use source::{AttachmentSource, GitlabSource, MemorySource, SourceError, SourceResult};
pub use storage::{FileMetadata, MemoryStorage, S3Storage, Storage, StorageError, StorageResult};
pub use uploader::{CommandUploader, FileUploader, UploadError, UploadResult};
