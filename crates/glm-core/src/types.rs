//! Common types used throughout the migrator

/// Numeric prefix scoping stored object keys per originating project
/// (the destination repository id).
pub type NamespaceId = u64;

/// Path prefix of attachments hosted by the source GitLab instance
pub const UPLOADS_PREFIX: &str = "/uploads";
