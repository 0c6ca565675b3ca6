//! # glm-core
//!
//! Shared building blocks for the GitLab migrator crates:
//! - Configuration types and loading
//! - Common type aliases

pub mod config;
pub mod types;

pub use config::{AppConfig, ConfigError, GithubConfig, GitlabConfig, S3Config, UploaderConfig};
pub use types::*;
