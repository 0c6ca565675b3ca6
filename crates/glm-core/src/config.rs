//! Configuration types and loading
//!
//! Settings come from an optional file layered under `GLM_`-prefixed
//! environment variables, `__` separating nested keys (`GLM_S3__BUCKET`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::NamespaceId;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Source GitLab instance
    pub gitlab: GitlabConfig,

    /// Destination repository
    pub github: GithubConfig,

    /// Object store destination; ignored unless `bucket` is set
    pub s3: Option<S3Config>,

    /// Fallback uploader used when no object store is configured
    pub uploader: UploaderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitlabConfig {
    /// Base URL of the GitLab instance
    pub url: String,
    /// Personal access token sent as `PRIVATE-TOKEN`
    pub token: Option<String>,
    /// `namespace/project` path that uploads are served under
    pub project_path: String,
    /// Browser session cookie; GitLab only serves uploads to signed-in sessions
    pub session_cookie: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for GitlabConfig {
    fn default() -> Self {
        Self {
            url: "https://gitlab.com".to_string(),
            token: None,
            project_path: String::new(),
            session_cookie: None,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Repository id, used as the default object key namespace
    pub repo_id: Option<NamespaceId>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: String,
    /// Selects the region-qualified host form when set
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
}

impl S3Config {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Host serving the bucket's objects
    pub fn host(&self) -> String {
        match self.region.as_deref().filter(|r| !r.is_empty()) {
            Some(region) => format!("s3.{}.amazonaws.com/{}", region, self.bucket),
            None => format!("{}.s3.amazonaws.com", self.bucket),
        }
    }

    /// Externally visible URL of an object
    pub fn object_url(&self, key: &str) -> String {
        format!("https://{}/{}", self.host(), key)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// Helper program; receives the staged file path as its last argument
    pub program: String,
    pub args: Vec<String>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            program: "github-s3".to_string(),
            args: Vec::new(),
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

impl AppConfig {
    /// Load configuration from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("GLM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// The object store destination, if one is usable
    pub fn object_store(&self) -> Option<&S3Config> {
        self.s3.as_ref().filter(|s3| !s3.bucket.is_empty())
    }
}
