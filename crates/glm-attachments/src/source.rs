//! Source Content Providers
//!
//! Where attachment bytes are downloaded from.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use glm_core::GitlabConfig;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Source provider errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Provides the raw bytes of uploaded attachments
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// Fetch the attachment at a source-relative path (`/uploads/...`).
    ///
    /// Returns `None` when the content is not available.
    async fn fetch(&self, path: &str) -> Option<Bytes>;
}

/// Downloads uploads from a GitLab project
pub struct GitlabSource {
    client: reqwest::Client,
    project_url: String,
}

impl GitlabSource {
    pub fn new(config: &GitlabConfig) -> SourceResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = config.token {
            let value = HeaderValue::from_str(token)
                .map_err(|_| SourceError::InvalidHeader("PRIVATE-TOKEN"))?;
            headers.insert("private-token", value);
        }
        if let Some(ref session) = config.session_cookie {
            let value = HeaderValue::from_str(&format!("_gitlab_session={}", session))
                .map_err(|_| SourceError::InvalidHeader("Cookie"))?;
            headers.insert(COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            project_url: Self::project_url(config),
        })
    }

    fn project_url(config: &GitlabConfig) -> String {
        let base = config.url.trim_end_matches('/');
        let project = config.project_path.trim_matches('/');
        if project.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, project)
        }
    }

    /// Absolute URL of a source-relative path
    pub fn attachment_url(&self, path: &str) -> String {
        format!("{}{}", self.project_url, path)
    }
}

#[async_trait]
impl AttachmentSource for GitlabSource {
    #[instrument(skip(self), fields(source = "gitlab"))]
    async fn fetch(&self, path: &str) -> Option<Bytes> {
        let url = self.attachment_url(path);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Could not download attachment");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Could not download attachment");
            return None;
        }

        match response.bytes().await {
            Ok(data) if data.is_empty() => {
                warn!(url = %url, "Attachment download was empty");
                None
            }
            Ok(data) => {
                debug!(url = %url, size = data.len(), "Attachment downloaded");
                Some(data)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Could not read attachment body");
                None
            }
        }
    }
}

/// In-memory source for testing
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Bytes>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.files.insert(path.into(), data.into());
        self
    }
}

#[async_trait]
impl AttachmentSource for MemorySource {
    async fn fetch(&self, path: &str) -> Option<Bytes> {
        self.files.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_url() {
        let config = GitlabConfig {
            url: "https://gitlab.example.com/".to_string(),
            project_path: "/group/project/".to_string(),
            ..GitlabConfig::default()
        };
        let source = GitlabSource::new(&config).unwrap();
        assert_eq!(
            source.attachment_url("/uploads/abc/pic.png"),
            "https://gitlab.example.com/group/project/uploads/abc/pic.png"
        );
    }

    #[test]
    fn test_invalid_token_rejected() {
        let config = GitlabConfig {
            token: Some("bad\ntoken".to_string()),
            ..GitlabConfig::default()
        };
        let result = GitlabSource::new(&config);
        assert!(matches!(result, Err(SourceError::InvalidHeader("PRIVATE-TOKEN"))));
    }

    fn source_for(server: &mockito::ServerGuard, config: GitlabConfig) -> GitlabSource {
        let config = GitlabConfig {
            url: server.url(),
            project_path: "group/project".to_string(),
            ..config
        };
        GitlabSource::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_downloads_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/group/project/uploads/abc/pic.png")
            .with_status(200)
            .with_body("png-bytes")
            .create_async()
            .await;

        let source = source_for(&server, GitlabConfig::default());
        let data = source.fetch("/uploads/abc/pic.png").await;

        assert_eq!(data, Some(Bytes::from("png-bytes")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_sends_token_and_session_cookie() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/group/project/uploads/abc/doc.pdf")
            .match_header("private-token", "secret-token")
            .match_header("cookie", "_gitlab_session=sess123")
            .with_status(200)
            .with_body("pdf")
            .create_async()
            .await;

        let source = source_for(
            &server,
            GitlabConfig {
                token: Some("secret-token".to_string()),
                session_cookie: Some("sess123".to_string()),
                ..GitlabConfig::default()
            },
        );

        assert_eq!(
            source.fetch("/uploads/abc/doc.pdf").await,
            Some(Bytes::from("pdf"))
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/group/project/uploads/gone/a.png")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let source = source_for(&server, GitlabConfig::default());

        assert!(source.fetch("/uploads/gone/a.png").await.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_empty_body_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/group/project/uploads/abc/empty.txt")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let source = source_for(&server, GitlabConfig::default());

        assert!(source.fetch("/uploads/abc/empty.txt").await.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemorySource::new().with_file("/uploads/a/b.txt", "data");
        assert_eq!(
            source.fetch("/uploads/a/b.txt").await,
            Some(Bytes::from("data"))
        );
        assert!(source.fetch("/uploads/missing").await.is_none());
    }
}
