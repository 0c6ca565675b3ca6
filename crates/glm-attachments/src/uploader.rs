//! Fallback Uploader
//!
//! Publishes a staged local file through an external helper program that
//! prints the resulting URL.

use std::path::Path;
use std::process::ExitStatus;

use async_trait::async_trait;
use glm_core::UploaderConfig;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Upload errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Exit { program: String, status: ExitStatus },
    #[error("{0}")]
    Rejected(String),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Publishes a local file and returns its URL
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, file: &Path) -> UploadResult<String>;
}

/// Runs `<program> [args..] <file>`; stdout is the URL, any stderr is a failure
pub struct CommandUploader {
    program: String,
    args: Vec<String>,
}

impl CommandUploader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn from_config(config: &UploaderConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[async_trait]
impl FileUploader for CommandUploader {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn upload(&self, file: &Path) -> UploadResult<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| UploadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() && stderr.is_empty() {
            return Err(UploadError::Exit {
                program: self.program.clone(),
                status: output.status,
            });
        }
        if !stderr.is_empty() {
            return Err(UploadError::Rejected(stderr.into_owned()));
        }

        let url = stdout.trim().to_string();
        debug!(file = ?file, "Helper finished");
        info!(url = %url, "Uploaded attachment");
        Ok(url)
    }
}
