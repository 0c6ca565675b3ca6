//! GitLab migrator CLI
//!
//! Rewrites attachment links in an issue or comment body read from a file or
//! stdin, publishing each attachment to the configured destination.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glm_attachments::{
    AttachmentMigrator, CommandUploader, Destination, GitlabSource, S3Storage,
};
use glm_core::{AppConfig, NamespaceId};

#[derive(Debug, Parser)]
#[command(name = "glm-migrate", version, about = "Migrate GitLab attachment links")]
struct Cli {
    /// Settings file (TOML, JSON or YAML); `GLM_*` variables override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Object key namespace, defaults to `github.repo_id`
    #[arg(short, long)]
    namespace: Option<NamespaceId>,

    /// Write the rewritten body here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print a summary of migrated and skipped attachments to stderr
    #[arg(long)]
    report: bool,

    /// Body to rewrite; stdin when omitted
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let body = read_input(cli.input.as_ref())?;

    let source = Arc::new(GitlabSource::new(&config.gitlab)?);
    let destination = build_destination(&config)?;
    info!(destination = %destination.name(), "Starting attachment migration");

    let migrator = AttachmentMigrator::new(source, destination);
    let namespace = cli.namespace.or(config.github.repo_id);
    let report = migrator.migrate_with_report(&body, namespace).await?;

    if cli.report {
        for migrated in &report.migrated {
            eprintln!("migrated {} -> {}", migrated.path, migrated.url);
        }
        for path in &report.skipped {
            eprintln!("skipped  {}", path);
        }
    }

    write_output(cli.output.as_ref(), &report.body)?;
    debug!("Migration complete");
    Ok(())
}

/// Initialize tracing/logging; stdout is reserved for the rewritten body
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,glm_attachments=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();
}

fn build_destination(config: &AppConfig) -> anyhow::Result<Destination> {
    match config.object_store() {
        Some(s3) => {
            let storage = S3Storage::new(s3.clone()).context("Failed to initialize S3 storage")?;
            Ok(Destination::ObjectStore(Arc::new(storage)))
        }
        None => Ok(Destination::Uploader(Arc::new(CommandUploader::from_config(
            &config.uploader,
        )))),
    }
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read stdin")?;
            Ok(body)
        }
    }
}

fn write_output(path: Option<&PathBuf>, body: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, body)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
