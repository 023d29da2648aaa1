use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{HttpBackend, PendingFile, PicsortClient};
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod shell;

#[derive(Parser, Debug)]
#[command(name = "picsort", about = "Browse remote image folders and sort them into categories")]
struct Args {
    /// Base URL of the review API.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Settings file, `picsort.toml` in the working directory by default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the folders under PATH, or the top level when omitted.
    Ls { path: Option<String> },
    /// Upload local image files into a remote folder.
    Upload {
        #[arg(long)]
        dest: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Create NAME inside PARENT (use "" for the top level).
    Mkdir { parent: String, name: String },
    /// Interactive browse-and-review session.
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(api_url) = &args.api_url {
        settings.api_base_url = api_url.clone();
    }
    settings.api_base_url = config::normalize_api_base_url(&settings.api_base_url)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    info!(api_url = %settings.api_base_url, "picsort starting");

    let backend = HttpBackend::with_timeout(&settings.api_base_url, settings.request_timeout())?;
    let client = PicsortClient::new(Arc::new(backend));

    match args.command {
        Command::Ls { path } => list(&client, path.as_deref()).await,
        Command::Upload { dest, files } => upload(&client, &dest, files).await,
        Command::Mkdir { parent, name } => make_folder(&client, &parent, &name).await,
        Command::Shell => shell::run(client).await,
    }
}

async fn list(client: &PicsortClient, path: Option<&str>) -> Result<()> {
    match path {
        Some(path) => client.navigation.descend(path).await?,
        None => client.navigation.open_root().await?,
    };
    println!(
        "{}",
        shell::render_listing(&client.navigation.snapshot().await)
    );
    Ok(())
}

async fn upload(client: &PicsortClient, destination: &str, paths: Vec<PathBuf>) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let contents = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("'{}' is not a file", path.display()))?;
        files.push(PendingFile::new(filename, contents));
    }
    client.upload.select_files(files).await;

    let mut progress = client.upload.progress();
    let reporter = tokio::spawn(async move {
        let mut stderr = tokio::io::stderr();
        while progress.changed().await.is_ok() {
            let percent = *progress.borrow_and_update();
            if percent > 0 {
                let _ = stderr
                    .write_all(format!("\ruploading... {percent}%").as_bytes())
                    .await;
            }
        }
    });

    let result = client.upload.submit(destination).await;
    reporter.abort();
    eprintln!();
    let receipt = result?;
    println!(
        "uploaded {} of {} files to {}",
        receipt.accepted, receipt.submitted, receipt.destination
    );
    Ok(())
}

async fn make_folder(client: &PicsortClient, parent: &str, name: &str) -> Result<()> {
    client.navigation.descend(parent).await?;
    client.navigation.create_folder(name).await?;
    println!(
        "{}",
        shell::render_listing(&client.navigation.snapshot().await)
    );
    Ok(())
}
