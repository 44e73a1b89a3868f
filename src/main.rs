//! gyazo-uploader: uploads the photos in a local library to Gyazo, once each.
//!
//! A plain-text ledger records every photo that has been uploaded. Each run
//! lists the library, skips what the ledger already holds, and uploads the
//! rest one at a time, appending to the ledger after every success.

#![warn(clippy::all)]

mod cli;
mod config;
mod ledger;
mod library;
mod resolve;
mod retry;
mod shutdown;
mod types;
mod upload;

use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::Command;
use config::Config;
use ledger::{FileLedgerStore, Ledger};
use library::{DirectoryLibrary, PhotoSource};
use upload::{BatchReport, GyazoClient, ProgressReporter, UploadPipeline, Uploader};

async fn open_ledger(config: &Config) -> anyhow::Result<Ledger> {
    let store = FileLedgerStore::open(&config.ledger_path).await?;
    let ledger = Ledger::load(Box::new(store), config.record_format).await?;
    tracing::debug!(
        path = %ledger.location().display(),
        entries = ledger.len(),
        "Ledger loaded"
    );
    Ok(ledger)
}

/// Run the status command.
async fn run_status(config: Config, args: cli::StatusArgs) -> anyhow::Result<()> {
    let ledger = open_ledger(&config).await?;

    println!("Ledger: {}", ledger.location().display());
    println!("  Uploaded: {}", ledger.len());
    if let Some(last) = ledger.entries().last() {
        println!("  Last:     {}", last.local_identifier);
    }

    if let Some(id) = args.photo.as_deref() {
        match ledger.remote_id(id) {
            Some("") => println!("{}: uploaded", id),
            Some(remote_id) => println!("{}: uploaded as {}", id, remote_id),
            None => println!("{}: not uploaded", id),
        }
    }

    if let Some(dir) = args.library.as_deref() {
        let library = DirectoryLibrary::new(config::library_dir(Some(dir))?);
        let photos = library.list_photos().await?;
        let pending = resolve::resolve(&photos, ledger.identifiers(), None);
        println!("Library: {}", library.root().display());
        println!("  Photos:   {}", photos.len());
        println!("  Pending:  {}", pending.len());
    }

    Ok(())
}

/// Run the pending command.
async fn run_pending(config: Config, args: cli::PendingArgs) -> anyhow::Result<()> {
    let ledger = open_ledger(&config).await?;
    let library = DirectoryLibrary::new(config::library_dir(Some(&args.library))?);
    let photos = library.list_photos().await?;
    for photo in resolve::resolve(&photos, ledger.identifiers(), args.cap) {
        println!("{}", photo.id);
    }
    Ok(())
}

/// Run the upload command, once or repeatedly in watch mode.
async fn run_upload(config: Config, args: cli::UploadArgs) -> anyhow::Result<()> {
    let library = DirectoryLibrary::new(config::library_dir(args.library.as_deref())?);
    let mut ledger = open_ledger(&config).await?;

    if args.dry_run {
        let photos = library.list_photos().await?;
        let batch = resolve::resolve(&photos, ledger.identifiers(), args.cap);
        tracing::info!("[DRY RUN] {} photo(s) would be uploaded", batch.len());
        for photo in batch {
            println!("{}", photo.id);
        }
        return Ok(());
    }

    let client = GyazoClient::new(
        &config.endpoint,
        config.require_access_token()?,
        config.timeout,
    )?;
    tracing::debug!(?config, "Starting gyazo-uploader");

    let pipeline = UploadPipeline::new(config.retry);
    let reporter = ProgressReporter::for_terminal(config.no_progress_bar);
    let shutdown_token = shutdown::install_signal_handler()?;

    run_passes(
        &library,
        &client,
        &pipeline,
        &mut ledger,
        &reporter,
        &shutdown_token,
        args.cap,
        args.watch_with_interval.map(Duration::from_secs),
    )
    .await
}

/// Upload once, or every `interval` until shutdown.
///
/// A one-shot run fails if the pass fails or any photo failed. In watch mode
/// both are logged and picked up again on the next pass.
#[allow(clippy::too_many_arguments)]
async fn run_passes(
    library: &dyn PhotoSource,
    uploader: &dyn Uploader,
    pipeline: &UploadPipeline,
    ledger: &mut Ledger,
    reporter: &ProgressReporter,
    shutdown_token: &CancellationToken,
    cap: Option<usize>,
    interval: Option<Duration>,
) -> anyhow::Result<()> {
    loop {
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, exiting...");
            break;
        }

        let pass = upload_pass(
            library,
            uploader,
            pipeline,
            ledger,
            reporter,
            shutdown_token,
            cap,
        )
        .await;

        let Some(interval) = interval else {
            if let Some(report) = pass? {
                if !report.is_success() {
                    anyhow::bail!("{} upload(s) failed", report.failed_count());
                }
            }
            break;
        };
        match pass {
            Ok(Some(report)) if !report.is_success() => tracing::warn!(
                "{} upload(s) failed, they will be retried next pass",
                report.failed_count()
            ),
            Ok(_) => {}
            Err(e) => tracing::error!("Upload pass failed, retrying next pass: {:#}", e),
        }

        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, exiting...");
            break;
        }
        tracing::info!("Waiting {} seconds...", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown_token.cancelled() => {
                tracing::info!("Shutdown during wait, exiting...");
                break;
            }
        }
    }

    Ok(())
}

/// List, resolve and upload one batch. `None` when there was nothing to do.
async fn upload_pass(
    library: &dyn PhotoSource,
    uploader: &dyn Uploader,
    pipeline: &UploadPipeline,
    ledger: &mut Ledger,
    reporter: &ProgressReporter,
    shutdown_token: &CancellationToken,
    cap: Option<usize>,
) -> anyhow::Result<Option<BatchReport>> {
    let photos = library.list_photos().await?;
    let batch = resolve::resolve(&photos, ledger.identifiers(), cap);
    tracing::info!(
        library = photos.len(),
        uploaded = ledger.len(),
        batch = batch.len(),
        "Resolved upload batch"
    );
    if batch.is_empty() {
        tracing::info!("Nothing to upload");
        return Ok(None);
    }

    let report = pipeline
        .run_batch(batch, library, uploader, ledger, reporter, shutdown_token)
        .await?;
    Ok(Some(report))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.global.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(&cli.global)?;

    match cli.effective_command() {
        Command::Upload(args) => run_upload(config, args).await,
        Command::Status(args) => run_status(config, args).await,
        Command::Pending(args) => run_pending(config, args).await,
    }
}
