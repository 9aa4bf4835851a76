//! rewind: a batch ETL tool for streaming listening-history payloads.
//!
//! Reads JSON listening-history documents from an object store (S3 or
//! local filesystem), reshapes each into three normalized CSV datasets
//! (albums, artists, songs), and archives the source payload so it is
//! never reprocessed. Intended to be invoked on a recurring cadence by
//! an external scheduler; concurrent invocations over the same prefix
//! are not supported.

use clap::Parser;
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rewind::config::Config;
use rewind::error::{BatchError, ConfigSnafu};
use rewind::pipeline::run_batch;

/// Listening-history to CSV batch ETL tool.
#[derive(Parser, Debug)]
#[command(name = "rewind")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without processing.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), BatchError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("rewind starting");

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;

    if args.dry_run {
        info!(
            "Configuration OK (dry run): store={}, pending={}, processed={}",
            config.store.url, config.layout.pending_prefix, config.layout.processed_prefix
        );
        return Ok(());
    }

    let summary = run_batch(config).await?;

    info!(
        "Done: {} processed, {} skipped, {} failed",
        summary.processed, summary.skipped, summary.failed
    );

    Ok(())
}
