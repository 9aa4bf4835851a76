//! Batch driver.
//!
//! Lists pending source documents and runs the per-file processor over
//! each, strictly one at a time. A file's failure is recorded in the
//! batch summary and never aborts the batch; concurrency across batch
//! invocations is the caller's responsibility (single-flight scheduling
//! is assumed).

mod processor;

use snafu::prelude::*;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{BatchError, BatchStorageSnafu};
use crate::storage::{StorageProvider, StorageProviderRef, list_documents};

use processor::FileProcessor;
pub use processor::{FileOutcome, SkipReason};

/// Aggregated outcome of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Keys that failed, with the stage the failure occurred in.
    pub failures: Vec<(String, &'static str)>,
}

impl BatchSummary {
    /// Total number of files the batch looked at.
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    /// Record one file's outcome. Logging is a side effect of
    /// reporting here, not the only observable result.
    fn record(&mut self, key: &str, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Processed { .. } => {
                self.processed += 1;
            }
            FileOutcome::Skipped { reason } => {
                self.skipped += 1;
                info!("Skipped {} ({})", key, reason.as_str());
            }
            FileOutcome::Failed { error } => {
                self.failed += 1;
                self.failures.push((key.to_string(), error.stage()));
                warn!(
                    "Giving up on {} (stage: {}): {:?}",
                    key,
                    error.stage(),
                    error
                );
            }
        }
    }
}

/// One batch invocation over a configured store.
pub struct Batch {
    config: Config,
    storage: StorageProviderRef,
}

impl Batch {
    /// Create a batch from configuration.
    pub async fn new(config: Config) -> Result<Self, BatchError> {
        let storage = StorageProvider::for_url_with_options(
            &config.store.url,
            config.store.storage_options.clone(),
        )
        .await
        .context(BatchStorageSnafu)?;

        Ok(Self {
            config,
            storage: storage.into(),
        })
    }

    /// Run the batch: list pending documents and process each in
    /// listing order.
    pub async fn run(&self) -> Result<BatchSummary, BatchError> {
        let layout = &self.config.layout;

        let keys = list_documents(
            &self.storage,
            &layout.pending_prefix,
            &layout.document_suffix,
        )
        .await
        .context(BatchStorageSnafu)?;

        if keys.is_empty() {
            info!(
                "No pending documents under {}, nothing to do",
                layout.pending_prefix
            );
            return Ok(BatchSummary::default());
        }

        info!(
            "Found {} pending documents under {}",
            keys.len(),
            layout.pending_prefix
        );

        let processor = FileProcessor::new(&self.storage, layout);
        let mut summary = BatchSummary::default();

        for key in &keys {
            let outcome = processor.process(key).await;
            summary.record(key, &outcome);
        }

        info!(
            "Batch complete: {} processed, {} skipped, {} failed",
            summary.processed, summary.skipped, summary.failed
        );

        Ok(summary)
    }
}

/// Run one batch with the given configuration.
///
/// This is the scheduler-facing entry point: everything it needs is in
/// the configuration, and per-file failures surface only through the
/// returned summary.
pub async fn run_batch(config: Config) -> Result<BatchSummary, BatchError> {
    let batch = Batch::new(config).await?;
    batch.run().await
}
