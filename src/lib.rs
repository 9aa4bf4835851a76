//! rewind: batch ETL for streaming listening-history payloads.
//!
//! This library provides components for reading JSON listening-history
//! documents from an object store, reshaping each into three normalized
//! CSV datasets (albums, artists, songs), and archiving the source
//! payload so it is never reprocessed.
//!
//! # Example
//!
//! ```ignore
//! use rewind::{Config, run_batch, error::BatchError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BatchError> {
//!     let config = Config::from_file("config.yaml")?;
//!     let summary = run_batch(config).await?;
//!     println!("Processed {} documents", summary.processed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod storage;
pub mod transform;

// Re-export main types
pub use config::Config;
pub use pipeline::{run_batch, Batch, BatchSummary, FileOutcome, SkipReason};
pub use storage::{StorageProvider, StorageProviderRef};
