//! Error types for rewind using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error"))]
    S3Config { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Store URL is empty.
    #[snafu(display("Store URL cannot be empty"))]
    EmptyStoreUrl,

    /// Pending prefix is empty.
    #[snafu(display("Pending prefix cannot be empty"))]
    EmptyPendingPrefix,

    /// Processed prefix is empty.
    #[snafu(display("Processed prefix cannot be empty"))]
    EmptyProcessedPrefix,

    /// Output template is missing a required placeholder.
    #[snafu(display("Output template '{template}' must contain {{entity}} and {{timestamp}}"))]
    OutputTemplate { template: String },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Shape Errors ============

/// Errors that can occur while shaping extracted records into datasets.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ShapeError {
    /// A play timestamp failed to parse. Fatal for the whole file: unlike
    /// release dates there is no per-row null fallback for `song_added`.
    #[snafu(display("Invalid added_at timestamp '{value}' for song {song_id}"))]
    SongAdded {
        song_id: String,
        value: String,
        source: chrono::ParseError,
    },

    /// The embedded album carries no artists, so the song's artist_id
    /// cannot be sourced from the album's first artist.
    #[snafu(display("Album {album_id} has no artists; cannot derive artist_id for song {song_id}"))]
    MissingAlbumArtist { album_id: String, song_id: String },
}

// ============ Sink Errors ============

/// Errors that can occur during CSV serialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Failed to serialize a row or header to CSV.
    #[snafu(display("CSV serialization failed"))]
    CsvSerialize { source: csv::Error },

    /// Failed to finish the CSV buffer.
    #[snafu(display("CSV writer failed to flush: {message}"))]
    CsvFinish { message: String },
}

// ============ Process Errors (per-file) ============

/// Errors that can occur while processing a single source document.
///
/// Every variant maps to one stage of the per-file state machine; the
/// batch driver converts these into a `FileOutcome::Failed` and keeps
/// going, leaving the source document in the pending namespace.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProcessError {
    /// Failed to fetch the source document (other than "not found",
    /// which is a skip, not a failure).
    #[snafu(display("Failed to fetch source document"))]
    Fetch { source: StorageError },

    /// Failed to decode the listening-history document.
    #[snafu(display("Failed to decode listening-history document"))]
    Decode { source: serde_json::Error },

    /// Failed to shape the extracted records into datasets.
    #[snafu(display("Failed to shape datasets"))]
    Shape { source: ShapeError },

    /// Failed to serialize one dataset to CSV.
    #[snafu(display("Failed to serialize {entity} dataset"))]
    Serialize {
        entity: &'static str,
        source: SinkError,
    },

    /// Failed to upload one dataset. Earlier uploads for the same file
    /// are not rolled back (at-least-once, non-atomic).
    #[snafu(display("Failed to upload {entity} dataset"))]
    Upload {
        entity: &'static str,
        source: StorageError,
    },

    /// Failed to copy the source document to the processed namespace.
    #[snafu(display("Failed to archive source document"))]
    Archive { source: StorageError },

    /// Failed to delete the source document after a successful copy.
    /// The object remains readable under both namespaces.
    #[snafu(display("Failed to delete source document after archive"))]
    Delete { source: StorageError },
}

impl ProcessError {
    /// Name of the state-machine stage this error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            ProcessError::Fetch { .. } => "fetch",
            ProcessError::Decode { .. } => "decode",
            ProcessError::Shape { .. } => "shape",
            ProcessError::Serialize { .. } => "serialize",
            ProcessError::Upload { .. } => "upload",
            ProcessError::Archive { .. } => "archive",
            ProcessError::Delete { .. } => "delete",
        }
    }
}

// ============ Batch Error (top-level) ============

/// Top-level batch errors. Per-file failures never surface here; only
/// conditions that prevent the batch itself from running do.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BatchError {
    /// Storage error (provider construction or listing).
    #[snafu(display("Storage error"))]
    BatchStorage { source: StorageError },

    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },
}
