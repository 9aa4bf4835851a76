//! Per-file processing.
//!
//! One source document's lifecycle: fetch, decode, shape, upload the
//! three datasets, archive the source, delete the original. Every error
//! past fetch is caught at this boundary and reported as a typed
//! outcome; a failed file stays in the pending namespace and is picked
//! up again by the next batch run.

use chrono::Utc;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::config::LayoutConfig;
use crate::error::{
    ArchiveSnafu, DecodeSnafu, DeleteSnafu, FetchSnafu, ProcessError, SerializeSnafu, ShapeSnafu,
    UploadSnafu,
};
use crate::sink::{output_key, to_csv};
use crate::source;
use crate::storage::StorageProvider;
use crate::transform::{AlbumRow, ArtistRow, SongRow, shape_document};

/// Why a file was skipped without being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The object disappeared between listing and fetch.
    Missing,
    /// The object exists but has no content.
    Empty,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Missing => "missing",
            SkipReason::Empty => "empty",
        }
    }
}

/// Typed result of processing one source document.
///
/// Success, skip, and failure are distinct so the driver can aggregate
/// a batch summary instead of inferring outcomes from logs.
#[derive(Debug)]
pub enum FileOutcome {
    /// All three datasets uploaded, source archived and deleted.
    Processed {
        albums: usize,
        artists: usize,
        songs: usize,
    },
    /// Nothing to do for this file; not a failure, not retry-worthy.
    Skipped { reason: SkipReason },
    /// Processing failed; the source document was left untouched in the
    /// pending namespace for the next run to retry.
    Failed { error: ProcessError },
}

/// Processes one source document at a time against a single store.
pub(crate) struct FileProcessor<'a> {
    storage: &'a StorageProvider,
    layout: &'a LayoutConfig,
}

impl<'a> FileProcessor<'a> {
    pub fn new(storage: &'a StorageProvider, layout: &'a LayoutConfig) -> Self {
        Self { storage, layout }
    }

    /// Process one pending document, converting any error into a typed
    /// outcome at this boundary.
    pub async fn process(&self, key: &str) -> FileOutcome {
        match self.try_process(key).await {
            Ok(outcome) => outcome,
            Err(error) => FileOutcome::Failed { error },
        }
    }

    async fn try_process(&self, key: &str) -> Result<FileOutcome, ProcessError> {
        // Fetch. Skips are reported once, by the batch summary.
        let bytes = match self.storage.get(key).await {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => {
                return Ok(FileOutcome::Skipped {
                    reason: SkipReason::Missing,
                });
            }
            Err(err) => return Err(err).context(FetchSnafu),
        };

        if bytes.is_empty() {
            return Ok(FileOutcome::Skipped {
                reason: SkipReason::Empty,
            });
        }

        // Decode
        let doc = source::decode(&bytes).context(DecodeSnafu)?;
        debug!("Decoded {} with {} items", key, doc.items.len());

        // Shape
        let datasets = shape_document(&doc).context(ShapeSnafu)?;

        // Upload all three datasets, sharing one processing timestamp so
        // the artifacts of this file correlate. Uploads are sequential
        // and non-transactional: a failure partway leaves earlier
        // artifacts in place.
        let processed_at = Utc::now();

        let artifacts: [(&'static str, bytes::Bytes); 3] = [
            (
                "albums",
                to_csv(&AlbumRow::COLUMNS, &datasets.albums)
                    .context(SerializeSnafu { entity: "albums" })?,
            ),
            (
                "artists",
                to_csv(&ArtistRow::COLUMNS, &datasets.artists)
                    .context(SerializeSnafu { entity: "artists" })?,
            ),
            (
                "songs",
                to_csv(&SongRow::COLUMNS, &datasets.songs)
                    .context(SerializeSnafu { entity: "songs" })?,
            ),
        ];

        for (entity, body) in artifacts {
            let dest = output_key(&self.layout.output_template, entity, processed_at);
            self.storage
                .put(dest.as_str(), body)
                .await
                .context(UploadSnafu { entity })?;
            debug!("Uploaded {} dataset for {} to {}", entity, key, dest);
        }

        // Archive then delete: a two-phase move. Between the copy and
        // the delete the object is readable under both namespaces; if
        // the delete fails the duplicate persists until a later run
        // reprocesses the pending copy.
        let archived = format!("{}/{}", self.layout.processed_prefix, base_name(key));
        self.storage
            .copy(key, archived.as_str())
            .await
            .context(ArchiveSnafu)?;
        self.storage.delete(key).await.context(DeleteSnafu)?;

        info!(
            "Processed {}: {} albums, {} artists, {} songs; archived to {}",
            key,
            datasets.albums.len(),
            datasets.artists.len(),
            datasets.songs.len(),
            archived
        );

        Ok(FileOutcome::Processed {
            albums: datasets.albums.len(),
            artists: datasets.artists.len(),
            songs: datasets.songs.len(),
        })
    }
}

/// The base filename of a key, retained when archiving.
fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
