//! Shaper: builds typed, validated datasets from extracted records.
//!
//! Applies the deduplication policy (albums and artists by natural key,
//! first-seen row wins; songs never deduplicated) and the two date
//! coercions. The two coercion paths deliberately differ in failure
//! granularity: a bad `release_date` nulls that row's date, a bad
//! `song_added` fails the whole file.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashSet;
use tracing::debug;

use crate::error::{ShapeError, SongAddedSnafu};
use crate::source::PlayHistory;

use super::extract::{
    AlbumRecord, ArtistRecord, SongRecord, extract_albums, extract_artists, extract_songs,
};

/// Release dates arrive with varying precision upstream; only full
/// year-month-day values coerce, anything else becomes a null.
const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// A shaped album row, unique per `album_id` within one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumRow {
    pub album_id: String,
    pub name: String,
    pub release_date: Option<NaiveDate>,
    pub total_tracks: i64,
    pub url: String,
}

impl AlbumRow {
    /// Canonical column order for the albums dataset.
    pub const COLUMNS: [&'static str; 5] =
        ["album_id", "name", "release_date", "total_tracks", "url"];
}

/// A shaped artist row, unique per `artist_id` within one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRow {
    pub artist_id: String,
    pub artist_name: String,
    pub external_url: String,
}

impl ArtistRow {
    /// Canonical column order for the artists dataset.
    pub const COLUMNS: [&'static str; 3] = ["artist_id", "artist_name", "external_url"];
}

/// A shaped song row; one per item in the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRow {
    pub song_id: String,
    pub song_name: String,
    pub duration_ms: i64,
    pub url: String,
    pub popularity: i64,
    pub song_added: DateTime<Utc>,
    pub album_id: String,
    pub artist_id: String,
}

impl SongRow {
    /// Canonical column order for the songs dataset.
    pub const COLUMNS: [&'static str; 8] = [
        "song_id",
        "song_name",
        "duration_ms",
        "url",
        "popularity",
        "song_added",
        "album_id",
        "artist_id",
    ];
}

/// The three shaped datasets produced from one source document.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub albums: Vec<AlbumRow>,
    pub artists: Vec<ArtistRow>,
    pub songs: Vec<SongRow>,
}

/// Extract and shape all three datasets from a decoded document.
pub fn shape_document(doc: &PlayHistory) -> Result<Datasets, ShapeError> {
    let albums = shape_albums(extract_albums(doc));
    let artists = shape_artists(extract_artists(doc));
    let songs = shape_songs(extract_songs(doc)?)?;
    Ok(Datasets {
        albums,
        artists,
        songs,
    })
}

/// Deduplicate album records by `album_id` and coerce release dates.
///
/// First-seen row wins; field values are assumed identical across
/// duplicates of the same album within one file.
pub fn shape_albums(records: Vec<AlbumRecord>) -> Vec<AlbumRow> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.album_id.clone()))
        .map(|record| {
            let release_date = parse_release_date(&record.album_id, &record.release_date);
            AlbumRow {
                album_id: record.album_id,
                name: record.name,
                release_date,
                total_tracks: record.total_tracks,
                url: record.url,
            }
        })
        .collect()
}

/// Deduplicate artist records by `artist_id`, first-seen row wins.
pub fn shape_artists(records: Vec<ArtistRecord>) -> Vec<ArtistRow> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.artist_id.clone()))
        .map(|record| ArtistRow {
            artist_id: record.artist_id,
            artist_name: record.artist_name,
            external_url: record.external_url,
        })
        .collect()
}

/// Coerce song records to typed rows. Never deduplicates.
///
/// A `song_added` value that fails to parse is fatal for the file; the
/// caller's boundary turns it into a per-file failure with the source
/// document left in place.
pub fn shape_songs(records: Vec<SongRecord>) -> Result<Vec<SongRow>, ShapeError> {
    records
        .into_iter()
        .map(|record| {
            let song_added = DateTime::parse_from_rfc3339(&record.song_added)
                .context(SongAddedSnafu {
                    song_id: record.song_id.clone(),
                    value: record.song_added.clone(),
                })?
                .with_timezone(&Utc);
            Ok(SongRow {
                song_id: record.song_id,
                song_name: record.song_name,
                duration_ms: record.duration_ms,
                url: record.url,
                popularity: record.popularity,
                song_added,
                album_id: record.album_id,
                artist_id: record.artist_id,
            })
        })
        .collect()
}

/// Parse a release date, degrading to `None` for that row on failure.
fn parse_release_date(album_id: &str, raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw, RELEASE_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(err) => {
            debug!(
                "Unparseable release_date '{}' for album {}: {}",
                raw, album_id, err
            );
            None
        }
    }
}
