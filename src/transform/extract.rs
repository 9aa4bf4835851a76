//! Extractors: pure functions from a decoded document to flat records.
//!
//! Each extractor walks the document's items in order and emits raw,
//! string-typed records for one entity. No deduplication or type
//! coercion happens here; that is the shaper's job.

use snafu::prelude::*;

use crate::error::{MissingAlbumArtistSnafu, ShapeError};
use crate::source::PlayHistory;

/// Raw album record, one per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRecord {
    pub album_id: String,
    pub name: String,
    pub release_date: String,
    pub total_tracks: i64,
    pub url: String,
}

/// Raw artist record, one per artist per track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub artist_name: String,
    pub external_url: String,
}

/// Raw song record, one per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRecord {
    pub song_id: String,
    pub song_name: String,
    pub duration_ms: i64,
    pub url: String,
    pub popularity: i64,
    pub song_added: String,
    pub album_id: String,
    pub artist_id: String,
}

/// Extract one album record per item, from the track's embedded album.
pub fn extract_albums(doc: &PlayHistory) -> Vec<AlbumRecord> {
    doc.items
        .iter()
        .map(|item| {
            let album = &item.track.album;
            AlbumRecord {
                album_id: album.id.clone(),
                name: album.name.clone(),
                release_date: album.release_date.clone(),
                total_tracks: album.total_tracks,
                url: album.external_urls.spotify.clone(),
            }
        })
        .collect()
}

/// Extract one artist record per artist per track.
///
/// Flattens over every track's full artist list, so a track with three
/// performers contributes three records. Output cardinality is the sum
/// of per-item artist-list lengths.
pub fn extract_artists(doc: &PlayHistory) -> Vec<ArtistRecord> {
    doc.items
        .iter()
        .flat_map(|item| item.track.artists.iter())
        .map(|artist| ArtistRecord {
            artist_id: artist.id.clone(),
            artist_name: artist.name.clone(),
            external_url: artist.href.clone(),
        })
        .collect()
}

/// Extract one song record per item.
///
/// The song's `artist_id` is sourced from the FIRST artist of the
/// embedded album's artist list, not from the track's own artist list.
/// The two are not guaranteed to agree upstream; this mirrors how the
/// datasets are joined downstream.
pub fn extract_songs(doc: &PlayHistory) -> Result<Vec<SongRecord>, ShapeError> {
    doc.items
        .iter()
        .map(|item| {
            let track = &item.track;
            let album_artist = track.album.artists.first().context(MissingAlbumArtistSnafu {
                album_id: track.album.id.clone(),
                song_id: track.id.clone(),
            })?;
            Ok(SongRecord {
                song_id: track.id.clone(),
                song_name: track.name.clone(),
                duration_ms: track.duration_ms,
                url: track.external_urls.spotify.clone(),
                popularity: track.popularity,
                song_added: item.added_at.clone(),
                album_id: track.album.id.clone(),
                artist_id: album_artist.id.clone(),
            })
        })
        .collect()
}
