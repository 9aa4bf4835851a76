//! Listening-history document model and decoding.
//!
//! A source document is one JSON payload of recently-played items as the
//! streaming service delivers them: a top-level `items` array where each
//! item pairs an `added_at` timestamp with a fully-embedded track.

use serde::Deserialize;

/// A decoded listening-history document.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistory {
    pub items: Vec<PlayItem>,
}

/// One play-event entry: a timestamp plus the track that was played.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayItem {
    /// ISO-8601 timestamp of when the play was recorded. Kept as a raw
    /// string here; coercion happens during shaping.
    pub added_at: String,
    pub track: Track,
}

/// A playable unit with metadata, an embedded album, and the performing
/// artists.
#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub duration_ms: i64,
    pub popularity: i64,
    pub external_urls: ExternalUrls,
    pub album: TrackAlbum,
    /// Performing artists for this track. Not guaranteed to match the
    /// album's own artist list.
    pub artists: Vec<ArtistStub>,
}

/// The album embedded in a track.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackAlbum {
    pub id: String,
    pub name: String,
    /// Raw release date string; upstream precision varies (year, month,
    /// or day), so coercion is per-row and lossy.
    pub release_date: String,
    pub total_tracks: i64,
    pub external_urls: ExternalUrls,
    pub artists: Vec<ArtistStub>,
}

/// A minimal artist reference as it appears inline on tracks and albums.
///
/// Album artist stubs sometimes carry only an id, so the other fields
/// default to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistStub {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub href: String,
}

/// External URL block; only the service link is of interest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: String,
}

/// Decode a raw payload into a listening-history document.
///
/// Structural problems (missing fields, wrong types, syntax errors) all
/// surface here as a single decode error for the file.
pub fn decode(bytes: &[u8]) -> Result<PlayHistory, serde_json::Error> {
    serde_json::from_slice(bytes)
}
