//! Reshaping of decoded documents into tabular datasets.
//!
//! Split into two stages in the manner of an extract/shape pipeline:
//! [`extract`] pulls flat, string-typed records out of the nested
//! document; [`shape`] deduplicates, coerces dates, and produces the
//! typed rows that the sink serializes.

pub mod extract;
pub mod shape;

pub use extract::{extract_albums, extract_artists, extract_songs};
pub use shape::{AlbumRow, ArtistRow, Datasets, SongRow, shape_document};
