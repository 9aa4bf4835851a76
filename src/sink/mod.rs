//! CSV serialization and output key naming.
//!
//! Each shaped dataset becomes one UTF-8 comma-separated document with a
//! header row. The header is written explicitly from the entity's
//! canonical column list so that an empty dataset still carries its full
//! schema.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::prelude::*;

use crate::error::{CsvFinishSnafu, CsvSerializeSnafu, SinkError};

/// Timestamp format used in output keys. Shared by all three artifacts
/// of one file so a single run's outputs correlate.
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Serialize rows to a CSV document with the given header.
///
/// Row serialization order must match the column list; the row structs
/// declare their fields in canonical column order.
pub fn to_csv<T: Serialize>(columns: &[&str], rows: &[T]) -> Result<Bytes, SinkError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(columns).context(CsvSerializeSnafu)?;
    for row in rows {
        writer.serialize(row).context(CsvSerializeSnafu)?;
    }

    let buffer = writer
        .into_inner()
        .map_err(|err| CsvFinishSnafu {
            message: err.to_string(),
        }
        .build())?;

    Ok(Bytes::from(buffer))
}

/// Build the destination key for one entity's output artifact.
///
/// `{entity}` and `{timestamp}` in the template are replaced; the
/// timestamp is the per-file processing time, computed once and reused
/// for all three entities.
pub fn output_key(template: &str, entity: &str, processed_at: DateTime<Utc>) -> String {
    template
        .replace("{entity}", entity)
        .replace(
            "{timestamp}",
            &processed_at.format(KEY_TIMESTAMP_FORMAT).to_string(),
        )
}
