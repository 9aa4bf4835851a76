//! Configuration parsing and validation.
//!
//! Handles loading configuration from YAML files with environment
//! variable interpolation. Every namespace the pipeline touches (pending,
//! processed, output) is explicit configuration; nothing is hardcoded.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{
    ConfigError, EmptyPendingPrefixSnafu, EmptyProcessedPrefixSnafu, EmptyStoreUrlSnafu,
    EnvInterpolationSnafu, OutputTemplateSnafu, ReadFileSnafu, YamlParseSnafu,
};

/// Main configuration structure for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    /// Namespace layout within the store (optional, sensible defaults).
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Object store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store URL. Examples: "s3://bucket", "/local/path".
    pub url: String,

    /// Storage options (credentials, region, endpoint, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Namespace layout for source documents and output artifacts.
///
/// All prefixes are relative to the store URL. A source document lives
/// under `pending_prefix` until it is successfully processed, then under
/// `processed_prefix` (same base filename).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Prefix holding documents awaiting processing.
    #[serde(default = "default_pending_prefix")]
    pub pending_prefix: String,

    /// Archival prefix for documents after successful processing.
    #[serde(default = "default_processed_prefix")]
    pub processed_prefix: String,

    /// Suffix a key must carry to be treated as a source document.
    /// Keys with any other suffix are silently skipped.
    #[serde(default = "default_document_suffix")]
    pub document_suffix: String,

    /// Template for output keys. `{entity}` is replaced with the dataset
    /// name (albums, artists, songs) and `{timestamp}` with the per-file
    /// processing timestamp.
    #[serde(default = "default_output_template")]
    pub output_template: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pending_prefix: default_pending_prefix(),
            processed_prefix: default_processed_prefix(),
            document_suffix: default_document_suffix(),
            output_template: default_output_template(),
        }
    }
}

fn default_pending_prefix() -> String {
    "raw_data/to_processed".to_string()
}

fn default_processed_prefix() -> String {
    "raw_data/processed".to_string()
}

fn default_document_suffix() -> String {
    ".json".to_string()
}

fn default_output_template() -> String {
    "transformed_data/{entity}_data/{entity}_transformed_{timestamp}".to_string()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_options(path, true)
    }

    /// Load configuration from a YAML file with optional environment
    /// variable interpolation.
    pub fn from_file_with_options(
        path: impl AsRef<Path>,
        interpolate_env: bool,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;

        let content = if interpolate_env {
            vars::interpolate(&content).map_err(|errors| {
                EnvInterpolationSnafu {
                    message: errors.join("\n"),
                }
                .build()
            })?
        } else {
            content
        };

        let config: Config = serde_yaml::from_str(&content).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.store.url.is_empty(), EmptyStoreUrlSnafu);
        ensure!(
            !self.layout.pending_prefix.is_empty(),
            EmptyPendingPrefixSnafu
        );
        ensure!(
            !self.layout.processed_prefix.is_empty(),
            EmptyProcessedPrefixSnafu
        );
        ensure!(
            self.layout.output_template.contains("{entity}")
                && self.layout.output_template.contains("{timestamp}"),
            OutputTemplateSnafu {
                template: self.layout.output_template.clone(),
            }
        );
        Ok(())
    }
}
