//! Expand command implementation

use super::output;
use anyhow::{Context, Result};
use cohort_model::{JsonSerializer, StudySerializer};
use std::path::PathBuf;

/// Configuration for expand command
pub struct ExpandConfig {
    pub manifest: PathBuf,
    pub config: Option<PathBuf>,
    pub pretty: bool,
    pub output_file: Option<PathBuf>,
}

/// Expand a manifest into the full study definition
pub async fn expand(config: ExpandConfig) -> Result<()> {
    let study = super::load_study(&config.manifest, config.config.as_deref())?;

    let serializer = if config.pretty {
        JsonSerializer::pretty()
    } else {
        JsonSerializer::new()
    };
    let content = serializer
        .serialize(&study)
        .context("Failed to serialize study definition")?;

    output::write_output(&content, config.output_file.as_deref())
}
