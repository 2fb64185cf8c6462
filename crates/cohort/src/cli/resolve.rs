//! Resolve command implementation

use super::output::{self, OutputFormat};
use anyhow::{Context, Result};
use cohort_eval::{InMemoryEventStore, Resolution, Resolver};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for resolve command
pub struct ResolveConfig {
    pub manifest: PathBuf,
    pub events: PathBuf,
    pub config: Option<PathBuf>,
    pub all: bool,
    pub output_format: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// Load one patient's events, keyed by query source
pub fn load_events(path: &Path) -> Result<InMemoryEventStore> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file: {}", path.display()))?;
    let store: InMemoryEventStore = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse events file: {}", path.display()))?;
    log::debug!(
        "Loaded events for sources: {}",
        store.source_keys().collect::<Vec<_>>().join(", ")
    );
    Ok(store)
}

/// Resolve a manifest's date variables for one patient
pub fn run(config: &ResolveConfig) -> Result<IndexMap<String, Resolution>> {
    let study = super::load_study(&config.manifest, config.config.as_deref())?;
    let store = load_events(&config.events)?;
    let resolved = Resolver::new()
        .include_non_dates(config.all)
        .resolve(&study, &store)
        .context("Failed to resolve study")?;
    Ok(resolved)
}

pub async fn resolve(config: ResolveConfig) -> Result<()> {
    let resolved = run(&config)?;
    let format: OutputFormat = config.output_format.as_deref().unwrap_or("table").parse()?;
    let content = match format {
        OutputFormat::Json => output::format_json(&resolved, false)?,
        OutputFormat::JsonPretty => output::format_json(&resolved, true)?,
        OutputFormat::Table => output::resolutions_table(&resolved),
    };
    output::write_output(&content, config.output_file.as_deref())
}
