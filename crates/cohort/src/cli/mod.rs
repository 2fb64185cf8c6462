//! CLI functionality for the cohort tool
//!
//! This module contains the command implementations behind the `cohort`
//! binary:
//! - Chain generation
//! - Manifest expansion
//! - Validation
//! - Reference resolution
//! - Output formatting

pub mod chain;
pub mod expand;
pub mod output;
pub mod resolve;
pub mod validate;

use anyhow::{Context, Result};
use cohort_model::GlobalVariables;
use std::path::Path;

use crate::manifest::StudyManifest;
use cohort_model::StudyDefinition;

/// Load a manifest and expand it, with global variables if given
pub(crate) fn load_study(manifest: &Path, config: Option<&Path>) -> Result<StudyDefinition> {
    let globals = config
        .map(|path| {
            GlobalVariables::from_path(path)
                .with_context(|| format!("Failed to load global variables: {}", path.display()))
        })
        .transpose()?;
    let manifest_def = StudyManifest::from_path(manifest)
        .with_context(|| format!("Failed to load manifest: {}", manifest.display()))?;
    let study = manifest_def
        .build(globals.as_ref())
        .with_context(|| format!("Failed to expand manifest: {}", manifest.display()))?;
    log::info!(
        "Expanded {} into {} variables",
        manifest.display(),
        study.variables.len()
    );
    Ok(study)
}
