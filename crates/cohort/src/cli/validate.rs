//! Validate command implementation

use super::output;
use crate::checks::check_study;
use anyhow::{Result, bail};
use cohort_diagnostics::{CohortError, Diagnostic, Severity};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Configuration for validate command
pub struct ValidateConfig {
    pub manifests: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub strict: bool,
}

/// Validation result for a single manifest
pub struct ValidationResult {
    pub file: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

/// Check one manifest; load and expansion failures become diagnostics
pub fn validate_file(file: &Path, config: Option<&Path>) -> ValidationResult {
    log::info!("Validating {}", file.display());
    let diagnostics = match super::load_study(file, config) {
        Ok(study) => check_study(&study),
        Err(e) => match e.chain().find_map(|c| c.downcast_ref::<CohortError>()) {
            Some(cohort) => cohort.to_diagnostics(),
            None => system_diagnostic(&e),
        },
    };
    ValidationResult {
        file: file.to_path_buf(),
        diagnostics,
    }
}

fn system_diagnostic(e: &anyhow::Error) -> Vec<Diagnostic> {
    vec![Diagnostic::error(cohort_diagnostics::COH0400, format!("{e:#}"))]
}

/// Validate study manifests
pub async fn validate(config: ValidateConfig) -> Result<()> {
    if config.manifests.is_empty() {
        bail!("No manifests specified for validation");
    }

    let results: Vec<ValidationResult> = config
        .manifests
        .iter()
        .map(|file| validate_file(file, config.config.as_deref()))
        .collect();

    for result in &results {
        print_validation_result(result);
    }

    let total_errors: usize = results.iter().map(ValidationResult::errors).sum();
    let total_warnings: usize = results.iter().map(ValidationResult::warnings).sum();

    println!();
    if total_errors == 0 && total_warnings == 0 {
        println!(
            "{}",
            output::format_success(&format!(
                "All {} manifest(s) validated successfully",
                results.len()
            ))
        );
        return Ok(());
    }

    let mut summary = Vec::new();
    if total_errors > 0 {
        summary.push(format!("{total_errors} error(s)").red().to_string());
    }
    if total_warnings > 0 {
        summary.push(format!("{total_warnings} warning(s)").yellow().to_string());
    }
    eprintln!("{} Found {}", "Validation:".bold(), summary.join(", "));

    if total_errors > 0 {
        bail!("Validation failed");
    }
    if config.strict {
        eprintln!("{}", output::format_warning("Strict mode: treating warnings as errors"));
        bail!("Validation failed in strict mode");
    }
    Ok(())
}

fn print_validation_result(result: &ValidationResult) {
    let status = if result.errors() == 0 {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{} {}", status, result.file.display().to_string().cyan());
    for diagnostic in &result.diagnostics {
        println!("{}", output::format_diagnostic(diagnostic));
    }
}
