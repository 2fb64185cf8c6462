//! Output formatting utilities

use anyhow::{Context, Result, bail};
use cohort_diagnostics::{CohortError, Diagnostic};
use cohort_eval::Resolution;
use cohort_model::QuerySpec;
use colored::Colorize;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::str::FromStr;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    JsonPretty,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "json-pretty" => Ok(Self::JsonPretty),
            "table" => Ok(Self::Table),
            other => bail!("Unsupported output format: {other}. Use 'json', 'pretty' or 'table'"),
        }
    }
}

/// Set up color output based on user preference
pub fn setup_colors(mode: &str) {
    match mode.to_lowercase().as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::set_override(std::io::stdout().is_terminal()),
    }
}

/// Format an error for display, with one line per diagnostic
pub fn format_error(error: &anyhow::Error) -> String {
    let mut out = format!("{} {}", "Error:".red().bold(), error);
    if let Some(cohort) = error.chain().find_map(|e| e.downcast_ref::<CohortError>()) {
        for diagnostic in cohort.to_diagnostics() {
            out.push('\n');
            out.push_str(&format_diagnostic(&diagnostic));
        }
    }
    out
}

pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    diagnostic
        .render()
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_warning(warning: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), warning)
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write to output file: {}", path.display()))?;
        eprintln!(
            "{}",
            format_success(&format!("Output written to {}", path.display()))
        );
    } else {
        println!("{content}");
    }
    Ok(())
}

pub fn format_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).context("Failed to serialize JSON")
    } else {
        serde_json::to_string(value).context("Failed to serialize JSON")
    }
}

#[derive(Tabled)]
struct VariableRow {
    #[tabled(rename = "Variable")]
    variable: String,
    #[tabled(rename = "Query")]
    query: &'static str,
    #[tabled(rename = "Anchor")]
    anchor: String,
    #[tabled(rename = "Find")]
    find: String,
}

/// One row per variable: query kind, anchor and match order
pub fn variables_table(variables: &IndexMap<String, QuerySpec>) -> String {
    let rows = variables.iter().map(|(name, spec)| VariableRow {
        variable: name.clone(),
        query: spec.kind(),
        anchor: spec.anchor().map(ToString::to_string).unwrap_or_default(),
        find: format!("{:?}", spec.match_order()).to_lowercase(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

#[derive(Tabled)]
struct ResolutionRow {
    #[tabled(rename = "Variable")]
    variable: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Date")]
    date: String,
}

pub fn resolutions_table(resolved: &IndexMap<String, Resolution>) -> String {
    let rows = resolved.iter().map(|(name, resolution)| ResolutionRow {
        variable: name.clone(),
        status: resolution.status(),
        date: resolution.date().map(|d| d.to_string()).unwrap_or_default(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}
