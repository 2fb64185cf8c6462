//! Codelists
//!
//! A codelist is a reference to a set of clinical codes in one coding
//! system. Loading the CSV behind a reference is the extraction engine's
//! job; here a codelist is only carried and combined.

use cohort_diagnostics::{COH0104, COH0105, CohortError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Clinical coding system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodingSystem {
    Ctv3,
    Icd10,
    Snomed,
    Opcs4,
    Dmd,
}

impl fmt::Display for CodingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CodingSystem::Ctv3 => "ctv3",
            CodingSystem::Icd10 => "icd10",
            CodingSystem::Snomed => "snomed",
            CodingSystem::Opcs4 => "opcs4",
            CodingSystem::Dmd => "dmd",
        };
        f.write_str(name)
    }
}

/// Where a codelist's codes come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodelistSource {
    /// `codelist_from_csv(path, column=...)`
    Csv { path: String, column: String },
    /// `codelist([...])`
    Inline { codes: Vec<String> },
    /// `combine_codelists(...)`
    Combined { parts: Vec<Codelist> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codelist {
    pub source: CodelistSource,
    pub system: CodingSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_column: Option<String>,
}

impl Codelist {
    pub fn from_csv(path: impl Into<String>, system: CodingSystem, column: impl Into<String>) -> Self {
        Self {
            source: CodelistSource::Csv {
                path: path.into(),
                column: column.into(),
            },
            system,
            category_column: None,
        }
    }

    pub fn inline<I, S>(codes: I, system: CodingSystem) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: CodelistSource::Inline {
                codes: codes.into_iter().map(Into::into).collect(),
            },
            system,
            category_column: None,
        }
    }

    pub fn with_category_column(mut self, column: impl Into<String>) -> Self {
        self.category_column = Some(column.into());
        self
    }

    /// Short stable name: the CSV file stem, the inline codes, or the parts
    /// joined with `+`
    pub fn label(&self) -> String {
        match &self.source {
            CodelistSource::Csv { path, .. } => Path::new(path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone()),
            CodelistSource::Inline { codes } => codes.join(","),
            CodelistSource::Combined { parts } => parts
                .iter()
                .map(Codelist::label)
                .collect::<Vec<_>>()
                .join("+"),
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self.source, CodelistSource::Combined { .. })
    }
}

/// Combine codelists of one coding system into a single codelist
///
/// Nested combinations are flattened, so combining a combination with a
/// plain list yields one level of parts.
pub fn combine_codelists(codelists: &[Codelist]) -> Result<Codelist> {
    let first = codelists.first().ok_or_else(|| {
        CohortError::definition(COH0105, "Cannot combine an empty list of codelists")
    })?;

    if let Some(other) = codelists.iter().find(|c| c.system != first.system) {
        return Err(CohortError::definition(
            COH0104,
            format!(
                "Cannot combine codelists from different systems: '{}' is {} but '{}' is {}",
                first.label(),
                first.system,
                other.label(),
                other.system
            ),
        ));
    }

    let mut parts = Vec::new();
    for codelist in codelists {
        match &codelist.source {
            CodelistSource::Combined { parts: inner } => parts.extend(inner.iter().cloned()),
            _ => parts.push(codelist.clone()),
        }
    }

    Ok(Codelist {
        source: CodelistSource::Combined { parts },
        system: first.system,
        category_column: None,
    })
}
