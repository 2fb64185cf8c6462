//! Cohort syntax trees
//!
//! Two small languages appear inside a study definition:
//!
//! - anchor dates (`index_date - 1 day`, `covid_test_1_date + 1 day`,
//!   `2020-12-07`), which position a query's search period, and
//! - population expressions (`registered AND NOT has_died`), which select
//!   the patients that make up the cohort.
//!
//! This crate holds their trees; parsing lives in `cohort-parser`.

mod date_ref;
mod population;

pub use date_ref::*;
pub use population::*;

use cohort_diagnostics::Span;
use serde::{Deserialize, Serialize};

/// The identifier every study resolves to its configured index date
pub const INDEX_DATE: &str = "index_date";

/// A variable name as written in an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    /// Where the identifier appeared in its source expression
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::new(s, Span::default())
    }
}

/// Whether `name` is usable as a variable name (`[A-Za-z_][A-Za-z0-9_]*`)
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
