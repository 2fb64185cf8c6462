//! Resolution errors

use cohort_diagnostics::{COH0101, COH0103, COH0200, COH0201, CohortError};
use thiserror::Error;

/// Result type for resolution operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while analysing or resolving a study
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A variable refers to a name the study does not define
    #[error("Undefined variable '{name}' referenced by '{referenced_by}'")]
    UndefinedVariable { name: String, referenced_by: String },

    /// Variables that depend on each other
    #[error("Circular reference: {}", .cycle.join(" -> "))]
    CircularReference { cycle: Vec<String> },

    /// Anchor arithmetic left the calendar
    #[error("Date arithmetic overflow evaluating '{expression}'")]
    DateOverflow { expression: String },

    /// The study's index date is not a calendar date
    #[error("Index date '{expression}' must be a calendar date")]
    IndexDateNotLiteral { expression: String },
}

impl EvalError {
    /// Variable the error concerns
    pub fn variable(&self) -> Option<&str> {
        match self {
            EvalError::UndefinedVariable { referenced_by, .. } => Some(referenced_by),
            EvalError::CircularReference { cycle } => cycle.first().map(String::as_str),
            _ => None,
        }
    }
}

impl From<EvalError> for CohortError {
    fn from(err: EvalError) -> Self {
        let message = err.to_string();
        let variable = err.variable().map(str::to_string);
        let converted = match &err {
            EvalError::UndefinedVariable { .. } => CohortError::definition(COH0101, message),
            EvalError::CircularReference { .. } => CohortError::definition(COH0103, message),
            EvalError::DateOverflow { .. } => CohortError::resolution(COH0201, message),
            EvalError::IndexDateNotLiteral { .. } => CohortError::resolution(COH0200, message),
        };
        match variable {
            Some(name) => converted.with_variable(name),
            None => converted,
        }
    }
}
