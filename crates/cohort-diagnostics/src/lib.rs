//! Cohort diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by every
//! cohort crate: structured error codes, source locations inside anchor and
//! population expressions, and diagnostic reporting.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for cohort operations
pub type Result<T> = std::result::Result<T, CohortError>;
