//! Typed cohort study definitions with recurrent-event chains
//!
//! This crate ties the cohort crates together:
//! - Anchor and population expressions ([`ast`], [`parser`])
//! - The query catalogue and study definitions ([`model`])
//! - Recurrent-variable chains ([`chain`])
//! - Dependency checks and the reference resolver ([`eval`])
//! - Study manifests, which describe a study with chains as plain JSON
//!
//! # Example
//!
//! ```
//! use cohort::{DateRef, QuerySpec, TestResult, TestResultInSgss, generate_chain};
//!
//! let template = QuerySpec::from(TestResultInSgss::sars_cov_2(TestResult::Any));
//! let chain = generate_chain("covid_test", &template, DateRef::index_date(), 3)?;
//!
//! assert_eq!(
//!     chain["covid_test_3_date"].anchor().map(ToString::to_string).as_deref(),
//!     Some("covid_test_2_date + 1 day")
//! );
//! # Ok::<(), cohort::CohortError>(())
//! ```

pub use cohort_ast as ast;
pub use cohort_chain as chain;
pub use cohort_diagnostics as diagnostics;
pub use cohort_eval as eval;
pub use cohort_model as model;
pub use cohort_parser as parser;

pub use cohort_ast::DateRef;
pub use cohort_chain::{ChainBuilder, generate_chain, generate_chain_with_index};
pub use cohort_diagnostics::{CohortError, Result};
pub use cohort_model::{QuerySpec, StudyDefinition, TestResult, TestResultInSgss};

pub mod checks;
pub mod manifest;

pub use checks::check_study;
pub use manifest::{BaselineSpec, ChainFamily, ChainSpec, IndexDateSource, StudyManifest};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
