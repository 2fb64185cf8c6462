//! Cohort study model
//!
//! The typed form of a study definition:
//!
//! - [`QuerySpec`]: one variable's extraction query, a closed catalogue of
//!   the builder functions study definitions use
//! - [`Codelist`]: code references attached to clinical queries
//! - [`ReturnExpectations`]: dummy-data hints carried through unchanged
//! - [`StudyDefinition`]: index date, population and ordered variables
//!
//! Anchor dates are stored as [`cohort_ast::DateRef`] values and serialized
//! in their canonical text form (`covid_test_1_date + 1 day`).

pub mod codelist;
pub mod config;
pub mod expectations;
pub mod query;
pub mod serialize;
mod serde_ext;
pub mod study;

pub use codelist::{Codelist, CodelistSource, CodingSystem, combine_codelists};
pub use config::GlobalVariables;
pub use expectations::{CategoryRatios, DateRange, IntDistribution, Rate, ReturnExpectations};
pub use query::{
    AddressAsOf, AdmittedToHospital, AgeAsOf, Anchor, ClinicalEvents, CodesOnDeathCertificate,
    DATE_FORMAT, DateWindow, DeregistrationDate, DiedFromAnyCause, EmergencyCare, MatchOrder,
    Period, PopulationFilter, QuerySpec, RegisteredAsOf, RegisteredPracticeAsOf,
    RegisteredWithOnePracticeBetween, Returning, Satisfying, TestResult, TestResultInSgss,
    VaccinationRecord, VaccineTarget,
};
pub use serialize::{JsonSerializer, SerializeError, StudySerializer};
pub use study::{StudyBuilder, StudyDefinition, VariableGroup};
