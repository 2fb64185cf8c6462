//! Recurrent-event variable chains
//!
//! A study that counts repeated events (the first, second, third positive
//! test after the index date) declares one variable per occurrence. Each
//! occurrence searches from the day after the previous one:
//!
//! ```text
//! covid_test_1_date   on_or_after  2020-12-07
//! covid_test_2_date   on_or_after  covid_test_1_date + 1 day
//! covid_test_3_date   on_or_after  covid_test_2_date + 1 day
//! ```
//!
//! [`generate_chain`] builds such a chain from one query template. The
//! anchors are plain [`DateRef`](cohort_ast::DateRef) expressions;
//! evaluating them is left to the extraction engine, which resolves each
//! occurrence in key order and so finds at most one event per occurrence.
//!
//! The family helpers in [`families`] fix the template for the event
//! sources study definitions chain over.

pub mod families;
mod generator;

pub use families::{
    admission_chain, clinical_events_chain, covid_test_chain, emergency_attendance_chain,
    vaccination_chain,
};
pub use generator::{
    ChainBuilder, Direction, VariableChain, baseline, generate_chain, generate_chain_with_index,
    occurrence_key,
};
