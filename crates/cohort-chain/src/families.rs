//! Chains over the event sources study definitions repeat
//!
//! Each helper fixes the query template and returns the generated
//! [`VariableChain`]. All of them return dates in `YYYY-MM-DD` and search
//! forward, first match.

use crate::generator::{ChainBuilder, VariableChain};
use cohort_ast::DateRef;
use cohort_diagnostics::Result;
use cohort_model::{
    AdmittedToHospital, ClinicalEvents, Codelist, EmergencyCare, QuerySpec, ReturnExpectations,
    TestResult, TestResultInSgss, VaccinationRecord, VaccineTarget,
};

/// Days between vaccine doses in dose chains
pub const DOSE_GAP_DAYS: u32 = 15;

fn chain(
    name: &str,
    mut template: QuerySpec,
    index_date: DateRef,
    n: usize,
    return_expectations: Option<ReturnExpectations>,
) -> Result<VariableChain> {
    template.set_return_expectations(return_expectations);
    ChainBuilder::new(name, template)
        .index_date(index_date)
        .occurrences(n)
        .build()
}

/// Dates of recorded clinical events from `codelist`
pub fn clinical_events_chain(
    name: &str,
    codelist: Codelist,
    index_date: DateRef,
    n: usize,
    return_expectations: Option<ReturnExpectations>,
) -> Result<VariableChain> {
    let template = QuerySpec::from(ClinicalEvents::dates(codelist));
    chain(name, template, index_date, n, return_expectations)
}

/// Dates of SARS-CoV-2 tests with the given result; every specimen counts
pub fn covid_test_chain(
    name: &str,
    index_date: DateRef,
    n: usize,
    test_result: TestResult,
    return_expectations: Option<ReturnExpectations>,
) -> Result<VariableChain> {
    let template = QuerySpec::from(TestResultInSgss::sars_cov_2(test_result));
    chain(name, template, index_date, n, return_expectations)
}

/// Arrival dates of emergency care attendances
pub fn emergency_attendance_chain(
    name: &str,
    index_date: DateRef,
    n: usize,
    return_expectations: Option<ReturnExpectations>,
) -> Result<VariableChain> {
    let template = QuerySpec::from(EmergencyCare::default());
    chain(name, template, index_date, n, return_expectations)
}

/// Hospital admission or discharge dates
///
/// Later occurrences are anchored on `index_name`'s chain. An admission
/// chain passes its own name; the matching discharge chain passes the
/// admission chain's name, so discharge `i` is searched from the day after
/// admission `i - 1` and both chains count the same stays.
pub fn admission_chain(
    name: &str,
    index_name: &str,
    index_date: DateRef,
    n: usize,
    template: AdmittedToHospital,
    return_expectations: Option<ReturnExpectations>,
) -> Result<VariableChain> {
    let mut template = QuerySpec::from(template);
    template.set_return_expectations(return_expectations);
    ChainBuilder::new(name, template)
        .index_name(index_name)
        .index_date(index_date)
        .occurrences(n)
        .build()
}

/// Vaccination dates, each dose searched `gap_days` after the previous one
pub fn vaccination_chain(
    name: &str,
    target: VaccineTarget,
    index_date: DateRef,
    n: usize,
    gap_days: u32,
    return_expectations: Option<ReturnExpectations>,
) -> Result<VariableChain> {
    let mut template = QuerySpec::from(VaccinationRecord::dates(target));
    template.set_return_expectations(return_expectations);
    ChainBuilder::new(name, template)
        .index_date(index_date)
        .occurrences(n)
        .gap_days(gap_days)
        .build()
}
