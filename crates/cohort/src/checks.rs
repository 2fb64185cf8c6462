//! Whole-study checks behind `cohort validate`

use cohort_diagnostics::{COH0109, COH0110, CohortError, Diagnostic};
use cohort_eval::{DependencyGraph, EvalError};
use cohort_model::StudyDefinition;

/// Every problem found in `study`, errors and warnings together
///
/// Errors: undefined references, cycles and invalid return expectations.
/// Warnings: date variables with no return expectations at all, and event
/// queries that search the whole record.
pub fn check_study(study: &StudyDefinition) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let graph = DependencyGraph::build_unchecked(study);
    for err in graph.undefined_references(study) {
        diagnostics.extend(CohortError::from(err).to_diagnostics());
    }
    if let Some(cycle) = graph.find_cycle() {
        diagnostics.extend(CohortError::from(EvalError::CircularReference { cycle }).to_diagnostics());
    }
    if let Err(e) = study.validate_expectations() {
        diagnostics.extend(e.to_diagnostics());
    }

    for (name, spec) in &study.variables {
        if !spec.returns_date() {
            continue;
        }
        if study.effective_expectations(name).is_none() {
            log::warn!("{name} has no return expectations");
            diagnostics.push(
                Diagnostic::warning(COH0109, format!("'{name}' has no return expectations"))
                    .with_variable(name.clone()),
            );
        }
        if spec.is_anchorable() && spec.period().is_some_and(|p| p.is_unbounded()) {
            log::warn!("{name} searches the whole record");
            diagnostics.push(
                Diagnostic::warning(
                    COH0110,
                    format!("'{name}' has no search period and matches across the whole record"),
                )
                .with_variable(name.clone()),
            );
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_ast::DateRef;
    use cohort_chain::covid_test_chain;
    use cohort_diagnostics::{COH0101, Severity};
    use cohort_model::{
        DateRange, EmergencyCare, QuerySpec, Rate, RegisteredAsOf, ReturnExpectations, TestResult,
    };

    fn study() -> cohort_model::StudyBuilder {
        StudyDefinition::builder()
            .index_date(chrono::NaiveDate::from_ymd_opt(2020, 12, 7).unwrap())
            .population(QuerySpec::RegisteredAsOf(RegisteredAsOf {
                reference_date: DateRef::index_date(),
                return_expectations: None,
            }))
    }

    fn expectations() -> ReturnExpectations {
        ReturnExpectations::new()
            .with_date_range(DateRange::new(DateRef::index_date(), DateRef::index_date().plus_days(90)))
            .with_rate(Rate::ExponentialIncrease)
    }

    #[test]
    fn test_clean_chain() {
        let chain = covid_test_chain("covid_test", DateRef::index_date(), 3, TestResult::Any, Some(expectations()))
            .unwrap();
        let study = study().extend(chain).build().unwrap();
        assert!(check_study(&study).is_empty());
    }

    #[test]
    fn test_warnings() {
        let study = study()
            .variable("emergency", QuerySpec::from(EmergencyCare::default()))
            .build()
            .unwrap();
        let diagnostics = check_study(&study);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![COH0109, COH0110]);
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn test_undefined_reference_is_error() {
        let chain = covid_test_chain("covid_test", DateRef::index_date(), 2, TestResult::Any, Some(expectations()))
            .unwrap();
        let mut group = chain.into_group().unwrap().into_map();
        group.shift_remove("covid_test_1_date");
        let study = study().extend(group).build().unwrap();

        let diagnostics = check_study(&study);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, COH0101);
        assert!(diagnostics[0].is_error());
    }
}
