//! Study resolution engine
//!
//! [`Resolver`] walks a study's date variables in dependency order and
//! resolves each one against the patient's events.

use crate::context::ResolutionContext;
use crate::dependency::DependencyGraph;
use crate::error::{EvalError, EvalResult};
use crate::resolution::Resolution;
use crate::store::{Event, EventStore};
use chrono::NaiveDate;
use cohort_diagnostics::{CohortError, Result};
use cohort_model::{MatchOrder, QuerySpec, Returning, StudyDefinition};
use indexmap::IndexMap;

/// Resolves date variables for one patient at a time
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    /// Also report variables that do not return dates, as `NotApplicable`
    include_non_dates: bool,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_non_dates(mut self, include: bool) -> Self {
        self.include_non_dates = include;
        self
    }

    /// Resolve every date variable of `study`
    ///
    /// Results follow the study's declaration order. Undefined references
    /// are all reported together; a cycle fails the whole study.
    pub fn resolve(
        &self,
        study: &StudyDefinition,
        store: &dyn EventStore,
    ) -> Result<IndexMap<String, Resolution>> {
        let graph = DependencyGraph::build_unchecked(study);
        let mut undefined: Vec<CohortError> = graph
            .undefined_references(study)
            .into_iter()
            .map(CohortError::from)
            .collect();
        match undefined.len() {
            0 => {}
            1 => return Err(undefined.remove(0)),
            _ => return Err(CohortError::Multiple(undefined)),
        }
        if let Some(cycle) = graph.find_cycle() {
            return Err(EvalError::CircularReference { cycle }.into());
        }

        let mut ctx = ResolutionContext::for_index_date(&study.index_date)?;
        log::debug!(
            "Resolving {} variables from index date {}",
            graph.len(),
            ctx.index_date
        );

        for name in graph.order() {
            let Some(spec) = study.variable(name) else {
                continue;
            };
            if !spec.returns_date() {
                if self.include_non_dates {
                    ctx.set(name, Resolution::NotApplicable);
                }
                continue;
            }
            let resolution = self
                .resolve_variable(spec, &ctx, store)
                .map_err(|e| CohortError::from(e).with_variable(name))?;
            log::trace!("{name} -> {resolution}");
            ctx.set(name, resolution);
        }

        let resolved = ctx.into_resolved();
        Ok(study
            .variables
            .keys()
            .filter_map(|name| resolved.get(name).map(|r| (name.clone(), *r)))
            .collect())
    }

    /// Resolve one query against the variables in `ctx`
    pub fn resolve_variable(
        &self,
        spec: &QuerySpec,
        ctx: &ResolutionContext,
        store: &dyn EventStore,
    ) -> EvalResult<Resolution> {
        let period = spec.period().cloned().unwrap_or_default();
        let lower = match period.lower() {
            Some(bound) => match ctx.evaluate(bound)? {
                Some(date) => Some(date),
                None => return Ok(Resolution::NotApplicable),
            },
            None => None,
        };
        let upper = match period.upper() {
            Some(bound) => match ctx.evaluate(bound)? {
                Some(date) => Some(date),
                None => return Ok(Resolution::NotApplicable),
            },
            None => None,
        };

        let mut events: Vec<Event> = store
            .events(spec)
            .into_iter()
            .filter(|e| within(e.date, lower, upper))
            .collect();
        events.sort();

        let matched = match spec.match_order() {
            MatchOrder::First => events.first(),
            MatchOrder::Last => events.last(),
        };
        let date = match spec.returning() {
            Some(Returning::DateDischarged) => matched.and_then(|e| e.end_date),
            _ => matched.map(|e| e.date),
        };
        Ok(Resolution::from(date))
    }
}

fn within(date: NaiveDate, lower: Option<NaiveDate>, upper: Option<NaiveDate>) -> bool {
    lower.is_none_or(|l| date >= l) && upper.is_none_or(|u| date <= u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEventStore;
    use cohort_ast::DateRef;
    use cohort_diagnostics::{COH0101, COH0103, COH0200};
    use cohort_model::{
        AgeAsOf, Anchor, EmergencyCare, PopulationFilter, RegisteredAsOf, Satisfying, TestResult,
        TestResultInSgss,
    };
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn population() -> QuerySpec {
        let mut variables = IndexMap::new();
        variables.insert(
            "registered".to_string(),
            QuerySpec::RegisteredAsOf(RegisteredAsOf {
                reference_date: DateRef::index_date(),
                return_expectations: None,
            }),
        );
        QuerySpec::Satisfying(Satisfying {
            expression: PopulationFilter::parse("registered").unwrap(),
            variables,
            return_expectations: None,
        })
    }

    fn sgss() -> QuerySpec {
        QuerySpec::from(TestResultInSgss::sars_cov_2(TestResult::Any))
    }

    fn anchored(anchor: Anchor) -> QuerySpec {
        sgss().with_anchor(anchor).unwrap()
    }

    fn study(variables: Vec<(&str, QuerySpec)>) -> StudyDefinition {
        variables
            .into_iter()
            .fold(
                StudyDefinition::builder()
                    .index_date(date(2020, 12, 7))
                    .population(population()),
                |b, (name, spec)| b.variable(name, spec),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_forward_chain() {
        let study = study(vec![
            ("t_1_date", anchored(Anchor::on_or_after(DateRef::index_date()))),
            (
                "t_2_date",
                anchored(Anchor::on_or_after(DateRef::variable("t_1_date").plus_days(1))),
            ),
            (
                "t_3_date",
                anchored(Anchor::on_or_after(DateRef::variable("t_2_date").plus_days(1))),
            ),
            (
                "t_4_date",
                anchored(Anchor::on_or_after(DateRef::variable("t_3_date").plus_days(1))),
            ),
        ]);
        let store = InMemoryEventStore::new().with_events(
            &sgss(),
            [
                Event::on(date(2020, 11, 30)),
                Event::on(date(2021, 1, 4)),
                Event::on(date(2020, 12, 7)),
                Event::on(date(2021, 1, 4)),
            ],
        );

        let resolved = Resolver::new().resolve(&study, &store).unwrap();
        assert_eq!(
            resolved.into_iter().collect::<Vec<_>>(),
            vec![
                ("t_1_date".to_string(), Resolution::Resolved(date(2020, 12, 7))),
                ("t_2_date".to_string(), Resolution::Resolved(date(2021, 1, 4))),
                ("t_3_date".to_string(), Resolution::NotFound),
                ("t_4_date".to_string(), Resolution::NotApplicable),
            ]
        );
    }

    #[test]
    fn test_last_match_before_index() {
        let study = study(vec![(
            "t_0_date",
            anchored(Anchor::on_or_before(DateRef::index_date().minus_days(1))),
        )]);
        let store = InMemoryEventStore::new().with_events(
            &sgss(),
            [
                Event::on(date(2020, 10, 1)),
                Event::on(date(2020, 12, 6)),
                Event::on(date(2020, 12, 7)),
            ],
        );
        let resolved = Resolver::new().resolve(&study, &store).unwrap();
        assert_eq!(resolved["t_0_date"], Resolution::Resolved(date(2020, 12, 6)));
    }

    #[test]
    fn test_non_date_variables_skipped() {
        let age = QuerySpec::AgeAsOf(AgeAsOf {
            reference_date: DateRef::index_date(),
            return_expectations: None,
        });
        let study = study(vec![
            ("age", age),
            ("emergency", QuerySpec::from(EmergencyCare::default())),
        ]);
        let store = InMemoryEventStore::new();

        let resolved = Resolver::new().resolve(&study, &store).unwrap();
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["emergency"]);

        let resolved = Resolver::new()
            .include_non_dates(true)
            .resolve(&study, &store)
            .unwrap();
        assert_eq!(resolved["age"], Resolution::NotApplicable);
    }

    #[test]
    fn test_undefined_references_reported_together() {
        let study = study(vec![
            (
                "a_2_date",
                anchored(Anchor::on_or_after(DateRef::variable("a_1_date").plus_days(1))),
            ),
            (
                "b_2_date",
                anchored(Anchor::on_or_after(DateRef::variable("b_1_date").plus_days(1))),
            ),
        ]);
        let err = Resolver::new()
            .resolve(&study, &InMemoryEventStore::new())
            .unwrap_err();
        let diagnostics = err.to_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.code == COH0101));
    }

    #[test]
    fn test_cycle_rejected() {
        let study = study(vec![
            ("a_1_date", anchored(Anchor::on_or_after(DateRef::variable("a_2_date")))),
            ("a_2_date", anchored(Anchor::on_or_after(DateRef::variable("a_1_date")))),
        ]);
        let err = Resolver::new()
            .resolve(&study, &InMemoryEventStore::new())
            .unwrap_err();
        assert_eq!(err.code(), COH0103);
    }

    #[test]
    fn test_symbolic_index_date_rejected() {
        let mut study = study(vec![]);
        study.index_date = DateRef::variable("start_date");
        let err = Resolver::new()
            .resolve(&study, &InMemoryEventStore::new())
            .unwrap_err();
        assert_eq!(err.code(), COH0200);
    }
}
