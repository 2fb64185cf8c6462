//! Variable dependency analysis
//!
//! A variable depends on every variable its anchors name and, for
//! `satisfying` queries, on every identifier in its expression that is not
//! one of its own local variables. `index_date` is always defined.

use crate::error::{EvalError, EvalResult};
use cohort_model::{QuerySpec, StudyDefinition};
use indexmap::{IndexMap, IndexSet};

/// Dependencies between a study's top-level variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Variable -> variables it depends on, in declaration order
    edges: IndexMap<String, Vec<String>>,
}

/// Top-level names a query refers to
fn references(spec: &QuerySpec) -> IndexSet<String> {
    let mut out: IndexSet<String> = spec
        .date_refs()
        .into_iter()
        .filter_map(|d| d.referenced_variable())
        .map(str::to_string)
        .collect();

    if let QuerySpec::Satisfying(satisfying) = spec {
        for id in satisfying.expression.expr.identifiers() {
            if !satisfying.variables.contains_key(&id.name) {
                out.insert(id.name.clone());
            }
        }
        for local in satisfying.variables.values() {
            for name in references(local) {
                if !satisfying.variables.contains_key(&name) {
                    out.insert(name);
                }
            }
        }
    }
    out
}

impl DependencyGraph {
    /// Analyse `study`, failing on undefined references or cycles
    ///
    /// Every undefined reference is reported, not only the first.
    pub fn build(study: &StudyDefinition) -> EvalResult<Self> {
        let graph = Self::build_unchecked(study);
        let undefined = graph.undefined_references(study);
        if let Some(first) = undefined.into_iter().next() {
            return Err(first);
        }
        if let Some(cycle) = graph.find_cycle() {
            return Err(EvalError::CircularReference { cycle });
        }
        Ok(graph)
    }

    /// Edges only, without checking references
    pub fn build_unchecked(study: &StudyDefinition) -> Self {
        let edges = study
            .variables
            .iter()
            .map(|(name, spec)| (name.clone(), references(spec).into_iter().collect()))
            .collect();
        Self { edges }
    }

    /// References to names the study does not define, the population's
    /// included
    pub fn undefined_references(&self, study: &StudyDefinition) -> Vec<EvalError> {
        let population: (String, Vec<String>) = (
            "population".to_string(),
            references(&study.population).into_iter().collect(),
        );
        self.edges
            .iter()
            .map(|(name, deps)| (name, deps.iter()))
            .chain(std::iter::once((&population.0, population.1.iter())))
            .flat_map(|(name, deps)| {
                deps.filter(|dep| !self.edges.contains_key(*dep))
                    .map(|dep| EvalError::UndefinedVariable {
                        name: dep.clone(),
                        referenced_by: name.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn dependencies(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Variables that depend directly on `name`
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.iter().any(|d| d == name))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Resolution order: dependencies first, ties broken by declaration
    /// order
    ///
    /// Variables on a cycle, or depending on one, are left out.
    pub fn order(&self) -> Vec<&str> {
        let mut emitted: IndexSet<&str> = IndexSet::with_capacity(self.edges.len());
        loop {
            let next = self.edges.iter().find(|(name, deps)| {
                !emitted.contains(name.as_str())
                    && deps
                        .iter()
                        .all(|d| emitted.contains(d.as_str()) || !self.edges.contains_key(d))
            });
            match next {
                Some((name, _)) => {
                    emitted.insert(name.as_str());
                }
                None => break,
            }
        }
        emitted.into_iter().collect()
    }

    /// A cycle as a path that starts and ends on the same variable
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit<'a>(
            graph: &'a DependencyGraph,
            name: &'a str,
            marks: &mut IndexMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(name).copied().unwrap_or(Mark::Unvisited) {
                Mark::Done => return None,
                Mark::InProgress => {
                    let start = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(name.to_string());
                    return Some(cycle);
                }
                Mark::Unvisited => {}
            }
            marks.insert(name, Mark::InProgress);
            path.push(name);
            for dep in graph.dependencies(name) {
                if graph.edges.contains_key(dep) {
                    if let Some(cycle) = visit(graph, dep, marks, path) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            marks.insert(name, Mark::Done);
            None
        }

        let mut marks = IndexMap::new();
        let mut path = Vec::new();
        self.edges
            .keys()
            .find_map(|name| visit(self, name, &mut marks, &mut path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_ast::DateRef;
    use cohort_model::{
        Anchor, EmergencyCare, PopulationFilter, RegisteredAsOf, Satisfying, TestResult,
        TestResultInSgss,
    };
    use pretty_assertions::assert_eq;

    fn sgss_from(anchor: DateRef) -> QuerySpec {
        QuerySpec::from(TestResultInSgss::sars_cov_2(TestResult::Any))
            .with_anchor(Anchor::on_or_after(anchor))
            .unwrap()
    }

    fn population(expression: &str) -> QuerySpec {
        let mut variables = IndexMap::new();
        variables.insert(
            "registered".to_string(),
            QuerySpec::RegisteredAsOf(RegisteredAsOf {
                reference_date: DateRef::index_date(),
                return_expectations: None,
            }),
        );
        QuerySpec::Satisfying(Satisfying {
            expression: PopulationFilter::parse(expression).unwrap(),
            variables,
            return_expectations: None,
        })
    }

    fn study(variables: Vec<(&str, QuerySpec)>) -> StudyDefinition {
        variables
            .into_iter()
            .fold(
                StudyDefinition::builder()
                    .index_date(chrono::NaiveDate::from_ymd_opt(2020, 12, 7).unwrap())
                    .population(population("registered")),
                |builder, (name, spec)| builder.variable(name, spec),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_chain_order() {
        // Declared out of order on purpose
        let study = study(vec![
            ("t_2_date", sgss_from(DateRef::variable("t_1_date").plus_days(1))),
            ("emergency", QuerySpec::from(EmergencyCare::default())),
            ("t_1_date", sgss_from(DateRef::index_date())),
        ]);
        let graph = DependencyGraph::build(&study).unwrap();
        assert_eq!(graph.order(), vec!["emergency", "t_1_date", "t_2_date"]);
        assert_eq!(graph.dependents("t_1_date"), vec!["t_2_date"]);
    }

    #[test]
    fn test_undefined_reference() {
        let study = study(vec![(
            "t_2_date",
            sgss_from(DateRef::variable("t_1_date").plus_days(1)),
        )]);
        let err = DependencyGraph::build(&study).unwrap_err();
        assert_eq!(
            err,
            EvalError::UndefinedVariable {
                name: "t_1_date".into(),
                referenced_by: "t_2_date".into()
            }
        );
    }

    #[test]
    fn test_cycle() {
        let study = study(vec![
            ("a_1_date", sgss_from(DateRef::variable("a_2_date"))),
            ("a_2_date", sgss_from(DateRef::variable("a_1_date").plus_days(1))),
        ]);
        match DependencyGraph::build(&study).unwrap_err() {
            EvalError::CircularReference { cycle } => {
                assert_eq!(cycle, vec!["a_1_date", "a_2_date", "a_1_date"]);
            }
            other => panic!("Expected cycle, got {other:?}"),
        }
        let graph = DependencyGraph::build_unchecked(&study);
        assert!(graph.order().is_empty());
    }

    #[test]
    fn test_population_references_checked() {
        let mut study = study(vec![]);
        study.population = population("registered AND NOT has_died");
        let graph = DependencyGraph::build_unchecked(&study);
        let undefined = graph.undefined_references(&study);
        assert_eq!(undefined.len(), 1);
        assert_eq!(undefined[0].variable(), Some("population"));
    }
}
