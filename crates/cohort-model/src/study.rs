//! Study definitions
//!
//! A [`StudyDefinition`] is what the extraction engine consumes: an index
//! date, a population query and an ordered set of named variables. Studies
//! are assembled from [`VariableGroup`]s (`demographic_variables`,
//! `event_variables`, generated chains) with [`StudyBuilder`], which
//! rejects a variable name defined twice.

use crate::expectations::ReturnExpectations;
use crate::query::QuerySpec;
use crate::serde_ext::date_ref;
use cohort_ast::{DateRef, is_valid_name};
use cohort_diagnostics::{COH0102, COH0108, CohortError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered, uniquely named variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableGroup {
    variables: IndexMap<String, QuerySpec>,
}

impl VariableGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable; fails if the name is taken or not a valid identifier
    pub fn insert(&mut self, name: impl Into<String>, spec: QuerySpec) -> Result<()> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(CohortError::invalid_argument(format!(
                "'{name}' is not a valid variable name"
            )));
        }
        if self.variables.contains_key(&name) {
            return Err(duplicate(&name));
        }
        self.variables.insert(name, spec);
        Ok(())
    }

    /// Append every variable of `other`, keeping its order
    ///
    /// Nothing is added when any name collides.
    pub fn merge(&mut self, other: VariableGroup) -> Result<()> {
        if let Some(name) = other.variables.keys().find(|k| self.variables.contains_key(*k)) {
            return Err(duplicate(name));
        }
        self.variables.extend(other.variables);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&QuerySpec> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QuerySpec)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn into_map(self) -> IndexMap<String, QuerySpec> {
        self.variables
    }
}

impl TryFrom<IndexMap<String, QuerySpec>> for VariableGroup {
    type Error = CohortError;

    fn try_from(map: IndexMap<String, QuerySpec>) -> Result<Self> {
        let mut group = VariableGroup::new();
        for (name, spec) in map {
            group.insert(name, spec)?;
        }
        Ok(group)
    }
}

impl IntoIterator for VariableGroup {
    type Item = (String, QuerySpec);
    type IntoIter = indexmap::map::IntoIter<String, QuerySpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.into_iter()
    }
}

fn duplicate(name: &str) -> CohortError {
    CohortError::definition(COH0102, format!("Variable '{name}' is defined more than once"))
        .with_variable(name)
}

/// A complete study definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDefinition {
    #[serde(with = "date_ref")]
    pub index_date: DateRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expectations: Option<ReturnExpectations>,
    pub population: QuerySpec,
    pub variables: IndexMap<String, QuerySpec>,
}

impl StudyDefinition {
    pub fn builder() -> StudyBuilder {
        StudyBuilder::new()
    }

    pub fn variable(&self, name: &str) -> Option<&QuerySpec> {
        self.variables.get(name)
    }

    /// Return expectations of a variable with unset fields taken from the
    /// study defaults
    pub fn effective_expectations(&self, name: &str) -> Option<ReturnExpectations> {
        let own = self.variables.get(name)?.return_expectations();
        match (own, &self.default_expectations) {
            (Some(own), Some(defaults)) => Some(own.or_defaults(defaults)),
            (Some(own), None) => Some(own.clone()),
            (None, defaults) => defaults.clone(),
        }
    }

    /// Check every return expectation, collecting all failures
    pub fn validate_expectations(&self) -> Result<()> {
        let mut errors = Vec::new();
        if let Some(defaults) = &self.default_expectations {
            if let Err(e) = defaults.validate() {
                errors.push(e.with_context("default_expectations"));
            }
        }
        for (name, spec) in &self.variables {
            if let Some(expectations) = spec.return_expectations() {
                if let Err(e) = expectations.validate() {
                    errors.push(e.with_variable(name.clone()));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(combine(errors))
        }
    }
}

/// Builder for [`StudyDefinition`]
///
/// Variable errors are collected and reported together by [`build`].
///
/// [`build`]: StudyBuilder::build
#[derive(Debug, Default)]
pub struct StudyBuilder {
    index_date: Option<DateRef>,
    default_expectations: Option<ReturnExpectations>,
    population: Option<QuerySpec>,
    variables: VariableGroup,
    errors: Vec<CohortError>,
}

impl StudyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_date(mut self, date: impl Into<DateRef>) -> Self {
        self.index_date = Some(date.into());
        self
    }

    pub fn default_expectations(mut self, expectations: ReturnExpectations) -> Self {
        self.default_expectations = Some(expectations);
        self
    }

    pub fn population(mut self, population: QuerySpec) -> Self {
        self.population = Some(population);
        self
    }

    pub fn variable(mut self, name: impl Into<String>, spec: QuerySpec) -> Self {
        if let Err(e) = self.variables.insert(name, spec) {
            self.errors.push(e);
        }
        self
    }

    /// Add a group of variables, as `**event_variables` does
    pub fn extend(mut self, group: impl IntoIterator<Item = (String, QuerySpec)>) -> Self {
        for (name, spec) in group {
            self = self.variable(name, spec);
        }
        self
    }

    pub fn build(self) -> Result<StudyDefinition> {
        let mut errors = self.errors;
        if self.population.is_none() {
            errors.push(CohortError::definition(COH0108, "Study has no population"));
        }
        if self.index_date.is_none() {
            errors.push(CohortError::invalid_argument("Study has no index date"));
        }
        let (Some(index_date), Some(population), true) =
            (self.index_date, self.population, errors.is_empty())
        else {
            return Err(combine(errors));
        };

        let study = StudyDefinition {
            index_date,
            default_expectations: self.default_expectations,
            population,
            variables: self.variables.into_map(),
        };
        log::debug!(
            "Built study with index date {} and {} variables",
            study.index_date,
            study.variables.len()
        );
        Ok(study)
    }
}

fn combine(mut errors: Vec<CohortError>) -> CohortError {
    if errors.len() == 1 {
        errors.remove(0)
    } else {
        CohortError::Multiple(errors)
    }
}
