//! Chain generation

use cohort_ast::{DateOffset, DateRef, DateUnit, OffsetSign, is_valid_name};
use cohort_diagnostics::{COH0107, CohortError, Result};
use cohort_model::{Anchor, MatchOrder, QuerySpec, VariableGroup};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Search direction of a chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// `on_or_after` the anchor, first match; occurrences move forward in time
    #[default]
    Forward,
    /// `on_or_before` the anchor, last match; occurrences move backward
    Backward,
}

/// Key of occurrence `i` of chain `name`: `{name}_{i}_date`
pub fn occurrence_key(name: &str, i: usize) -> String {
    format!("{name}_{i}_date")
}

/// Builder exposing every chain option
///
/// ```
/// # use cohort_chain::{ChainBuilder, Direction};
/// # use cohort_model::{AdmittedToHospital, QuerySpec, Returning};
/// # use cohort_ast::DateRef;
/// let template = QuerySpec::from(AdmittedToHospital::returning(Returning::DateDischarged));
/// let chain = ChainBuilder::new("discharged_unplanned", template)
///     .index_date(DateRef::index_date())
///     .index_name("admitted_unplanned")
///     .occurrences(5)
///     .build()
///     .unwrap();
/// assert_eq!(
///     chain.get(2).and_then(|q| q.anchor()).map(ToString::to_string).as_deref(),
///     Some("admitted_unplanned_1_date + 1 day")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    name: String,
    template: QuerySpec,
    index_date: DateRef,
    occurrences: usize,
    index_name: Option<String>,
    direction: Direction,
    gap_days: u32,
}

impl ChainBuilder {
    pub fn new(name: impl Into<String>, template: QuerySpec) -> Self {
        Self {
            name: name.into(),
            template,
            index_date: DateRef::index_date(),
            occurrences: 1,
            index_name: None,
            direction: Direction::Forward,
            gap_days: 1,
        }
    }

    /// Anchor of the first occurrence
    pub fn index_date(mut self, index_date: DateRef) -> Self {
        self.index_date = index_date;
        self
    }

    pub fn occurrences(mut self, n: usize) -> Self {
        self.occurrences = n;
        self
    }

    /// Chain whose occurrences are anchored on: later occurrences search
    /// from `{index_name}_{i-1}_date` instead of this chain's own previous
    /// occurrence
    pub fn index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Days between an occurrence and the start of the next search
    pub fn gap_days(mut self, days: u32) -> Self {
        self.gap_days = days;
        self
    }

    /// Generate the chain
    ///
    /// Every argument is checked before any occurrence is built, so an
    /// error never leaves a partial chain behind.
    pub fn build(&self) -> Result<VariableChain> {
        self.check()?;
        let index_name = self.index_name.as_deref().unwrap_or(&self.name);

        let mut variables = IndexMap::with_capacity(self.occurrences);
        for i in 1..=self.occurrences {
            let key = occurrence_key(&self.name, i);
            let anchor_date = if i == 1 {
                self.index_date.clone()
            } else {
                self.step_from(&occurrence_key(index_name, i - 1))
            };
            log::trace!("{key}: searching {:?} from {anchor_date}", self.direction);

            let anchor = match self.direction {
                Direction::Forward => Anchor::on_or_after(anchor_date),
                Direction::Backward => Anchor::on_or_before(anchor_date),
            };
            variables.insert(key, self.template.with_anchor(anchor)?);
        }

        log::debug!(
            "Generated chain '{}' with {} occurrences from {}",
            self.name,
            variables.len(),
            self.index_date
        );
        Ok(VariableChain {
            name: self.name.clone(),
            variables,
        })
    }

    fn check(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CohortError::invalid_argument("chain name must not be empty"));
        }
        if self.occurrences < 1 {
            return Err(CohortError::invalid_argument(format!(
                "chain '{}' needs at least 1 occurrence, got {}",
                self.name, self.occurrences
            )));
        }
        if !is_valid_name(&occurrence_key(&self.name, 1)) {
            return Err(CohortError::invalid_argument(format!(
                "'{}' cannot be used as a variable name stem",
                self.name
            )));
        }
        if let Some(index_name) = &self.index_name {
            if index_name.is_empty() || !is_valid_name(&occurrence_key(index_name, 1)) {
                return Err(CohortError::invalid_argument(format!(
                    "'{index_name}' cannot be used as an index chain name"
                )));
            }
        }
        if self.gap_days == 0 {
            return Err(CohortError::invalid_argument(
                "gap between occurrences must be at least 1 day",
            ));
        }
        if !self.template.is_anchorable() {
            return Err(CohortError::definition(
                COH0107,
                format!(
                    "chain '{}' needs an event query, '{}' has no search period",
                    self.name,
                    self.template.kind()
                ),
            ));
        }
        Ok(())
    }

    fn step_from(&self, previous: &str) -> DateRef {
        let base = DateRef::variable(previous);
        match self.direction {
            Direction::Forward => base.plus_days(self.gap_days),
            Direction::Backward => base.minus_days(self.gap_days),
        }
    }
}

/// Generate `n` occurrences of `template`, the first anchored at
/// `index_date` and each later one the day after its predecessor
pub fn generate_chain(
    name: &str,
    template: &QuerySpec,
    index_date: DateRef,
    n: usize,
) -> Result<IndexMap<String, QuerySpec>> {
    ChainBuilder::new(name, template.clone())
        .index_date(index_date)
        .occurrences(n)
        .build()
        .map(VariableChain::into_map)
}

/// [`generate_chain`] with later occurrences anchored on another chain's
/// occurrences, as discharge dates follow the admission chain
pub fn generate_chain_with_index(
    name: &str,
    index_name: &str,
    template: &QuerySpec,
    index_date: DateRef,
    n: usize,
) -> Result<IndexMap<String, QuerySpec>> {
    ChainBuilder::new(name, template.clone())
        .index_name(index_name)
        .index_date(index_date)
        .occurrences(n)
        .build()
        .map(VariableChain::into_map)
}

/// The `{name}_0_date` variable: the `find` match on or before the day
/// before `index_date`
///
/// Admission and vaccine baselines take the first match; test and primary
/// care baselines usually take the most recent one.
pub fn baseline(
    name: &str,
    template: &QuerySpec,
    index_date: DateRef,
    find: MatchOrder,
) -> Result<(String, QuerySpec)> {
    if name.is_empty() {
        return Err(CohortError::invalid_argument("chain name must not be empty"));
    }
    let key = occurrence_key(name, 0);
    if !is_valid_name(&key) {
        return Err(CohortError::invalid_argument(format!(
            "'{name}' cannot be used as a variable name stem"
        )));
    }
    let day_before = shift_days(index_date, -1)?;
    let spec = template.with_anchor(Anchor::on_or_before(day_before).with_order(find))?;
    Ok((key, spec))
}

/// Add `delta` days to an anchor, folding into an existing day offset
fn shift_days(date_ref: DateRef, delta: i64) -> Result<DateRef> {
    let current = match date_ref.offset {
        None => 0,
        Some(offset) if offset.unit == DateUnit::Day => offset.signed_amount(),
        Some(offset) => {
            return Err(CohortError::invalid_argument(format!(
                "cannot shift '{date_ref}' by days: it already has a {} offset ({offset})",
                offset.unit.singular()
            )));
        }
    };
    let total = current + delta;
    let amount = u32::try_from(total.unsigned_abs()).map_err(|_| {
        CohortError::invalid_argument(format!("offset of {total} days is out of range"))
    })?;
    let base = DateRef {
        base: date_ref.base,
        offset: None,
    };
    Ok(match total {
        0 => base,
        t if t > 0 => base.with_offset(DateOffset::days(OffsetSign::Plus, amount)),
        _ => base.with_offset(DateOffset::days(OffsetSign::Minus, amount)),
    })
}

/// A generated chain: `{name}_1_date` … `{name}_n_date` in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableChain {
    name: String,
    variables: IndexMap<String, QuerySpec>,
}

impl VariableChain {
    /// The chain's name stem
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Occurrence `i`, counting from 1
    pub fn get(&self, i: usize) -> Option<&QuerySpec> {
        self.variables.get(&occurrence_key(&self.name, i))
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

    pub fn into_group(self) -> Result<VariableGroup> {
        VariableGroup::try_from(self.variables)
    }
}

impl IntoIterator for VariableChain {
    type Item = (String, QuerySpec);
    type IntoIter = indexmap::map::IntoIter<String, QuerySpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_model::{
        AgeAsOf, Codelist, CodingSystem, ClinicalEvents, EmergencyCare, TestResult, TestResultInSgss,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sgss() -> QuerySpec {
        QuerySpec::from(TestResultInSgss::sars_cov_2(TestResult::Any))
    }

    fn anchors(map: &IndexMap<String, QuerySpec>) -> Vec<(String, String)> {
        map.iter()
            .map(|(k, q)| {
                let anchor = q.anchor().map(ToString::to_string).unwrap_or_default();
                (k.clone(), anchor)
            })
            .collect()
    }

    fn date(text: &str) -> DateRef {
        cohort_parser::parse_date_ref(text).unwrap()
    }

    #[test]
    fn test_covid_test_chain_of_three() {
        let chain = generate_chain("covid_test", &sgss(), date("2020-12-07"), 3).unwrap();
        assert_eq!(
            anchors(&chain),
            vec![
                ("covid_test_1_date".to_string(), "2020-12-07".to_string()),
                ("covid_test_2_date".to_string(), "covid_test_1_date + 1 day".to_string()),
                ("covid_test_3_date".to_string(), "covid_test_2_date + 1 day".to_string()),
            ]
        );
        assert!(chain.values().all(|q| q.match_order() == MatchOrder::First));
    }

    #[test]
    fn test_single_occurrence_uses_index_date() {
        let chain = generate_chain("emergency", &QuerySpec::from(EmergencyCare::default()), DateRef::index_date(), 1)
            .unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain["emergency_1_date"].anchor(), Some(&DateRef::index_date()));
    }

    #[rstest]
    #[case("x", 0)]
    #[case("", 3)]
    #[case("", 0)]
    fn test_invalid_arguments(#[case] name: &str, #[case] n: usize) {
        let err = generate_chain(name, &sgss(), date("2021-01-01"), n).unwrap_err();
        assert!(err.is_invalid_argument(), "{err}");
    }

    #[test]
    fn test_index_name_decouples_anchor() {
        let chain = generate_chain_with_index(
            "discharged_unplanned",
            "admitted_unplanned",
            &sgss(),
            DateRef::index_date(),
            3,
        )
        .unwrap();
        let rendered = anchors(&chain);
        assert_eq!(rendered[0].1, "index_date");
        assert_eq!(rendered[1].1, "admitted_unplanned_1_date + 1 day");
        assert_eq!(rendered[2].1, "admitted_unplanned_2_date + 1 day");
        assert_eq!(rendered[2].0, "discharged_unplanned_3_date");
    }

    #[test]
    fn test_idempotent() {
        let template = QuerySpec::from(ClinicalEvents::dates(Codelist::from_csv(
            "codelists/covid.csv",
            CodingSystem::Ctv3,
            "CTV3ID",
        )));
        let first = generate_chain("covid_tpp_probable", &template, DateRef::index_date(), 5).unwrap();
        let second = generate_chain("covid_tpp_probable", &template, DateRef::index_date(), 5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unanchorable_template() {
        let template = QuerySpec::AgeAsOf(AgeAsOf {
            reference_date: DateRef::index_date(),
            return_expectations: None,
        });
        let err = generate_chain("age", &template, DateRef::index_date(), 2).unwrap_err();
        assert_eq!(err.code(), COH0107);
    }

    #[test]
    fn test_backward_chain() {
        let chain = ChainBuilder::new("prior_test", sgss())
            .index_date(date("index_date - 1 day"))
            .direction(Direction::Backward)
            .occurrences(3)
            .build()
            .unwrap();
        let second = chain.get(2).unwrap();
        assert_eq!(second.match_order(), MatchOrder::Last);
        assert_eq!(
            second.period().and_then(|p| p.on_or_before.as_ref()).map(ToString::to_string),
            Some("prior_test_1_date - 1 day".to_string())
        );
    }

    #[test]
    fn test_gap_days() {
        let chain = ChainBuilder::new("covid_vax_pfizer", sgss())
            .occurrences(2)
            .gap_days(15)
            .build()
            .unwrap();
        assert_eq!(
            chain.get(2).and_then(|q| q.anchor()).map(ToString::to_string),
            Some("covid_vax_pfizer_1_date + 15 days".to_string())
        );

        let err = ChainBuilder::new("x", sgss()).gap_days(0).build().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_bad_name_stem() {
        let err = generate_chain("covid test", &sgss(), DateRef::index_date(), 2).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_baseline() {
        let (key, spec) =
            baseline("admitted_unplanned", &sgss(), DateRef::index_date(), MatchOrder::First).unwrap();
        assert_eq!(key, "admitted_unplanned_0_date");
        assert_eq!(spec.anchor().map(ToString::to_string).as_deref(), Some("index_date - 1 day"));
        assert_eq!(spec.match_order(), MatchOrder::First);
    }

    #[test]
    fn test_baseline_last_match() {
        let (key, spec) = baseline("positive_test", &sgss(), DateRef::index_date(), MatchOrder::Last).unwrap();
        assert_eq!(key, "positive_test_0_date");
        assert_eq!(spec.anchor().map(ToString::to_string).as_deref(), Some("index_date - 1 day"));
        assert_eq!(spec.match_order(), MatchOrder::Last);
    }

    #[test]
    fn test_baseline_folds_day_offset() {
        let (_, spec) = baseline("x", &sgss(), date("index_date + 1 day"), MatchOrder::First).unwrap();
        assert_eq!(spec.anchor(), Some(&DateRef::index_date()));

        let err = baseline("x", &sgss(), date("index_date - 1 year"), MatchOrder::Last).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_chain_accessors() {
        let chain = ChainBuilder::new("covid_test", sgss()).occurrences(3).build().unwrap();
        assert_eq!(chain.name(), "covid_test");
        assert_eq!(
            chain.keys().collect::<Vec<_>>(),
            vec!["covid_test_1_date", "covid_test_2_date", "covid_test_3_date"]
        );
        assert!(chain.get(0).is_none());
        assert!(chain.get(4).is_none());
        assert_eq!(chain.into_group().unwrap().len(), 3);
    }
}
