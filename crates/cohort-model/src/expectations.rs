//! Return expectations
//!
//! Hints for dummy-data generation. They do not affect the queries and are
//! passed through to the extraction engine; only their internal consistency
//! is checked here.

use crate::serde_ext::opt_date_ref;
use chrono::NaiveDate;
use cohort_ast::{DateBase, DateRef};
use cohort_diagnostics::{COH0106, CohortError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const RATIO_TOLERANCE: f64 = 1e-6;

/// How event dates are spread across the expected range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    Uniform,
    ExponentialIncrease,
    Universal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, with = "opt_date_ref", skip_serializing_if = "Option::is_none")]
    pub earliest: Option<DateRef>,
    #[serde(default, with = "opt_date_ref", skip_serializing_if = "Option::is_none")]
    pub latest: Option<DateRef>,
}

impl DateRange {
    pub fn new(earliest: impl Into<DateRef>, latest: impl Into<DateRef>) -> Self {
        Self {
            earliest: Some(earliest.into()),
            latest: Some(latest.into()),
        }
    }

    /// Both bounds, when both are plain calendar dates
    pub fn literal_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let plain = |bound: &Option<DateRef>| match bound {
            Some(DateRef {
                base: DateBase::Literal(date),
                offset: None,
            }) => Some(*date),
            _ => None,
        };
        Some((plain(&self.earliest)?, plain(&self.latest)?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRatios {
    pub ratios: IndexMap<String, f64>,
}

impl CategoryRatios {
    pub fn new<I, S>(ratios: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            ratios: ratios.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Distribution of integer-valued results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum IntDistribution {
    Normal { mean: f64, stddev: f64 },
    PopulationAges,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnExpectations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRatios>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int: Option<IntDistribution>,
}

impl ReturnExpectations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date = Some(range);
        self
    }

    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_incidence(mut self, incidence: f64) -> Self {
        self.incidence = Some(incidence);
        self
    }

    pub fn with_category(mut self, category: CategoryRatios) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_int(mut self, int: IntDistribution) -> Self {
        self.int = Some(int);
        self
    }

    /// Fill unset fields from `defaults` (a study's `default_expectations`)
    pub fn or_defaults(&self, defaults: &ReturnExpectations) -> ReturnExpectations {
        ReturnExpectations {
            date: self.date.clone().or_else(|| defaults.date.clone()),
            rate: self.rate.or(defaults.rate),
            incidence: self.incidence.or(defaults.incidence),
            category: self.category.clone().or_else(|| defaults.category.clone()),
            int: self.int.clone().or_else(|| defaults.int.clone()),
        }
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if let Some(incidence) = self.incidence {
            if !(0.0..=1.0).contains(&incidence) {
                return Err(CohortError::definition(
                    COH0106,
                    format!("incidence must be between 0 and 1, got {incidence}"),
                ));
            }
        }

        if let Some(category) = &self.category {
            if category.ratios.is_empty() {
                return Err(CohortError::definition(
                    COH0106,
                    "category ratios must not be empty",
                ));
            }
            let total: f64 = category.ratios.values().sum();
            if (total - 1.0).abs() > RATIO_TOLERANCE {
                return Err(CohortError::definition(
                    COH0106,
                    format!("category ratios must sum to 1, got {total}"),
                ));
            }
        }

        if let Some((from, to)) = self.date.as_ref().and_then(DateRange::literal_bounds) {
            if from > to {
                return Err(CohortError::definition(
                    COH0106,
                    format!("date range is empty: earliest {from} is after latest {to}"),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_deserialize_study_expectations() {
        let json = r#"{
            "date": {"earliest": "2020-05-01", "latest": "index_date"},
            "rate": "uniform",
            "incidence": 0.05
        }"#;
        let expectations: ReturnExpectations = serde_json::from_str(json).unwrap();
        assert_eq!(expectations.rate, Some(Rate::Uniform));
        assert_eq!(
            expectations.date.as_ref().and_then(|d| d.latest.clone()),
            Some(DateRef::index_date())
        );
        expectations.validate().unwrap();
    }

    #[test]
    fn test_int_distribution_tagging() {
        let json = r#"{"rate": "universal", "int": {"distribution": "population_ages"}, "incidence": 1}"#;
        let expectations: ReturnExpectations = serde_json::from_str(json).unwrap();
        assert_eq!(expectations.int, Some(IntDistribution::PopulationAges));

        let json = r#"{"int": {"distribution": "normal", "mean": 1000, "stddev": 100}}"#;
        let expectations: ReturnExpectations = serde_json::from_str(json).unwrap();
        assert_eq!(
            expectations.int,
            Some(IntDistribution::Normal {
                mean: 1000.0,
                stddev: 100.0
            })
        );
    }

    #[rstest::rstest]
    #[case(0.0, true)]
    #[case(0.05, true)]
    #[case(1.0, true)]
    #[case(1.5, false)]
    #[case(-0.1, false)]
    fn test_incidence_bounds(#[case] incidence: f64, #[case] valid: bool) {
        let result = ReturnExpectations::new().with_incidence(incidence).validate();
        match result {
            Ok(()) => assert!(valid),
            Err(err) => {
                assert!(!valid);
                assert_eq!(err.code(), COH0106);
            }
        }
    }

    #[test]
    fn test_ratios_must_sum_to_one() {
        let ok = ReturnExpectations::new().with_category(CategoryRatios::new([("M", 0.49), ("F", 0.51)]));
        ok.validate().unwrap();

        let bad = ReturnExpectations::new().with_category(CategoryRatios::new([("M", 0.5), ("F", 0.6)]));
        assert_eq!(bad.validate().unwrap_err().code(), COH0106);
    }

    #[test]
    fn test_inverted_literal_range() {
        let expectations =
            ReturnExpectations::new().with_date_range(DateRange::new(date(2021, 6, 1), date(2020, 5, 1)));
        assert_eq!(expectations.validate().unwrap_err().code(), COH0106);
    }

    #[test]
    fn test_or_defaults() {
        let defaults = ReturnExpectations::new()
            .with_date_range(DateRange::new(date(1970, 1, 1), date(2021, 6, 1)))
            .with_rate(Rate::Uniform)
            .with_incidence(0.2);
        let own = ReturnExpectations::new().with_incidence(0.05);
        let merged = own.or_defaults(&defaults);
        assert_eq!(merged.incidence, Some(0.05));
        assert_eq!(merged.rate, Some(Rate::Uniform));
        assert_eq!(merged.date, defaults.date);
    }
}
