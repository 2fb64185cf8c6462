//! Query catalogue
//!
//! One struct per builder function a study definition can call, gathered in
//! the closed [`QuerySpec`] enum. Queries that search a period of the
//! patient record carry a [`Period`] and a [`MatchOrder`]; those are what
//! [`QuerySpec::with_anchor`] rewrites when a query is repeated along a
//! chain.

use crate::codelist::Codelist;
use crate::expectations::ReturnExpectations;
use crate::serde_ext::{date_ref, opt_date_ref};
use cohort_ast::{DateRef, PopulationExpr};
use cohort_diagnostics::{COH0107, CohortError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Date format of every date-returning query
pub const DATE_FORMAT: &str = "YYYY-MM-DD";

/// Which match to return when several events fall in the period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrder {
    /// `find_first_match_in_period`
    #[default]
    First,
    /// `find_last_match_in_period`
    Last,
}

/// `between=[start, end]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(with = "date_ref")]
    pub start: DateRef,
    #[serde(with = "date_ref")]
    pub end: DateRef,
}

/// Search period of an event query; all bounds are inclusive
///
/// `between` excludes the other two bounds: a deserialized period never
/// carries both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    #[serde(default, with = "opt_date_ref", skip_serializing_if = "Option::is_none")]
    pub on_or_after: Option<DateRef>,
    #[serde(default, with = "opt_date_ref", skip_serializing_if = "Option::is_none")]
    pub on_or_before: Option<DateRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub between: Option<DateWindow>,
}

#[derive(Deserialize)]
struct RawPeriod {
    #[serde(default, with = "opt_date_ref")]
    on_or_after: Option<DateRef>,
    #[serde(default, with = "opt_date_ref")]
    on_or_before: Option<DateRef>,
    #[serde(default)]
    between: Option<DateWindow>,
}

impl TryFrom<RawPeriod> for Period {
    type Error = String;

    fn try_from(raw: RawPeriod) -> std::result::Result<Self, Self::Error> {
        if raw.between.is_some() && (raw.on_or_after.is_some() || raw.on_or_before.is_some()) {
            return Err("`between` cannot be combined with `on_or_after` or `on_or_before`".to_string());
        }
        Ok(Self {
            on_or_after: raw.on_or_after,
            on_or_before: raw.on_or_before,
            between: raw.between,
        })
    }
}

impl Period {
    pub fn on_or_after(date: impl Into<DateRef>) -> Self {
        Self {
            on_or_after: Some(date.into()),
            ..Self::default()
        }
    }

    pub fn on_or_before(date: impl Into<DateRef>) -> Self {
        Self {
            on_or_before: Some(date.into()),
            ..Self::default()
        }
    }

    pub fn between(start: impl Into<DateRef>, end: impl Into<DateRef>) -> Self {
        Self {
            between: Some(DateWindow {
                start: start.into(),
                end: end.into(),
            }),
            ..Self::default()
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.on_or_after.is_none() && self.on_or_before.is_none() && self.between.is_none()
    }

    /// Inclusive lower bound, from `on_or_after` or the window start;
    /// `on_or_after` wins if both are set
    pub fn lower(&self) -> Option<&DateRef> {
        self.on_or_after
            .as_ref()
            .or(self.between.as_ref().map(|w| &w.start))
    }

    /// Inclusive upper bound, from `on_or_before` or the window end;
    /// `on_or_before` wins if both are set
    pub fn upper(&self) -> Option<&DateRef> {
        self.on_or_before
            .as_ref()
            .or(self.between.as_ref().map(|w| &w.end))
    }

    fn date_refs(&self) -> impl Iterator<Item = &DateRef> {
        self.on_or_after
            .iter()
            .chain(self.on_or_before.iter())
            .chain(self.between.iter().flat_map(|w| [&w.start, &w.end]))
    }
}

/// Period and match order applied to an anchorable query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub period: Period,
    pub order: MatchOrder,
}

impl Anchor {
    /// Search forward from `date`, first match
    pub fn on_or_after(date: impl Into<DateRef>) -> Self {
        Self {
            period: Period::on_or_after(date),
            order: MatchOrder::First,
        }
    }

    /// Search backward from `date`, last match
    pub fn on_or_before(date: impl Into<DateRef>) -> Self {
        Self {
            period: Period::on_or_before(date),
            order: MatchOrder::Last,
        }
    }

    pub fn with_order(mut self, order: MatchOrder) -> Self {
        self.order = order;
        self
    }
}

/// What a query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Returning {
    Date,
    BinaryFlag,
    Category,
    NumberOfMatchesInPeriod,
    NumericValue,
    DateArrived,
    DateAdmitted,
    DateDischarged,
    DateOfDeath,
    PseudoId,
    StpCode,
    Nuts1RegionName,
    Msoa,
    IndexOfMultipleDeprivation,
    RuralUrbanClassification,
}

impl Returning {
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            Returning::Date
                | Returning::DateArrived
                | Returning::DateAdmitted
                | Returning::DateDischarged
                | Returning::DateOfDeath
        )
    }
}

/// SGSS test outcome filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestResult {
    Any,
    Positive,
    Negative,
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestResult::Any => "any",
            TestResult::Positive => "positive",
            TestResult::Negative => "negative",
        };
        f.write_str(name)
    }
}

/// How a vaccination record is matched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaccineTarget {
    TargetDiseaseMatches(String),
    ProductNameMatches(String),
}

impl VaccineTarget {
    pub fn text(&self) -> &str {
        match self {
            VaccineTarget::TargetDiseaseMatches(s) | VaccineTarget::ProductNameMatches(s) => s,
        }
    }
}

/// `patients.with_these_clinical_events`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEvents {
    pub codelist: Codelist,
    pub returning: Returning,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<MatchOrder>,
    #[serde(default)]
    pub include_date_of_match: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

impl ClinicalEvents {
    pub fn dates(codelist: Codelist) -> Self {
        Self {
            codelist,
            returning: Returning::Date,
            period: Period::default(),
            find: None,
            include_date_of_match: false,
            return_expectations: None,
        }
    }
}

/// `patients.with_test_result_in_sgss`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultInSgss {
    pub pathogen: String,
    pub test_result: TestResult,
    #[serde(default)]
    pub restrict_to_earliest_specimen_date: bool,
    pub returning: Returning,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<MatchOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

impl TestResultInSgss {
    /// SARS-CoV-2 test dates, every specimen counted
    pub fn sars_cov_2(test_result: TestResult) -> Self {
        Self {
            pathogen: "SARS-CoV-2".to_string(),
            test_result,
            restrict_to_earliest_specimen_date: false,
            returning: Returning::Date,
            period: Period::default(),
            find: None,
            return_expectations: None,
        }
    }
}

/// `patients.attended_emergency_care`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyCare {
    pub returning: Returning,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<MatchOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_these_diagnoses: Option<Codelist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

impl Default for EmergencyCare {
    fn default() -> Self {
        Self {
            returning: Returning::DateArrived,
            period: Period::default(),
            find: None,
            with_these_diagnoses: None,
            return_expectations: None,
        }
    }
}

/// `patients.admitted_to_hospital`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmittedToHospital {
    pub returning: Returning,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<MatchOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_these_diagnoses: Option<Codelist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_admission_method: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_patient_classification: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

impl AdmittedToHospital {
    pub fn returning(returning: Returning) -> Self {
        Self {
            returning,
            period: Period::default(),
            find: None,
            with_these_diagnoses: None,
            with_admission_method: None,
            with_patient_classification: None,
            return_expectations: None,
        }
    }

    pub fn with_admission_method<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_admission_method = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_patient_classification<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_patient_classification = Some(classes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_these_diagnoses(mut self, codelist: Codelist) -> Self {
        self.with_these_diagnoses = Some(codelist);
        self
    }

    /// Admission filter shared by an admission chain and its discharge chain
    fn filter_key(&self) -> Option<String> {
        if let Some(methods) = &self.with_admission_method {
            let mut key = methods.join(",");
            if let Some(classes) = &self.with_patient_classification {
                key.push('/');
                key.push_str(&classes.join(","));
            }
            return Some(key);
        }
        self.with_these_diagnoses.as_ref().map(Codelist::label)
    }
}

/// `patients.with_tpp_vaccination_record`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    #[serde(flatten)]
    pub target: VaccineTarget,
    pub returning: Returning,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<MatchOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

impl VaccinationRecord {
    pub fn dates(target: VaccineTarget) -> Self {
        Self {
            target,
            returning: Returning::Date,
            period: Period::default(),
            find: None,
            return_expectations: None,
        }
    }
}

/// `patients.died_from_any_cause`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiedFromAnyCause {
    pub returning: Returning,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// `patients.with_these_codes_on_death_certificate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodesOnDeathCertificate {
    pub codelist: Codelist,
    pub returning: Returning,
    #[serde(default)]
    pub match_only_underlying_cause: bool,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// `patients.registered_as_of`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredAsOf {
    #[serde(with = "date_ref")]
    pub reference_date: DateRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// `patients.registered_with_one_practice_between`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredWithOnePracticeBetween {
    #[serde(with = "date_ref")]
    pub start_date: DateRef,
    #[serde(with = "date_ref")]
    pub end_date: DateRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// `patients.age_as_of`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeAsOf {
    #[serde(with = "date_ref")]
    pub reference_date: DateRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// `patients.registered_practice_as_of`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredPracticeAsOf {
    #[serde(with = "date_ref")]
    pub reference_date: DateRef,
    pub returning: Returning,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// `patients.address_as_of`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressAsOf {
    #[serde(with = "date_ref")]
    pub reference_date: DateRef,
    pub returning: Returning,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_to_nearest: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// `patients.date_deregistered_from_all_supported_practices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeregistrationDate {
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// A population expression together with the text it was parsed from
///
/// Serializes as the text; equality compares the text as well as the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationFilter {
    pub source: String,
    pub expr: PopulationExpr,
}

impl PopulationFilter {
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let expr = cohort_parser::parse_population(&source)?;
        Ok(Self { source, expr })
    }
}

impl Serialize for PopulationFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for PopulationFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        PopulationFilter::parse(source).map_err(serde::de::Error::custom)
    }
}

/// `patients.satisfying`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Satisfying {
    pub expression: PopulationFilter,
    /// Variables local to the expression
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, QuerySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

/// A variable's extraction query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum QuerySpec {
    #[serde(rename = "with_these_clinical_events")]
    ClinicalEvents(ClinicalEvents),
    #[serde(rename = "with_test_result_in_sgss")]
    TestResultInSgss(TestResultInSgss),
    #[serde(rename = "attended_emergency_care")]
    EmergencyCare(EmergencyCare),
    #[serde(rename = "admitted_to_hospital")]
    AdmittedToHospital(AdmittedToHospital),
    #[serde(rename = "with_tpp_vaccination_record")]
    VaccinationRecord(VaccinationRecord),
    #[serde(rename = "died_from_any_cause")]
    DiedFromAnyCause(DiedFromAnyCause),
    #[serde(rename = "with_these_codes_on_death_certificate")]
    CodesOnDeathCertificate(CodesOnDeathCertificate),
    #[serde(rename = "registered_as_of")]
    RegisteredAsOf(RegisteredAsOf),
    #[serde(rename = "registered_with_one_practice_between")]
    RegisteredWithOnePracticeBetween(RegisteredWithOnePracticeBetween),
    #[serde(rename = "age_as_of")]
    AgeAsOf(AgeAsOf),
    #[serde(rename = "sex")]
    Sex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        return_expectations: Option<ReturnExpectations>,
    },
    #[serde(rename = "registered_practice_as_of")]
    RegisteredPracticeAsOf(RegisteredPracticeAsOf),
    #[serde(rename = "address_as_of")]
    AddressAsOf(AddressAsOf),
    #[serde(rename = "date_deregistered_from_all_supported_practices")]
    DeregistrationDate(DeregistrationDate),
    #[serde(rename = "satisfying")]
    Satisfying(Satisfying),
}

impl QuerySpec {
    /// Builder function name as written in study definitions
    pub fn kind(&self) -> &'static str {
        match self {
            QuerySpec::ClinicalEvents(_) => "with_these_clinical_events",
            QuerySpec::TestResultInSgss(_) => "with_test_result_in_sgss",
            QuerySpec::EmergencyCare(_) => "attended_emergency_care",
            QuerySpec::AdmittedToHospital(_) => "admitted_to_hospital",
            QuerySpec::VaccinationRecord(_) => "with_tpp_vaccination_record",
            QuerySpec::DiedFromAnyCause(_) => "died_from_any_cause",
            QuerySpec::CodesOnDeathCertificate(_) => "with_these_codes_on_death_certificate",
            QuerySpec::RegisteredAsOf(_) => "registered_as_of",
            QuerySpec::RegisteredWithOnePracticeBetween(_) => "registered_with_one_practice_between",
            QuerySpec::AgeAsOf(_) => "age_as_of",
            QuerySpec::Sex { .. } => "sex",
            QuerySpec::RegisteredPracticeAsOf(_) => "registered_practice_as_of",
            QuerySpec::AddressAsOf(_) => "address_as_of",
            QuerySpec::DeregistrationDate(_) => "date_deregistered_from_all_supported_practices",
            QuerySpec::Satisfying(_) => "satisfying",
        }
    }

    /// Key of the patient record table this query searches
    ///
    /// Queries over the same events share a key: an admission chain and
    /// its discharge chain with the same filters both read the same
    /// admissions.
    pub fn source_key(&self) -> String {
        let qualifier = match self {
            QuerySpec::ClinicalEvents(q) => Some(q.codelist.label()),
            QuerySpec::TestResultInSgss(q) => Some(q.test_result.to_string()),
            QuerySpec::EmergencyCare(q) => q.with_these_diagnoses.as_ref().map(Codelist::label),
            QuerySpec::AdmittedToHospital(q) => q.filter_key(),
            QuerySpec::VaccinationRecord(q) => Some(q.target.text().to_string()),
            QuerySpec::CodesOnDeathCertificate(q) => Some(q.codelist.label()),
            _ => None,
        };
        match qualifier {
            Some(qualifier) => format!("{}:{qualifier}", self.kind()),
            None => self.kind().to_string(),
        }
    }

    pub fn returning(&self) -> Option<Returning> {
        match self {
            QuerySpec::ClinicalEvents(q) => Some(q.returning),
            QuerySpec::TestResultInSgss(q) => Some(q.returning),
            QuerySpec::EmergencyCare(q) => Some(q.returning),
            QuerySpec::AdmittedToHospital(q) => Some(q.returning),
            QuerySpec::VaccinationRecord(q) => Some(q.returning),
            QuerySpec::DiedFromAnyCause(q) => Some(q.returning),
            QuerySpec::CodesOnDeathCertificate(q) => Some(q.returning),
            QuerySpec::RegisteredPracticeAsOf(q) => Some(q.returning),
            QuerySpec::AddressAsOf(q) => Some(q.returning),
            QuerySpec::DeregistrationDate(_) => Some(Returning::Date),
            _ => None,
        }
    }

    pub fn returns_date(&self) -> bool {
        self.returning().is_some_and(|r| r.is_date())
    }

    /// `YYYY-MM-DD` for date-returning queries
    pub fn date_format(&self) -> Option<&'static str> {
        self.returns_date().then_some(DATE_FORMAT)
    }

    pub fn period(&self) -> Option<&Period> {
        match self {
            QuerySpec::ClinicalEvents(q) => Some(&q.period),
            QuerySpec::TestResultInSgss(q) => Some(&q.period),
            QuerySpec::EmergencyCare(q) => Some(&q.period),
            QuerySpec::AdmittedToHospital(q) => Some(&q.period),
            QuerySpec::VaccinationRecord(q) => Some(&q.period),
            QuerySpec::DiedFromAnyCause(q) => Some(&q.period),
            QuerySpec::CodesOnDeathCertificate(q) => Some(&q.period),
            QuerySpec::DeregistrationDate(q) => Some(&q.period),
            _ => None,
        }
    }

    /// Match order; queries without an explicit one return the first match
    pub fn match_order(&self) -> MatchOrder {
        let find = match self {
            QuerySpec::ClinicalEvents(q) => q.find,
            QuerySpec::TestResultInSgss(q) => q.find,
            QuerySpec::EmergencyCare(q) => q.find,
            QuerySpec::AdmittedToHospital(q) => q.find,
            QuerySpec::VaccinationRecord(q) => q.find,
            _ => None,
        };
        find.unwrap_or(MatchOrder::First)
    }

    /// The date the query searches from: the lower bound for forward
    /// searches, the upper bound for backward ones
    pub fn anchor(&self) -> Option<&DateRef> {
        let period = self.period()?;
        period.on_or_after.as_ref().or(period.on_or_before.as_ref()).or(period.lower())
    }

    /// Copy of this query with its period and match order replaced
    pub fn with_anchor(&self, anchor: Anchor) -> Result<QuerySpec> {
        let Anchor { period, order } = anchor;
        let mut spec = self.clone();
        match &mut spec {
            QuerySpec::ClinicalEvents(q) => {
                q.period = period;
                q.find = Some(order);
            }
            QuerySpec::TestResultInSgss(q) => {
                q.period = period;
                q.find = Some(order);
            }
            QuerySpec::EmergencyCare(q) => {
                q.period = period;
                q.find = Some(order);
            }
            QuerySpec::AdmittedToHospital(q) => {
                q.period = period;
                q.find = Some(order);
            }
            QuerySpec::VaccinationRecord(q) => {
                q.period = period;
                q.find = Some(order);
            }
            other => {
                return Err(CohortError::definition(
                    COH0107,
                    format!("'{}' queries cannot be anchored to a search period", other.kind()),
                ));
            }
        }
        Ok(spec)
    }

    pub fn is_anchorable(&self) -> bool {
        matches!(
            self,
            QuerySpec::ClinicalEvents(_)
                | QuerySpec::TestResultInSgss(_)
                | QuerySpec::EmergencyCare(_)
                | QuerySpec::AdmittedToHospital(_)
                | QuerySpec::VaccinationRecord(_)
        )
    }

    /// Every anchor date the query mentions, excluding nested variables
    pub fn date_refs(&self) -> Vec<&DateRef> {
        if let Some(period) = self.period() {
            return period.date_refs().collect();
        }
        match self {
            QuerySpec::RegisteredAsOf(q) => vec![&q.reference_date],
            QuerySpec::AgeAsOf(q) => vec![&q.reference_date],
            QuerySpec::RegisteredPracticeAsOf(q) => vec![&q.reference_date],
            QuerySpec::AddressAsOf(q) => vec![&q.reference_date],
            QuerySpec::RegisteredWithOnePracticeBetween(q) => vec![&q.start_date, &q.end_date],
            _ => Vec::new(),
        }
    }

    pub fn return_expectations(&self) -> Option<&ReturnExpectations> {
        match self {
            QuerySpec::ClinicalEvents(q) => q.return_expectations.as_ref(),
            QuerySpec::TestResultInSgss(q) => q.return_expectations.as_ref(),
            QuerySpec::EmergencyCare(q) => q.return_expectations.as_ref(),
            QuerySpec::AdmittedToHospital(q) => q.return_expectations.as_ref(),
            QuerySpec::VaccinationRecord(q) => q.return_expectations.as_ref(),
            QuerySpec::DiedFromAnyCause(q) => q.return_expectations.as_ref(),
            QuerySpec::CodesOnDeathCertificate(q) => q.return_expectations.as_ref(),
            QuerySpec::RegisteredAsOf(q) => q.return_expectations.as_ref(),
            QuerySpec::RegisteredWithOnePracticeBetween(q) => q.return_expectations.as_ref(),
            QuerySpec::AgeAsOf(q) => q.return_expectations.as_ref(),
            QuerySpec::Sex { return_expectations } => return_expectations.as_ref(),
            QuerySpec::RegisteredPracticeAsOf(q) => q.return_expectations.as_ref(),
            QuerySpec::AddressAsOf(q) => q.return_expectations.as_ref(),
            QuerySpec::DeregistrationDate(q) => q.return_expectations.as_ref(),
            QuerySpec::Satisfying(q) => q.return_expectations.as_ref(),
        }
    }

    pub fn set_return_expectations(&mut self, expectations: Option<ReturnExpectations>) {
        let slot = match self {
            QuerySpec::ClinicalEvents(q) => &mut q.return_expectations,
            QuerySpec::TestResultInSgss(q) => &mut q.return_expectations,
            QuerySpec::EmergencyCare(q) => &mut q.return_expectations,
            QuerySpec::AdmittedToHospital(q) => &mut q.return_expectations,
            QuerySpec::VaccinationRecord(q) => &mut q.return_expectations,
            QuerySpec::DiedFromAnyCause(q) => &mut q.return_expectations,
            QuerySpec::CodesOnDeathCertificate(q) => &mut q.return_expectations,
            QuerySpec::RegisteredAsOf(q) => &mut q.return_expectations,
            QuerySpec::RegisteredWithOnePracticeBetween(q) => &mut q.return_expectations,
            QuerySpec::AgeAsOf(q) => &mut q.return_expectations,
            QuerySpec::Sex { return_expectations } => return_expectations,
            QuerySpec::RegisteredPracticeAsOf(q) => &mut q.return_expectations,
            QuerySpec::AddressAsOf(q) => &mut q.return_expectations,
            QuerySpec::DeregistrationDate(q) => &mut q.return_expectations,
            QuerySpec::Satisfying(q) => &mut q.return_expectations,
        };
        *slot = expectations;
    }

    pub fn with_return_expectations(mut self, expectations: ReturnExpectations) -> Self {
        self.set_return_expectations(Some(expectations));
        self
    }
}

impl From<ClinicalEvents> for QuerySpec {
    fn from(q: ClinicalEvents) -> Self {
        QuerySpec::ClinicalEvents(q)
    }
}

impl From<TestResultInSgss> for QuerySpec {
    fn from(q: TestResultInSgss) -> Self {
        QuerySpec::TestResultInSgss(q)
    }
}

impl From<EmergencyCare> for QuerySpec {
    fn from(q: EmergencyCare) -> Self {
        QuerySpec::EmergencyCare(q)
    }
}

impl From<AdmittedToHospital> for QuerySpec {
    fn from(q: AdmittedToHospital) -> Self {
        QuerySpec::AdmittedToHospital(q)
    }
}

impl From<VaccinationRecord> for QuerySpec {
    fn from(q: VaccinationRecord) -> Self {
        QuerySpec::VaccinationRecord(q)
    }
}

impl From<Satisfying> for QuerySpec {
    fn from(q: Satisfying) -> Self {
        QuerySpec::Satisfying(q)
    }
}
