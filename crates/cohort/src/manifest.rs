//! Study manifests
//!
//! A manifest describes a study the way a study script assembles one:
//! explicit variables, `_0_date` baselines, and chains declared by family
//! and occurrence count. [`StudyManifest::build`] expands it into a
//! [`StudyDefinition`].
//!
//! ```json
//! {
//!   "index_date": {"global": "start_date"},
//!   "population": {"kind": "satisfying", "expression": "registered", "variables": {...}},
//!   "chains": [
//!     {"name": "covid_test", "family": "covid_test", "test_result": "any", "n": 10}
//!   ]
//! }
//! ```

use cohort_ast::DateRef;
use cohort_chain::families::DOSE_GAP_DAYS;
use cohort_chain::{ChainBuilder, Direction, VariableChain, baseline};
use cohort_diagnostics::{COH0401, COH0403, COH0404, CohortError, Result};
use cohort_model::{
    AdmittedToHospital, ClinicalEvents, Codelist, EmergencyCare, GlobalVariables, QuerySpec,
    MatchOrder, ReturnExpectations, StudyDefinition, TestResult, TestResultInSgss,
    VaccinationRecord, VaccineTarget, combine_codelists,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the study's index date comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexDateSource {
    /// A key of the global variables file
    Global { global: String },
    /// An anchor expression, normally a calendar date
    Expression(String),
}

impl IndexDateSource {
    pub fn resolve(&self, globals: Option<&GlobalVariables>) -> Result<DateRef> {
        match self {
            IndexDateSource::Expression(text) => cohort_parser::parse_date_ref(text),
            IndexDateSource::Global { global } => {
                let globals = globals.ok_or_else(|| {
                    CohortError::config(
                        COH0403,
                        format!("Index date refers to global variable '{global}' but no global variables were given"),
                    )
                })?;
                globals.date(global).map(DateRef::literal)
            }
        }
    }
}

/// Event source a chain or baseline repeats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ChainFamily {
    /// Clinical events from one or more codelists of the same system
    ClinicalEvents { codelists: Vec<Codelist> },
    CovidTest { test_result: TestResult },
    EmergencyAttendance,
    /// Admissions or discharges; discharge chains name their admission
    /// chain as `index_name`
    Admission {
        admission: AdmittedToHospital,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index_name: Option<String>,
    },
    Vaccination {
        target: VaccineTarget,
        #[serde(default = "default_dose_gap")]
        gap_days: u32,
    },
    /// Any anchorable query
    Custom {
        template: QuerySpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index_name: Option<String>,
    },
}

fn default_dose_gap() -> u32 {
    DOSE_GAP_DAYS
}

impl ChainFamily {
    /// The query each occurrence repeats
    pub fn template(&self) -> Result<QuerySpec> {
        let template = match self {
            ChainFamily::ClinicalEvents { codelists } => {
                let codelist = match codelists.as_slice() {
                    [single] => single.clone(),
                    many => combine_codelists(many)?,
                };
                QuerySpec::from(ClinicalEvents::dates(codelist))
            }
            ChainFamily::CovidTest { test_result } => {
                QuerySpec::from(TestResultInSgss::sars_cov_2(*test_result))
            }
            ChainFamily::EmergencyAttendance => QuerySpec::from(EmergencyCare::default()),
            ChainFamily::Admission { admission, .. } => QuerySpec::from(admission.clone()),
            ChainFamily::Vaccination { target, .. } => {
                QuerySpec::from(VaccinationRecord::dates(target.clone()))
            }
            ChainFamily::Custom { template, .. } => template.clone(),
        };
        Ok(template)
    }

    pub fn index_name(&self) -> Option<&str> {
        match self {
            ChainFamily::Admission { index_name, .. } | ChainFamily::Custom { index_name, .. } => {
                index_name.as_deref()
            }
            _ => None,
        }
    }

    pub fn gap_days(&self) -> u32 {
        match self {
            ChainFamily::Vaccination { gap_days, .. } => *gap_days,
            _ => 1,
        }
    }

    /// Fields the `family` tag brings with it; `None` for an unknown tag
    fn fields(family: &str) -> Option<&'static [&'static str]> {
        let fields: &'static [&'static str] = match family {
            "clinical_events" => &["codelists"],
            "covid_test" => &["test_result"],
            "emergency_attendance" => &[],
            "admission" => &["admission", "index_name"],
            "vaccination" => &["target", "gap_days"],
            "custom" => &["template", "index_name"],
            _ => return None,
        };
        Some(fields)
    }
}

const CHAIN_FIELDS: &[&str] = &["name", "family", "n", "index_date", "direction", "return_expectations"];
const BASELINE_FIELDS: &[&str] = &["name", "family", "find", "return_expectations"];

/// Reject keys neither the entry nor its family declares
///
/// The family fields are flattened into each entry, which keeps serde from
/// rejecting unknown keys itself.
fn check_fields(section: &str, entries: Option<&serde_json::Value>, common: &[&str]) -> Result<()> {
    let Some(entries) = entries.and_then(serde_json::Value::as_array) else {
        return Ok(());
    };
    for entry in entries {
        let Some(object) = entry.as_object() else {
            continue;
        };
        let family = object.get("family").and_then(serde_json::Value::as_str);
        let Some(family_fields) = family.and_then(ChainFamily::fields) else {
            continue;
        };
        if let Some(unknown) = object
            .keys()
            .find(|key| !common.contains(&key.as_str()) && !family_fields.contains(&key.as_str()))
        {
            let name = object.get("name").and_then(serde_json::Value::as_str).unwrap_or("?");
            return Err(CohortError::config(
                COH0404,
                format!("Invalid study manifest: unknown field '{unknown}' in {section} '{name}'"),
            ));
        }
    }
    Ok(())
}

/// A chain of `n` occurrences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub name: String,
    #[serde(flatten)]
    pub family: ChainFamily,
    pub n: usize,
    /// Anchor of the first occurrence; the study index date when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_date: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

impl ChainSpec {
    pub fn build(&self, study_index_date: &DateRef) -> Result<VariableChain> {
        let index_date = match &self.index_date {
            Some(text) => cohort_parser::parse_date_ref(text)?,
            None => study_index_date.clone(),
        };
        let mut template = self.family.template()?;
        if let Some(expectations) = &self.return_expectations {
            template.set_return_expectations(Some(expectations.clone()));
        }
        let mut builder = ChainBuilder::new(&self.name, template)
            .index_date(index_date)
            .occurrences(self.n)
            .direction(self.direction)
            .gap_days(self.family.gap_days());
        if let Some(index_name) = self.family.index_name() {
            builder = builder.index_name(index_name);
        }
        builder.build()
    }
}

/// The `{name}_0_date` variable of a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSpec {
    pub name: String,
    #[serde(flatten)]
    pub family: ChainFamily,
    /// Which event before the index date counts
    #[serde(default)]
    pub find: MatchOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_expectations: Option<ReturnExpectations>,
}

impl BaselineSpec {
    pub fn build(&self, study_index_date: &DateRef) -> Result<(String, QuerySpec)> {
        let mut template = self.family.template()?;
        if let Some(expectations) = &self.return_expectations {
            template.set_return_expectations(Some(expectations.clone()));
        }
        baseline(&self.name, &template, study_index_date.clone(), self.find)
    }
}

/// A study described by its variables and chains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyManifest {
    pub index_date: IndexDateSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expectations: Option<ReturnExpectations>,
    pub population: QuerySpec,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, QuerySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub baselines: Vec<BaselineSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<ChainSpec>,
}

impl StudyManifest {
    pub fn from_json(input: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| CohortError::config(COH0404, format!("Invalid study manifest: {e}")))?;
        check_fields("chain", value.get("chains"), CHAIN_FIELDS)?;
        check_fields("baseline", value.get("baselines"), BASELINE_FIELDS)?;
        serde_json::from_value(value)
            .map_err(|e| CohortError::config(COH0404, format!("Invalid study manifest: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CohortError::config(COH0401, format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content).map_err(|e| e.with_context(path.display().to_string()))
    }

    /// Expand into a study definition
    ///
    /// Variables come first, then baselines, then chains, each in the order
    /// declared. Every chain and baseline is built before errors are
    /// reported, so one call lists all of them.
    pub fn build(&self, globals: Option<&GlobalVariables>) -> Result<StudyDefinition> {
        let index_date = self.index_date.resolve(globals)?;
        let mut errors = Vec::new();

        let mut builder = StudyDefinition::builder()
            .index_date(index_date.clone())
            .population(self.population.clone())
            .extend(self.variables.clone());
        if let Some(defaults) = &self.default_expectations {
            builder = builder.default_expectations(defaults.clone());
        }

        for spec in &self.baselines {
            match spec.build(&index_date) {
                Ok((name, query)) => builder = builder.variable(name, query),
                Err(e) => errors.push(e.with_context(format!("baseline '{}'", spec.name))),
            }
        }
        for spec in &self.chains {
            match spec.build(&index_date) {
                Ok(chain) => {
                    log::debug!("Chain '{}' expanded to {} variables", spec.name, chain.len());
                    builder = builder.extend(chain);
                }
                Err(e) => errors.push(e.with_context(format!("chain '{}'", spec.name))),
            }
        }

        match builder.build() {
            Ok(study) if errors.is_empty() => Ok(study),
            Ok(_) => Err(combine(errors)),
            Err(e) => {
                errors.push(e);
                Err(combine(errors))
            }
        }
    }
}

fn combine(mut errors: Vec<CohortError>) -> CohortError {
    if errors.len() == 1 {
        errors.remove(0)
    } else {
        CohortError::Multiple(errors)
    }
}
