//! Chain command implementation

use super::output::{self, OutputFormat};
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use cohort_chain::families::DOSE_GAP_DAYS;
use cohort_chain::{
    VariableChain, admission_chain, baseline, clinical_events_chain, covid_test_chain,
    emergency_attendance_chain, vaccination_chain,
};
use cohort_model::{
    AdmittedToHospital, Codelist, CodingSystem, MatchOrder, QuerySpec, Returning, TestResult,
    VaccineTarget,
};
use indexmap::IndexMap;
use std::path::PathBuf;

/// Event source to chain over
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Family {
    ClinicalEvents,
    CovidTest,
    EmergencyAttendance,
    Admission,
    Discharge,
    Vaccination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestResultArg {
    Any,
    Positive,
    Negative,
}

impl From<TestResultArg> for TestResult {
    fn from(arg: TestResultArg) -> Self {
        match arg {
            TestResultArg::Any => TestResult::Any,
            TestResultArg::Positive => TestResult::Positive,
            TestResultArg::Negative => TestResult::Negative,
        }
    }
}

/// Which event before the index date the baseline takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FindArg {
    First,
    Last,
}

impl From<FindArg> for MatchOrder {
    fn from(arg: FindArg) -> Self {
        match arg {
            FindArg::First => MatchOrder::First,
            FindArg::Last => MatchOrder::Last,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SystemArg {
    Ctv3,
    Icd10,
    Snomed,
    Opcs4,
    Dmd,
}

impl From<SystemArg> for CodingSystem {
    fn from(arg: SystemArg) -> Self {
        match arg {
            SystemArg::Ctv3 => CodingSystem::Ctv3,
            SystemArg::Icd10 => CodingSystem::Icd10,
            SystemArg::Snomed => CodingSystem::Snomed,
            SystemArg::Opcs4 => CodingSystem::Opcs4,
            SystemArg::Dmd => CodingSystem::Dmd,
        }
    }
}

/// Configuration for chain command
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub family: Family,
    pub name: String,
    pub n: usize,
    pub index_date: String,
    pub index_name: Option<String>,
    pub gap_days: Option<u32>,
    pub baseline: bool,
    pub baseline_find: FindArg,
    pub test_result: TestResultArg,
    pub codelists: Vec<String>,
    pub system: SystemArg,
    pub column: String,
    pub admission_methods: Vec<String>,
    pub patient_classification: Vec<String>,
    pub target_disease: Option<String>,
    pub product_name: Option<String>,
    pub output_format: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// Generate one chain
pub fn generate(config: &ChainConfig) -> Result<IndexMap<String, QuerySpec>> {
    let index_date = cohort_parser::parse_date_ref(&config.index_date)
        .with_context(|| format!("Invalid index date: {}", config.index_date))?;
    let name = config.name.as_str();
    let n = config.n;

    let chain: VariableChain = match config.family {
        Family::ClinicalEvents => {
            let system = CodingSystem::from(config.system);
            let codelists: Vec<Codelist> = config
                .codelists
                .iter()
                .map(|path| Codelist::from_csv(path.as_str(), system, config.column.as_str()))
                .collect();
            let codelist = match codelists.as_slice() {
                [] => bail!("clinical-events chains need at least one --codelist"),
                [single] => single.clone(),
                many => cohort_model::combine_codelists(many)?,
            };
            clinical_events_chain(name, codelist, index_date.clone(), n, None)?
        }
        Family::CovidTest => covid_test_chain(name, index_date.clone(), n, config.test_result.into(), None)?,
        Family::EmergencyAttendance => emergency_attendance_chain(name, index_date.clone(), n, None)?,
        Family::Admission | Family::Discharge => {
            let returning = if config.family == Family::Admission {
                Returning::DateAdmitted
            } else {
                Returning::DateDischarged
            };
            let mut template = AdmittedToHospital::returning(returning);
            if !config.admission_methods.is_empty() {
                template = template.with_admission_method(config.admission_methods.iter().cloned());
            }
            if !config.patient_classification.is_empty() {
                template = template.with_patient_classification(config.patient_classification.iter().cloned());
            }
            let index_name = config.index_name.as_deref().unwrap_or(name);
            admission_chain(name, index_name, index_date.clone(), n, template, None)?
        }
        Family::Vaccination => {
            let target = match (&config.target_disease, &config.product_name) {
                (Some(disease), None) => VaccineTarget::TargetDiseaseMatches(disease.clone()),
                (None, Some(product)) => VaccineTarget::ProductNameMatches(product.clone()),
                _ => bail!("vaccination chains need exactly one of --target-disease or --product-name"),
            };
            let gap = config.gap_days.unwrap_or(DOSE_GAP_DAYS);
            vaccination_chain(name, target, index_date.clone(), n, gap, None)?
        }
    };
    log::info!("Generated {} occurrences of {}", chain.len(), chain.name());

    let mut variables = IndexMap::with_capacity(chain.len() + 1);
    if config.baseline {
        let template = chain
            .get(1)
            .context("Chain has no first occurrence")?;
        let (key, spec) = baseline(name, template, index_date, config.baseline_find.into())?;
        variables.insert(key, spec);
    }
    variables.extend(chain);
    Ok(variables)
}

/// Generate a chain and print it
pub async fn chain(config: ChainConfig) -> Result<()> {
    let variables = generate(&config)?;
    let format: OutputFormat = config.output_format.as_deref().unwrap_or("pretty").parse()?;
    let content = match format {
        OutputFormat::Json => output::format_json(&variables, false)?,
        OutputFormat::JsonPretty => output::format_json(&variables, true)?,
        OutputFormat::Table => output::variables_table(&variables),
    };
    output::write_output(&content, config.output_file.as_deref())
}
