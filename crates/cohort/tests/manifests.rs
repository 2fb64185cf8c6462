//! Study manifests on disk: expansion, validation and resolution

use cohort::StudyManifest;
use cohort_diagnostics::COH0101;
use cohort_model::{GlobalVariables, JsonSerializer, StudySerializer};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const GLOBALS: &str = r#"{"start_date": "2020-12-07", "end_date": "2021-06-01"}"#;

const MANIFEST: &str = r#"{
    "index_date": {"global": "start_date"},
    "default_expectations": {
        "date": {"earliest": "index_date", "latest": "index_date + 6 months"},
        "rate": "uniform",
        "incidence": 0.2
    },
    "population": {
        "kind": "satisfying",
        "expression": "registered AND NOT died",
        "variables": {
            "registered": {"kind": "registered_as_of", "reference_date": "index_date"},
            "died": {
                "kind": "died_from_any_cause",
                "returning": "binary_flag",
                "on_or_before": "index_date"
            }
        }
    },
    "variables": {
        "age": {"kind": "age_as_of", "reference_date": "index_date"}
    },
    "baselines": [
        {
            "name": "admitted_unplanned",
            "family": "admission",
            "admission": {
                "returning": "date_admitted",
                "with_admission_method": ["21", "22", "23", "24", "25", "2A", "2B", "2C", "2D", "28"],
                "with_patient_classification": ["1"]
            }
        }
    ],
    "chains": [
        {"name": "covid_test", "family": "covid_test", "test_result": "any", "n": 3},
        {
            "name": "admitted_unplanned",
            "family": "admission",
            "admission": {
                "returning": "date_admitted",
                "with_admission_method": ["21", "22", "23", "24", "25", "2A", "2B", "2C", "2D", "28"],
                "with_patient_classification": ["1"]
            },
            "n": 2
        },
        {
            "name": "discharged_unplanned",
            "family": "admission",
            "index_name": "admitted_unplanned",
            "admission": {
                "returning": "date_discharged",
                "with_admission_method": ["21", "22", "23", "24", "25", "2A", "2B", "2C", "2D", "28"],
                "with_patient_classification": ["1"]
            },
            "n": 2
        }
    ]
}"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn load(manifest: &Path, globals: &Path) -> cohort::StudyDefinition {
    let globals = GlobalVariables::from_path(globals).unwrap();
    StudyManifest::from_path(manifest)
        .unwrap()
        .build(Some(&globals))
        .unwrap()
}

#[test]
fn manifest_expands_in_declaration_order() {
    let dir = TempDir::new().unwrap();
    let manifest = write(&dir, "study.json", MANIFEST);
    let globals = write(&dir, "global-variables.json", GLOBALS);

    let study = load(&manifest, &globals);
    let keys: Vec<&str> = study.variables.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "age",
            "admitted_unplanned_0_date",
            "covid_test_1_date",
            "covid_test_2_date",
            "covid_test_3_date",
            "admitted_unplanned_1_date",
            "admitted_unplanned_2_date",
            "discharged_unplanned_1_date",
            "discharged_unplanned_2_date",
        ]
    );
    assert_eq!(study.index_date.to_string(), "2020-12-07");
    assert!(cohort::check_study(&study).is_empty());
}

#[test]
fn expanded_study_serializes() {
    let dir = TempDir::new().unwrap();
    let manifest = write(&dir, "study.json", MANIFEST);
    let globals = write(&dir, "global-variables.json", GLOBALS);
    let study = load(&manifest, &globals);

    insta::assert_snapshot!(
        serde_json::to_string(&study.variables["discharged_unplanned_2_date"]).unwrap(),
        @r#"{"kind":"admitted_to_hospital","returning":"date_discharged","on_or_after":"admitted_unplanned_1_date + 1 day","find":"first","with_admission_method":["21","22","23","24","25","2A","2B","2C","2D","28"],"with_patient_classification":["1"]}"#
    );

    let json = JsonSerializer::new().serialize(&study).unwrap();
    let back = JsonSerializer::new().deserialize(&json).unwrap();
    assert_eq!(back, study);
}

#[test]
fn missing_manifest_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = StudyManifest::from_path(dir.path().join("missing.json")).unwrap_err();
    assert!(err.code().is_system_error());
}

#[cfg(feature = "cli")]
mod cli {
    use super::*;
    use cohort::cli::resolve::{ResolveConfig, run};
    use cohort::cli::validate::validate_file;
    use cohort_eval::Resolution;
    use pretty_assertions::assert_eq;

    #[test]
    fn validate_reports_undefined_reference() {
        let dir = TempDir::new().unwrap();
        let broken = MANIFEST.replace(
            r#""age": {"kind": "age_as_of", "reference_date": "index_date"}"#,
            r#""age": {"kind": "age_as_of", "reference_date": "first_visit_date"}"#,
        );
        let manifest = write(&dir, "study.json", &broken);
        let globals = write(&dir, "global-variables.json", GLOBALS);

        let result = validate_file(&manifest, Some(&globals));
        assert_eq!(result.errors(), 1);
        assert_eq!(result.diagnostics[0].code, COH0101);
        assert_eq!(result.diagnostics[0].variable.as_deref(), Some("age"));
    }

    #[test]
    fn validate_without_globals_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let manifest = write(&dir, "study.json", MANIFEST);
        let result = validate_file(&manifest, None);
        assert_eq!(result.errors(), 1);
        assert!(result.diagnostics[0].code.is_system_error());
    }

    #[test]
    fn resolve_patient_events() {
        let dir = TempDir::new().unwrap();
        let manifest = write(&dir, "study.json", MANIFEST);
        let globals = write(&dir, "global-variables.json", GLOBALS);
        let events = write(
            &dir,
            "patient.json",
            r#"{
                "with_test_result_in_sgss:any": ["2020-12-10", "2020-12-10", "2021-02-01"],
                "admitted_to_hospital:21,22,23,24,25,2A,2B,2C,2D,28/1": [
                    {"date": "2020-11-20", "end_date": "2020-11-25"},
                    {"date": "2021-01-05", "end_date": "2021-01-12"}
                ]
            }"#,
        );

        let resolved = run(&ResolveConfig {
            manifest,
            events,
            config: Some(globals),
            all: false,
            output_format: None,
            output_file: None,
        })
        .unwrap();

        let d = |y, m, day| Resolution::Resolved(chrono::NaiveDate::from_ymd_opt(y, m, day).unwrap());
        assert_eq!(resolved["admitted_unplanned_0_date"], d(2020, 11, 20));
        assert_eq!(resolved["covid_test_1_date"], d(2020, 12, 10));
        assert_eq!(resolved["covid_test_2_date"], d(2021, 2, 1));
        assert_eq!(resolved["covid_test_3_date"], Resolution::NotFound);
        assert_eq!(resolved["admitted_unplanned_1_date"], d(2021, 1, 5));
        assert_eq!(resolved["discharged_unplanned_1_date"], d(2021, 1, 12));
        assert_eq!(resolved["admitted_unplanned_2_date"], Resolution::NotFound);
        assert_eq!(resolved["discharged_unplanned_2_date"], Resolution::NotFound);
        assert!(!resolved.contains_key("age"));
    }
}
