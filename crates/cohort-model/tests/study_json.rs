//! Loading study definitions written by hand as JSON

use cohort_ast::DateRef;
use cohort_model::serialize::from_json;
use cohort_model::{JsonSerializer, QuerySpec, Rate, Returning, StudySerializer};
use pretty_assertions::assert_eq;

const OVER80S: &str = r#"{
    "index_date": "2020-12-08",
    "default_expectations": {
        "date": {"earliest": "1970-01-01", "latest": "2021-06-01"},
        "rate": "uniform",
        "incidence": 0.2
    },
    "population": {
        "kind": "satisfying",
        "expression": "registered AND (age >= 80 AND age < 110) AND NOT has_died",
        "variables": {
            "registered": {"kind": "registered_as_of", "reference_date": "index_date"},
            "has_died": {
                "kind": "died_from_any_cause",
                "returning": "binary_flag",
                "on_or_before": "index_date - 1 day"
            }
        }
    },
    "variables": {
        "age": {
            "kind": "age_as_of",
            "reference_date": "2020-03-31",
            "return_expectations": {"rate": "universal", "int": {"distribution": "population_ages"}, "incidence": 1}
        },
        "sex": {
            "kind": "sex",
            "return_expectations": {"rate": "universal", "category": {"ratios": {"M": 0.49, "F": 0.51}}}
        },
        "has_follow_up_previous_year": {
            "kind": "registered_with_one_practice_between",
            "start_date": "index_date - 1 year",
            "end_date": "index_date - 1 day",
            "return_expectations": {"incidence": 0.99}
        },
        "admitted_unplanned_0_date": {
            "kind": "admitted_to_hospital",
            "returning": "date_admitted",
            "on_or_before": "index_date - 1 day",
            "with_admission_method": ["21", "22", "23", "24", "25", "2A", "2B", "2C", "2D", "28"],
            "with_patient_classification": ["1"],
            "find": "first"
        }
    }
}"#;

#[test]
fn test_load_over80s_study() {
    let study = from_json(OVER80S).unwrap();

    assert_eq!(study.index_date.to_string(), "2020-12-08");
    assert_eq!(
        study.variables.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["age", "sex", "has_follow_up_previous_year", "admitted_unplanned_0_date"]
    );
    assert_eq!(
        study.default_expectations.as_ref().and_then(|d| d.rate),
        Some(Rate::Uniform)
    );

    match &study.population {
        QuerySpec::Satisfying(population) => {
            let names: Vec<_> = population
                .expression
                .expr
                .identifiers()
                .iter()
                .map(|id| id.name.clone())
                .collect();
            assert_eq!(names, vec!["registered", "age", "has_died"]);
            assert_eq!(population.variables.len(), 2);
        }
        other => panic!("Expected satisfying population, got {}", other.kind()),
    }

    study.validate_expectations().unwrap();
}

#[test]
fn test_baseline_admission_is_backward() {
    let study = from_json(OVER80S).unwrap();
    let admitted = study.variable("admitted_unplanned_0_date").unwrap();
    assert_eq!(admitted.returning(), Some(Returning::DateAdmitted));
    assert_eq!(admitted.anchor(), Some(&DateRef::index_date().minus_days(1)));
    assert_eq!(admitted.date_format(), Some("YYYY-MM-DD"));
}

#[test]
fn test_round_trip_preserves_text() {
    let study = from_json(OVER80S).unwrap();
    let serializer = JsonSerializer::pretty();
    let json = serializer.serialize(&study).unwrap();
    assert!(json.contains(r#""start_date": "index_date - 1 year""#));
    assert_eq!(serializer.deserialize(&json).unwrap(), study);
}

#[test]
fn test_unknown_kind_rejected() {
    let json = OVER80S.replace("\"age_as_of\"", "\"age_at\"");
    assert!(from_json(&json).is_err());
}
