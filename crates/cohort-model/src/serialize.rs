//! Study definition serialization
//!
//! JSON is the interchange format with the extraction engine. Anchor dates
//! and population expressions are written as text.

use std::io::{Read, Write};

use crate::study::StudyDefinition;

/// Errors that can occur during serialization
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for study serializers
pub trait StudySerializer {
    /// Serialize a study to a string
    fn serialize(&self, study: &StudyDefinition) -> Result<String, SerializeError>;

    /// Serialize a study to a writer
    fn serialize_to_writer<W: Write>(
        &self,
        study: &StudyDefinition,
        writer: W,
    ) -> Result<(), SerializeError>;

    /// Deserialize a study from a string
    fn deserialize(&self, input: &str) -> Result<StudyDefinition, SerializeError>;

    /// Deserialize a study from a reader
    fn deserialize_from_reader<R: Read>(&self, reader: R) -> Result<StudyDefinition, SerializeError>;
}

/// JSON serializer for study definitions
#[derive(Debug, Default, Clone)]
pub struct JsonSerializer {
    /// Whether to produce pretty-printed output
    pub pretty: bool,
}

impl JsonSerializer {
    /// Create a new JSON serializer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new JSON serializer with pretty-printing enabled
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl StudySerializer for JsonSerializer {
    fn serialize(&self, study: &StudyDefinition) -> Result<String, SerializeError> {
        let result = if self.pretty {
            serde_json::to_string_pretty(study)?
        } else {
            serde_json::to_string(study)?
        };
        Ok(result)
    }

    fn serialize_to_writer<W: Write>(
        &self,
        study: &StudyDefinition,
        writer: W,
    ) -> Result<(), SerializeError> {
        if self.pretty {
            serde_json::to_writer_pretty(writer, study)?;
        } else {
            serde_json::to_writer(writer, study)?;
        }
        Ok(())
    }

    fn deserialize(&self, input: &str) -> Result<StudyDefinition, SerializeError> {
        Ok(serde_json::from_str(input)?)
    }

    fn deserialize_from_reader<R: Read>(&self, reader: R) -> Result<StudyDefinition, SerializeError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Serialize a study to compact JSON
pub fn to_json(study: &StudyDefinition) -> Result<String, SerializeError> {
    JsonSerializer::new().serialize(study)
}

/// Serialize a study to pretty-printed JSON
pub fn to_json_pretty(study: &StudyDefinition) -> Result<String, SerializeError> {
    JsonSerializer::pretty().serialize(study)
}

/// Deserialize a study from JSON
pub fn from_json(input: &str) -> Result<StudyDefinition, SerializeError> {
    JsonSerializer::new().deserialize(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codelist::{Codelist, CodingSystem};
    use crate::query::{Anchor, ClinicalEvents, PopulationFilter, QuerySpec, Satisfying};
    use chrono::NaiveDate;
    use cohort_ast::DateRef;
    use indexmap::IndexMap;

    fn study() -> StudyDefinition {
        let template = QuerySpec::from(ClinicalEvents::dates(Codelist::from_csv(
            "codelists/opensafely-covid-identification-in-primary-care-probable-covid-positive-test.csv",
            CodingSystem::Ctv3,
            "CTV3ID",
        )));
        StudyDefinition::builder()
            .index_date(NaiveDate::from_ymd_opt(2020, 12, 7).unwrap())
            .population(QuerySpec::Satisfying(Satisfying {
                expression: PopulationFilter::parse("covid_tpp_probable_1_date").unwrap(),
                variables: IndexMap::new(),
                return_expectations: None,
            }))
            .variable(
                "covid_tpp_probable_1_date",
                template
                    .with_anchor(Anchor::on_or_after(DateRef::index_date()))
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let original = study();
        let json = to_json(&original).unwrap();
        let restored = from_json(&json).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_json_shape() {
        let json = to_json(&study()).unwrap();
        insta::assert_snapshot!(json, @r#"{"index_date":"2020-12-07","population":{"kind":"satisfying","expression":"covid_tpp_probable_1_date"},"variables":{"covid_tpp_probable_1_date":{"kind":"with_these_clinical_events","codelist":{"source":{"type":"csv","path":"codelists/opensafely-covid-identification-in-primary-care-probable-covid-positive-test.csv","column":"CTV3ID"},"system":"ctv3"},"returning":"date","on_or_after":"index_date","find":"first","include_date_of_match":false}}}"#);
    }

    #[test]
    fn test_writer_round_trip() {
        let original = study();
        let serializer = JsonSerializer::pretty();
        let mut buffer = Vec::new();
        serializer.serialize_to_writer(&original, &mut buffer).unwrap();
        let restored = serializer.deserialize_from_reader(buffer.as_slice()).unwrap();
        assert_eq!(restored, original);
    }
}
