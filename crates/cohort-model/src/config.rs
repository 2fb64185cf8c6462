//! Global study variables
//!
//! Study scripts share their dates through a flat JSON object,
//! conventionally `analysis/global-variables.json`:
//!
//! ```json
//! { "start_date": "2020-12-07", "start_date_over80s": "2020-12-08", "end_date": "2021-06-01" }
//! ```

use chrono::NaiveDate;
use cohort_diagnostics::{COH0401, COH0402, COH0403, COH0404, CohortError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalVariables {
    values: IndexMap<String, Value>,
}

impl GlobalVariables {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| {
            CohortError::config(COH0404, format!("Global variables are not a JSON object: {e}"))
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CohortError::config(COH0401, format!("Failed to read {}: {e}", path.display()))
        })?;
        log::debug!("Loaded global variables from {}", path.display());
        Self::from_json(&content).map_err(|e| e.with_context(path.display().to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value of `key`
    pub fn string(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(CohortError::config(
                COH0402,
                format!("Global variable '{key}' should be a string, found {other}"),
            )),
            None => Err(CohortError::config(
                COH0403,
                format!("Global variable '{key}' is not defined"),
            )),
        }
    }

    /// `YYYY-MM-DD` date value of `key`
    pub fn date(&self, key: &str) -> Result<NaiveDate> {
        let text = self.string(key)?;
        NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
            CohortError::config(
                COH0402,
                format!("Global variable '{key}' is not a YYYY-MM-DD date: '{text}' ({e})"),
            )
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
