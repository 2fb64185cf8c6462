//! Per-variable resolution results

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of resolving one date variable for one patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "date", rename_all = "snake_case")]
pub enum Resolution {
    /// An event matched
    Resolved(NaiveDate),
    /// The search ran and found nothing
    NotFound,
    /// The search period depends on a variable that did not resolve
    NotApplicable,
}

impl Resolution {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Resolution::Resolved(date) => Some(*date),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Short status name
    pub fn status(&self) -> &'static str {
        match self {
            Resolution::Resolved(_) => "resolved",
            Resolution::NotFound => "not_found",
            Resolution::NotApplicable => "not_applicable",
        }
    }
}

impl From<Option<NaiveDate>> for Resolution {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(Resolution::NotFound, Resolution::Resolved)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Resolved(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Resolution::NotFound => f.write_str("not found"),
            Resolution::NotApplicable => f.write_str("not applicable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_form() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        assert_eq!(
            serde_json::to_string(&Resolution::Resolved(date)).unwrap(),
            r#"{"status":"resolved","date":"2021-01-04"}"#
        );
        assert_eq!(
            serde_json::to_string(&Resolution::NotApplicable).unwrap(),
            r#"{"status":"not_applicable"}"#
        );
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Resolution::from(None), Resolution::NotFound);
        assert!(!Resolution::NotFound.is_resolved());
    }
}
