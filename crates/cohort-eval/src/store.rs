//! Patient event sources
//!
//! An [`EventStore`] answers "which events does this query see for the
//! patient". Events are grouped by [`QuerySpec::source_key`], so every
//! query over the same table and filters sees the same events.

use chrono::NaiveDate;
use cohort_model::QuerySpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One recorded event
///
/// `end_date` is the discharge date of an admission; queries returning a
/// discharge date match on `date` and report `end_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "EventRepr")]
pub struct Event {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Event {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date,
            end_date: None,
        }
    }

    pub fn spanning(date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            date,
            end_date: Some(end_date),
        }
    }
}

/// Events are written either as a bare date or as an object
#[derive(Deserialize)]
#[serde(untagged)]
enum EventRepr {
    Date(NaiveDate),
    Full {
        date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
}

impl From<EventRepr> for Event {
    fn from(repr: EventRepr) -> Self {
        match repr {
            EventRepr::Date(date) => Event::on(date),
            EventRepr::Full { date, end_date } => Event { date, end_date },
        }
    }
}

/// Source of one patient's events
pub trait EventStore {
    /// Events visible to `query`, in any order
    fn events(&self, query: &QuerySpec) -> Vec<Event>;
}

/// Events held in memory, keyed by source key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryEventStore {
    sources: IndexMap<String, Vec<Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add events under the source `query` reads from
    pub fn insert_for(&mut self, query: &QuerySpec, events: impl IntoIterator<Item = Event>) {
        self.insert(query.source_key(), events);
    }

    pub fn insert(&mut self, key: impl Into<String>, events: impl IntoIterator<Item = Event>) {
        self.sources.entry(key.into()).or_default().extend(events);
    }

    pub fn with_events(mut self, query: &QuerySpec, events: impl IntoIterator<Item = Event>) -> Self {
        self.insert_for(query, events);
        self
    }

    pub fn source_keys(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn contains_source(&self, key: &str) -> bool {
        self.sources.contains_key(key)
    }
}

impl EventStore for InMemoryEventStore {
    fn events(&self, query: &QuerySpec) -> Vec<Event> {
        self.sources
            .get(&query.source_key())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_model::{EmergencyCare, TestResult, TestResultInSgss};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_store_by_source() {
        let sgss = QuerySpec::from(TestResultInSgss::sars_cov_2(TestResult::Positive));
        let emergency = QuerySpec::from(EmergencyCare::default());
        let store = InMemoryEventStore::new().with_events(&sgss, [Event::on(date(2021, 1, 4))]);

        assert_eq!(store.events(&sgss), vec![Event::on(date(2021, 1, 4))]);
        assert!(store.events(&emergency).is_empty());
    }

    #[test]
    fn test_deserialize_mixed_events() {
        let json = r#"{
            "attended_emergency_care": ["2021-01-02", {"date": "2021-02-10"}],
            "admitted_to_hospital:21,22/1": [{"date": "2021-01-05", "end_date": "2021-01-09"}]
        }"#;
        let store: InMemoryEventStore = serde_json::from_str(json).unwrap();
        let emergency = QuerySpec::from(EmergencyCare::default());
        assert_eq!(
            store.events(&emergency),
            vec![Event::on(date(2021, 1, 2)), Event::on(date(2021, 2, 10))]
        );
        assert!(store.contains_source("admitted_to_hospital:21,22/1"));
    }
}
