//! Serde adapters for expression-valued fields
//!
//! Anchor dates and population expressions travel as their source text and
//! are parsed on the way in, so a malformed anchor in a JSON study fails at
//! load time with the parser's message.

use cohort_ast::DateRef;
use serde::{Deserialize, Deserializer, Serializer, de};

pub(crate) mod date_ref {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(value: &DateRef, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateRef, D::Error> {
        let text = String::deserialize(deserializer)?;
        cohort_parser::parse_date_ref(&text).map_err(de::Error::custom)
    }
}

pub(crate) mod opt_date_ref {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(
        value: &Option<DateRef>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date_ref) => serializer.collect_str(date_ref),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateRef>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => cohort_parser::parse_date_ref(&text)
                .map(Some)
                .map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}
