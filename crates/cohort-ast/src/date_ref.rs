//! Anchor date expressions
//!
//! A [`DateRef`] names the day a query's search period starts or ends. Its
//! external form is the one the extraction engine evaluates:
//! `<date-or-variable> [(+|-) <integer> <unit>]`.

use crate::INDEX_DATE;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base of an anchor expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateBase {
    /// Fixed calendar date
    Literal(NaiveDate),
    /// The study's index date
    IndexDate,
    /// The resolved date of another variable
    Variable(String),
}

/// Direction of an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OffsetSign {
    Plus,
    Minus,
}

/// Calendar unit of an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateUnit {
    Day,
    Month,
    Year,
}

impl DateUnit {
    pub fn singular(&self) -> &'static str {
        match self {
            DateUnit::Day => "day",
            DateUnit::Month => "month",
            DateUnit::Year => "year",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            DateUnit::Day => "days",
            DateUnit::Month => "months",
            DateUnit::Year => "years",
        }
    }
}

/// `± amount unit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateOffset {
    pub sign: OffsetSign,
    pub amount: u32,
    pub unit: DateUnit,
}

impl DateOffset {
    pub const fn days(sign: OffsetSign, amount: u32) -> Self {
        Self {
            sign,
            amount,
            unit: DateUnit::Day,
        }
    }

    /// Signed amount (negative for `-`)
    pub fn signed_amount(&self) -> i64 {
        match self.sign {
            OffsetSign::Plus => i64::from(self.amount),
            OffsetSign::Minus => -i64::from(self.amount),
        }
    }
}

impl fmt::Display for DateOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.sign {
            OffsetSign::Plus => '+',
            OffsetSign::Minus => '-',
        };
        let unit = if self.amount == 1 {
            self.unit.singular()
        } else {
            self.unit.plural()
        };
        write!(f, "{sign} {} {unit}", self.amount)
    }
}

/// An anchor date: a base optionally shifted by a calendar offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRef {
    pub base: DateBase,
    pub offset: Option<DateOffset>,
}

impl DateRef {
    pub fn literal(date: NaiveDate) -> Self {
        Self {
            base: DateBase::Literal(date),
            offset: None,
        }
    }

    pub fn index_date() -> Self {
        Self {
            base: DateBase::IndexDate,
            offset: None,
        }
    }

    /// Reference to another variable; `index_date` maps to [`DateBase::IndexDate`]
    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        let base = if name == INDEX_DATE {
            DateBase::IndexDate
        } else {
            DateBase::Variable(name)
        };
        Self { base, offset: None }
    }

    pub fn with_offset(mut self, offset: DateOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn plus_days(self, days: u32) -> Self {
        self.with_offset(DateOffset::days(OffsetSign::Plus, days))
    }

    pub fn minus_days(self, days: u32) -> Self {
        self.with_offset(DateOffset::days(OffsetSign::Minus, days))
    }

    /// The variable this anchor depends on, if any
    pub fn referenced_variable(&self) -> Option<&str> {
        match &self.base {
            DateBase::Variable(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.base, DateBase::Literal(_))
    }
}

impl fmt::Display for DateBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBase::Literal(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateBase::IndexDate => f.write_str(INDEX_DATE),
            DateBase::Variable(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for DateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if let Some(offset) = &self.offset {
            write!(f, " {offset}")?;
        }
        Ok(())
    }
}

impl From<NaiveDate> for DateRef {
    fn from(date: NaiveDate) -> Self {
        Self::literal(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(DateRef::literal(date(2020, 12, 7)).to_string(), "2020-12-07");
        assert_eq!(DateRef::index_date().to_string(), "index_date");
        assert_eq!(
            DateRef::variable("covid_test_1_date").plus_days(1).to_string(),
            "covid_test_1_date + 1 day"
        );
        assert_eq!(
            DateRef::variable("covid_vax_pfizer_1_date").plus_days(15).to_string(),
            "covid_vax_pfizer_1_date + 15 days"
        );
        assert_eq!(DateRef::index_date().minus_days(1).to_string(), "index_date - 1 day");
    }

    #[test]
    fn test_index_date_variable_is_index() {
        assert_eq!(DateRef::variable("index_date"), DateRef::index_date());
        assert_eq!(DateRef::variable("index_date").referenced_variable(), None);
    }

    #[test]
    fn test_referenced_variable() {
        let anchor = DateRef::variable("admitted_unplanned_2_date").plus_days(1);
        assert_eq!(anchor.referenced_variable(), Some("admitted_unplanned_2_date"));
        assert_eq!(DateRef::literal(date(2021, 1, 1)).referenced_variable(), None);
    }

    #[test]
    fn test_signed_amount() {
        let offset = DateOffset {
            sign: OffsetSign::Minus,
            amount: 2,
            unit: DateUnit::Year,
        };
        assert_eq!(offset.signed_amount(), -2);
        assert_eq!(offset.to_string(), "- 2 years");
    }
}
