//! Resolution context for one patient

use crate::error::{EvalError, EvalResult};
use crate::resolution::Resolution;
use chrono::{Duration, Months, NaiveDate};
use cohort_ast::{DateBase, DateOffset, DateRef, DateUnit};
use indexmap::IndexMap;

/// Index date and the variables resolved so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub index_date: NaiveDate,
    resolved: IndexMap<String, Resolution>,
}

impl ResolutionContext {
    pub fn new(index_date: NaiveDate) -> Self {
        Self {
            index_date,
            resolved: IndexMap::new(),
        }
    }

    /// Context for a study whose index date is written as an anchor
    ///
    /// The index date may carry an offset but must be based on a calendar
    /// date.
    pub fn for_index_date(index_date: &DateRef) -> EvalResult<Self> {
        let DateBase::Literal(base) = index_date.base else {
            return Err(EvalError::IndexDateNotLiteral {
                expression: index_date.to_string(),
            });
        };
        let date = match &index_date.offset {
            Some(offset) => apply_offset(base, offset).ok_or_else(|| EvalError::DateOverflow {
                expression: index_date.to_string(),
            })?,
            None => base,
        };
        Ok(Self::new(date))
    }

    pub fn set(&mut self, name: impl Into<String>, resolution: Resolution) {
        self.resolved.insert(name.into(), resolution);
    }

    pub fn get(&self, name: &str) -> Option<Resolution> {
        self.resolved.get(name).copied()
    }

    /// Resolutions in the order they were recorded
    pub fn resolved(&self) -> &IndexMap<String, Resolution> {
        &self.resolved
    }

    pub fn into_resolved(self) -> IndexMap<String, Resolution> {
        self.resolved
    }

    /// The calendar date `date_ref` names
    ///
    /// `Ok(None)` when it refers to a variable that has not resolved to a
    /// date.
    pub fn evaluate(&self, date_ref: &DateRef) -> EvalResult<Option<NaiveDate>> {
        let base = match &date_ref.base {
            DateBase::Literal(date) => Some(*date),
            DateBase::IndexDate => Some(self.index_date),
            DateBase::Variable(name) => self.get(name).and_then(|r| r.date()),
        };
        let Some(base) = base else {
            return Ok(None);
        };
        match &date_ref.offset {
            Some(offset) => apply_offset(base, offset)
                .map(Some)
                .ok_or_else(|| EvalError::DateOverflow {
                    expression: date_ref.to_string(),
                }),
            None => Ok(Some(base)),
        }
    }
}

/// Shift `date` by `offset`; `None` when the result leaves the calendar
///
/// Month and year offsets clamp to the last day of a shorter month.
pub fn apply_offset(date: NaiveDate, offset: &DateOffset) -> Option<NaiveDate> {
    let amount = offset.signed_amount();
    match offset.unit {
        DateUnit::Day => date.checked_add_signed(Duration::try_days(amount)?),
        DateUnit::Month => shift_months(date, amount),
        DateUnit::Year => shift_months(date, amount.checked_mul(12)?),
    }
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}
