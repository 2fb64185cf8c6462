//! Anchor date parser
//!
//! Grammar:
//!
//! ```text
//! date_ref := base [ ("+" | "-") integer unit ]
//! base     := YYYY-MM-DD | identifier
//! unit     := day | days | month | months | year | years
//! ```
//!
//! Whitespace around the sign is optional, so the loose spellings found in
//! hand-written study definitions (`index_date -1 day`) are accepted.

use crate::combinators::{Input, PResult, identifier, new_input, position, unexpected, ws};
use chrono::NaiveDate;
use cohort_ast::{DateOffset, DateRef, DateUnit, OffsetSign};
use cohort_diagnostics::{COH0004, COH0005, COH0006, COH0007, CohortError, Result, Span};
use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

/// Base before semantic checks
enum RawBase<'a> {
    Date {
        year: &'a str,
        month: &'a str,
        day: &'a str,
        span: Span,
    },
    Name(&'a str),
}

struct RawOffset<'a> {
    sign: char,
    amount: &'a str,
    amount_span: Span,
    unit: &'a str,
    unit_span: Span,
}

struct RawDateRef<'a> {
    base: RawBase<'a>,
    offset: Option<RawOffset<'a>>,
}

/// Parse an anchor date expression
pub fn parse_date_ref(source: &str) -> Result<DateRef> {
    let mut input = new_input(source);

    let raw = raw_date_ref
        .parse_next(&mut input)
        .map_err(|_| unexpected(source, position(source, &input)))?;

    let pos = position(source, &input);
    if pos < source.len() {
        return Err(CohortError::parse_at(
            COH0007,
            format!("Unexpected trailing input '{}'", source[pos..].trim_end()),
            source,
            Span::new(pos, source.len()),
        ));
    }

    lower(raw, source)
}

fn raw_date_ref<'a>(input: &mut Input<'a>) -> PResult<RawDateRef<'a>> {
    ws.parse_next(input)?;
    let base = alt((date_literal, identifier.map(RawBase::Name))).parse_next(input)?;
    ws.parse_next(input)?;
    let offset = opt(offset_clause).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(RawDateRef { base, offset })
}

fn date_literal<'a>(input: &mut Input<'a>) -> PResult<RawBase<'a>> {
    let ((year, _, month, _, day), range) = (
        take_while(4, |c: char| c.is_ascii_digit()),
        '-',
        take_while(2, |c: char| c.is_ascii_digit()),
        '-',
        take_while(2, |c: char| c.is_ascii_digit()),
    )
        .with_span()
        .parse_next(input)?;
    Ok(RawBase::Date {
        year,
        month,
        day,
        span: range.into(),
    })
}

/// Everything after the sign is committed: a dangling `+` is an error, not
/// trailing input.
fn offset_clause<'a>(input: &mut Input<'a>) -> PResult<RawOffset<'a>> {
    let sign = one_of(['+', '-']).parse_next(input)?;
    ws.parse_next(input)?;
    let (amount, amount_range) = cut_err(digit1.with_span()).parse_next(input)?;
    ws.parse_next(input)?;
    let (unit, unit_range) = cut_err(identifier.with_span()).parse_next(input)?;
    Ok(RawOffset {
        sign,
        amount,
        amount_span: amount_range.into(),
        unit,
        unit_span: unit_range.into(),
    })
}

fn lower(raw: RawDateRef<'_>, source: &str) -> Result<DateRef> {
    let mut date_ref = match raw.base {
        RawBase::Date {
            year,
            month,
            day,
            span,
        } => {
            let date = NaiveDate::from_ymd_opt(
                year.parse().unwrap_or(0),
                month.parse().unwrap_or(0),
                day.parse().unwrap_or(0),
            )
            .ok_or_else(|| {
                CohortError::parse_at(
                    COH0004,
                    format!("'{year}-{month}-{day}' is not a valid calendar date"),
                    source,
                    span,
                )
            })?;
            DateRef::literal(date)
        }
        RawBase::Name(name) => DateRef::variable(name),
    };

    if let Some(offset) = raw.offset {
        let amount: u32 = offset.amount.parse().map_err(|_| {
            CohortError::parse_at(
                COH0006,
                format!("Offset '{}' is out of range", offset.amount),
                source,
                offset.amount_span,
            )
        })?;
        let unit = parse_unit(offset.unit).ok_or_else(|| {
            CohortError::parse_at(
                COH0005,
                format!("Unknown date unit '{}'", offset.unit),
                source,
                offset.unit_span,
            )
        })?;
        let sign = if offset.sign == '+' {
            OffsetSign::Plus
        } else {
            OffsetSign::Minus
        };
        date_ref = date_ref.with_offset(DateOffset { sign, amount, unit });
    }

    Ok(date_ref)
}

fn parse_unit(word: &str) -> Option<DateUnit> {
    match word.to_ascii_lowercase().as_str() {
        "day" | "days" => Some(DateUnit::Day),
        "month" | "months" => Some(DateUnit::Month),
        "year" | "years" => Some(DateUnit::Year),
        _ => None,
    }
}
