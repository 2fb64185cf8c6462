//! Common parser combinators for cohort expressions

use cohort_diagnostics::{COH0001, COH0002, COH0008, CohortError, Span};
use winnow::ascii::{Caseless, multispace0};
use winnow::combinator::{not, terminated};
use winnow::prelude::*;
use winnow::stream::{LocatingSlice, Stream};
use winnow::token::{literal, one_of, take_while};

/// Parser input: the expression text with byte offsets
pub type Input<'a> = LocatingSlice<&'a str>;

/// Parser result
pub type PResult<O> = ModalResult<O>;

pub fn new_input(source: &str) -> Input<'_> {
    LocatingSlice::new(source)
}

/// Skip whitespace (including newlines in multi-line population strings)
pub fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.parse_next(input).map(|_| ())
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn identifier<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (one_of(is_ident_start), take_while(0.., is_ident_char))
        .take()
        .parse_next(input)
}

/// Case-insensitive keyword that is not the prefix of a longer identifier
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<()> {
    move |input: &mut Input<'a>| {
        terminated(literal(Caseless(kw)), not(one_of(is_ident_char)))
            .void()
            .parse_next(input)
    }
}

/// Keyword surrounded by optional whitespace
pub fn padded_keyword<'a>(kw: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<()> {
    move |input: &mut Input<'a>| {
        ws.parse_next(input)?;
        keyword(kw).parse_next(input)?;
        ws.parse_next(input)
    }
}

/// Check if a word is reserved in population expressions
pub fn is_keyword(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "and" | "or" | "not")
}

/// Byte offset the input has reached inside `source`
pub fn position(source: &str, input: &Input<'_>) -> usize {
    source.len().saturating_sub(input.eof_offset())
}

/// Error for a parse that stopped at `pos`
pub fn unexpected(source: &str, pos: usize) -> CohortError {
    if pos >= source.len() {
        if source.matches('"').count() % 2 == 1 {
            return CohortError::parse_at(
                COH0008,
                "Unterminated string literal",
                source,
                Span::point(source.len()),
            );
        }
        return CohortError::parse_at(
            COH0002,
            "Unexpected end of input",
            source,
            Span::point(source.len()),
        );
    }
    let found = source[pos..].chars().next().unwrap_or(' ');
    CohortError::parse_at(
        COH0001,
        format!("Unexpected '{found}'"),
        source,
        Span::new(pos, pos + found.len_utf8()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        let mut input = new_input("covid_test_1_date + 1 day");
        assert_eq!(identifier(&mut input).unwrap(), "covid_test_1_date");
        assert_eq!(position("covid_test_1_date + 1 day", &input), 17);
    }

    #[test]
    fn test_keyword_boundary() {
        let mut input = new_input("andrew");
        assert!(keyword("and").parse_next(&mut input).is_err());

        let mut input = new_input("AND x");
        assert!(keyword("and").parse_next(&mut input).is_ok());
    }

    #[test]
    fn test_unexpected_end() {
        let err = unexpected("index_date +", 12);
        assert_eq!(err.code(), COH0002);
    }
}
