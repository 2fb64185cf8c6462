//! Population expression parser using precedence climbing
//!
//! Precedence, lowest first: `OR`, `AND`, `NOT`, comparison. Keywords are
//! case-insensitive; study definitions write them in upper case.

use crate::combinators::{
    Input, PResult, identifier, is_keyword, new_input, padded_keyword, position, unexpected, ws,
};
use cohort_ast::{CompareOp, Identifier, PopulationExpr, PopulationLiteral};
use cohort_diagnostics::{COH0007, CohortError, Result, Span};
use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, delimited, opt};
use winnow::prelude::*;
use winnow::token::take_while;

/// Parse a population expression
pub fn parse_population(source: &str) -> Result<PopulationExpr> {
    let mut input = new_input(source);

    let expr = or_expression
        .parse_next(&mut input)
        .map_err(|_| unexpected(source, position(source, &input)))?;
    ws.parse_next(&mut input)
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
    Ok(expr)
}

fn or_expression(input: &mut Input<'_>) -> PResult<PopulationExpr> {
    let mut left = and_expression(input)?;

    while opt(padded_keyword("or")).parse_next(input)?.is_some() {
        let right = cut_err(and_expression).parse_next(input)?;
        left = PopulationExpr::Or(Box::new(left), Box::new(right));
    }

    Ok(left)
}

fn and_expression(input: &mut Input<'_>) -> PResult<PopulationExpr> {
    let mut left = not_expression(input)?;

    while opt(padded_keyword("and")).parse_next(input)?.is_some() {
        let right = cut_err(not_expression).parse_next(input)?;
        left = PopulationExpr::And(Box::new(left), Box::new(right));
    }

    Ok(left)
}

fn not_expression(input: &mut Input<'_>) -> PResult<PopulationExpr> {
    if opt(padded_keyword("not")).parse_next(input)?.is_some() {
        let inner = cut_err(not_expression).parse_next(input)?;
        return Ok(PopulationExpr::Not(Box::new(inner)));
    }
    comparison_expression(input)
}

fn comparison_expression(input: &mut Input<'_>) -> PResult<PopulationExpr> {
    let left = primary(input)?;
    ws.parse_next(input)?;

    let op = opt(alt((
        ">=".value(CompareOp::GreaterOrEqual),
        "<=".value(CompareOp::LessOrEqual),
        "!=".value(CompareOp::NotEqual),
        "<>".value(CompareOp::NotEqual),
        "==".value(CompareOp::Equal),
        "=".value(CompareOp::Equal),
        "<".value(CompareOp::Less),
        ">".value(CompareOp::Greater),
    )))
    .parse_next(input)?;

    match op {
        Some(op) => {
            let right = cut_err(primary).parse_next(input)?;
            Ok(PopulationExpr::Compare {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        }
        None => Ok(left),
    }
}

fn primary(input: &mut Input<'_>) -> PResult<PopulationExpr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', or_expression, (ws, cut_err(')'))),
        number,
        string_literal,
        variable,
    ))
    .parse_next(input)
}

fn variable(input: &mut Input<'_>) -> PResult<PopulationExpr> {
    let (name, range) = identifier
        .verify(|name: &str| !is_keyword(name))
        .with_span()
        .parse_next(input)?;
    Ok(PopulationExpr::Variable(Identifier::new(name, range.into())))
}

fn number(input: &mut Input<'_>) -> PResult<PopulationExpr> {
    let text = (opt('-'), digit1, opt(('.', digit1)))
        .take()
        .parse_next(input)?;
    let literal = if text.contains('.') {
        PopulationLiteral::Decimal(text.parse().unwrap_or_default())
    } else {
        PopulationLiteral::Integer(text.parse().unwrap_or(0))
    };
    Ok(PopulationExpr::Literal(literal))
}

fn string_literal(input: &mut Input<'_>) -> PResult<PopulationExpr> {
    let text = delimited('"', take_while(0.., |c: char| c != '"'), cut_err('"'))
        .parse_next(input)?;
    Ok(PopulationExpr::Literal(PopulationLiteral::String(text.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_diagnostics::{COH0001, COH0008};

    fn names(expr: &PopulationExpr) -> Vec<String> {
        expr.identifiers().iter().map(|i| i.name.clone()).collect()
    }

    #[test]
    fn test_over80s_population() {
        let source = r#"
        registered
        AND
        (age >= 80 AND age < 110)
        AND
        NOT has_died
        "#;
        let expr = parse_population(source).unwrap();
        assert_eq!(names(&expr), vec!["registered", "age", "has_died"]);
        assert_eq!(
            expr.to_string(),
            "((registered AND (age >= 80 AND age < 110)) AND NOT has_died)"
        );
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let expr = parse_population(r#"a AND sex = "M" OR sex = "F""#).unwrap();
        assert!(matches!(expr, PopulationExpr::Or(_, _)));
    }

    #[test]
    fn test_lowercase_keywords() {
        let expr = parse_population("registered and not has_died").unwrap();
        assert_eq!(names(&expr), vec!["registered", "has_died"]);
    }

    #[test]
    fn test_identifier_spans() {
        let source = "registered AND NOT has_died";
        let expr = parse_population(source).unwrap();
        let ids = expr.identifiers();
        assert_eq!(ids[1].span, Span::new(19, 27));
        assert_eq!(&source[19..27], "has_died");
    }

    #[test]
    fn test_decimal_literal() {
        let expr = parse_population("bmi_value >= 30.5").unwrap();
        match expr {
            PopulationExpr::Compare { right, .. } => {
                assert_eq!(*right, PopulationExpr::Literal(PopulationLiteral::Decimal(30.5)));
            }
            other => panic!("Expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse_population(r#"sex = "M"#).unwrap_err();
        assert_eq!(err.code(), COH0008);
    }

    #[test]
    fn test_dangling_and() {
        let err = parse_population("registered AND").unwrap_err();
        assert!(err.code().is_parse_error());
    }

    #[test]
    fn test_keyword_is_not_variable() {
        let err = parse_population("AND registered").unwrap_err();
        assert_eq!(err.code(), COH0001);
    }

    #[test]
    fn test_trailing_input() {
        let err = parse_population("registered has_died").unwrap_err();
        assert_eq!(err.code(), COH0007);
    }
}
