//! Population expression trees

use crate::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
        }
    }
}

/// Literal operand of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PopulationLiteral {
    Integer(i64),
    Decimal(f64),
    String(String),
}

impl fmt::Display for PopulationLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationLiteral::Integer(i) => write!(f, "{i}"),
            PopulationLiteral::Decimal(d) => write!(f, "{d}"),
            PopulationLiteral::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A `patients.satisfying` expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PopulationExpr {
    /// Bare variable, true when the variable is set for the patient
    Variable(Identifier),
    Literal(PopulationLiteral),
    Not(Box<PopulationExpr>),
    And(Box<PopulationExpr>, Box<PopulationExpr>),
    Or(Box<PopulationExpr>, Box<PopulationExpr>),
    Compare {
        left: Box<PopulationExpr>,
        op: CompareOp,
        right: Box<PopulationExpr>,
    },
}

impl PopulationExpr {
    /// Variable names referenced by the expression, in first-seen order
    pub fn identifiers(&self) -> Vec<&Identifier> {
        let mut out: Vec<&Identifier> = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a Identifier>) {
        match self {
            PopulationExpr::Variable(id) => {
                if !out.iter().any(|seen| seen.name == id.name) {
                    out.push(id);
                }
            }
            PopulationExpr::Literal(_) => {}
            PopulationExpr::Not(inner) => inner.collect_identifiers(out),
            PopulationExpr::And(l, r) | PopulationExpr::Or(l, r) => {
                l.collect_identifiers(out);
                r.collect_identifiers(out);
            }
            PopulationExpr::Compare { left, right, .. } => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
        }
    }
}

impl fmt::Display for PopulationExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationExpr::Variable(id) => f.write_str(&id.name),
            PopulationExpr::Literal(lit) => write!(f, "{lit}"),
            PopulationExpr::Not(inner) => write!(f, "NOT {inner}"),
            PopulationExpr::And(l, r) => write!(f, "({l} AND {r})"),
            PopulationExpr::Or(l, r) => write!(f, "({l} OR {r})"),
            PopulationExpr::Compare { left, op, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
        }
    }
}
