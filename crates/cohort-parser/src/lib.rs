//! Cohort expression parsers using winnow
//!
//! Two entry points:
//!
//! - [`parse_date_ref`] for anchor dates such as `index_date - 1 day`
//! - [`parse_population`] for `satisfying` expressions such as
//!   `registered AND (age >= 80 AND age < 110) AND NOT has_died`
//!
//! Both fail fast on the first error and report it with a source location.

mod combinators;
mod date_ref;
mod population;

pub use date_ref::parse_date_ref;
pub use population::parse_population;
