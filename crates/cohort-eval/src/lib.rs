//! Reference resolution for cohort study definitions
//!
//! The extraction engine that runs study definitions against patient
//! records lives elsewhere. This crate gives the definitions a reference
//! reading so chains can be checked before a study is submitted:
//!
//! - [`DependencyGraph`]: which variables an anchor or population
//!   expression refers to, undefined references, cycles and a resolution
//!   order
//! - [`Resolver`]: resolves every date-returning variable for one patient
//!   against an [`EventStore`], producing a [`Resolution`] per variable
//!
//! # Resolution model
//!
//! A variable resolves to one of three states:
//!
//! - `Resolved(date)`: an event matched
//! - `NotFound`: the search period was known but held no event
//! - `NotApplicable`: the search period depends on a variable that did not
//!   resolve, so the query was never run
//!
//! A chain therefore reads `Resolved, Resolved, NotFound, NotApplicable, …`
//! for a patient with two events.

pub mod context;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod resolution;
pub mod store;

pub use context::ResolutionContext;
pub use dependency::DependencyGraph;
pub use engine::Resolver;
pub use error::{EvalError, EvalResult};
pub use resolution::Resolution;
pub use store::{Event, EventStore, InMemoryEventStore};
