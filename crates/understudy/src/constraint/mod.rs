//! Argument constraint engine.
//!
//! A [`Constraint`] is a predicate over one argument value with a
//! human-readable description. Leaves cover equality, ordering, text,
//! regex, collection membership, runtime type and user predicates; they
//! compose with AND, OR and NOT.
//!
//! # Module Structure
//!
//! - `leaf` - single-value predicates and their messages
//! - `logical` - the composable `Constraint` type
//! - `spec` - serde form used by expectation scripts

mod leaf;
mod logical;
mod spec;

pub use leaf::{Leaf, PredicateFn};
pub use logical::Constraint;
pub use spec::ConstraintSpec;
