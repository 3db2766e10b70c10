//! Expectations: what a mock was told to expect and how to answer.
//!
//! # Module Structure
//!
//! - `core` - `Expectation` with its constraints, repeat bound and call count
//! - `types` - response policies, callbacks and faults

mod core;
mod types;

pub use self::core::{Expectation, ExpectationId};
pub use types::{Callback, Fault, ResponsePolicy};
