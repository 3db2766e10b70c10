//! Mock instances, the expectation container and the mock repository.
//!
//! A [`Mock`] starts in recording mode. Expectations are declared either by
//! making a call inside [`Mock::expect`] or with
//! [`Mock::record_expectation`]; the first ordinary call switches the mock to
//! replay, where calls are matched against the expectations in insertion
//! order.
//!
//! # Module Structure
//!
//! - `core` - `Mock` and the dispatch boundary
//! - `container` - expectation storage, matching and the call log
//! - `builder` - `ExpectationBuilder` and `PendingToken`
//! - `repository` - `MockRepository` and recursive stubbing
//! - `types` - call log entries and collaborator traits

mod builder;
mod container;
mod core;
mod repository;
mod types;


pub use self::core::Mock;
pub use builder::{ExpectationBuilder, PendingToken};
pub use repository::MockRepository;
pub use types::{Mockable, Mode, RecordedCall, Target};
