//! Record/replay test doubles with composable argument constraints.
//!
//! A [`Mock`] stands in for a dependency. A hand-written (or generated)
//! proxy forwards every method and property call to [`Mock::dispatch`] as a
//! [`Call`]. Expectations are declared by making the call inside
//! [`Mock::expect`], matched during replay in insertion order, and checked
//! with [`Mock::verify`]. Calls nobody expected return the method's default
//! value and are reported only when asked for.
//!
//! # Example
//!
//! ```
//! use understudy::{Call, Mock, MethodDescriptor, Repeat, TypeDescriptor, Value};
//!
//! let add = MethodDescriptor::method(TypeDescriptor::object("Calculator"), "add")
//!     .param("a", TypeDescriptor::int())
//!     .param("b", TypeDescriptor::int())
//!     .returns(TypeDescriptor::int())
//!     .build();
//! let mock = Mock::new(TypeDescriptor::object("Calculator"));
//!
//! let call = |a: i64, b: i64| Call::new(add.clone(), vec![a.into(), b.into()]);
//! mock.expect(|arg| mock.dispatch(call(arg.any(), arg.eq(2))))
//!     .unwrap()
//!     .returns(5)
//!     .repeat(Repeat::twice());
//!
//! assert_eq!(mock.dispatch(call(3, 2)).unwrap(), Value::Int(5));
//! let err = mock.verify().unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "Calculator.add(anything, 2); Expected #2, Actual #1."
//! );
//! ```

pub mod capture;
pub mod config;
pub mod constraint;
pub mod error;
pub mod expectation;
pub mod method;
pub mod mock;
pub mod repeat;
pub mod script;
pub mod value;
pub mod verify;

pub use capture::{ArgCapture, ArgumentSpec};
pub use config::MockConfig;
pub use constraint::{Constraint, ConstraintSpec};
pub use error::{MockError, UsageError};
pub use expectation::{Callback, Expectation, ExpectationId, Fault, ResponsePolicy};
pub use method::{Call, Direction, MemberKind, MethodDescriptor, Parameter};
pub use mock::{
    ExpectationBuilder, Mock, MockRepository, Mockable, Mode, PendingToken, RecordedCall, Target,
};
pub use repeat::{Repeat, RepeatSpec};
pub use script::{ExpectationScript, ScriptedExpectation};
pub use value::{FromArgs, FromValue, Object, TypeDescriptor, TypeKind, Value};
pub use verify::{VerificationError, VerificationReport, Violation};
