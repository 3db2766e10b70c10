//! Error types.
//!
//! Usage errors surface immediately, while an expectation is being set up.
//! Expectation violations surface only when verification is requested.

use crate::expectation::{ExpectationId, Fault};
use crate::verify::VerificationError;

/// Misuse of the mocking API, raised at setup time.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UsageError {
    #[error("{method} takes {expected} argument constraints but {actual} were given")]
    ConstraintArity {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("{method} takes {expected} arguments but was called with {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("a fault response cannot be attached to property setter {method}")]
    ThrowFromPropertySetter { method: String },
    #[error("{method} cannot be intercepted")]
    NotInterceptable { method: String },
    #[error("more than one call was made on {mock} inside a single expectation block")]
    MultipleSetupCalls { mock: String },
    #[error("no call was made on {mock} inside the expectation block")]
    NoSetupCall { mock: String },
    #[error("{mock} already has an expectation being recorded")]
    ExpectationPending { mock: String },
    #[error("callback parameters ({actual}) do not match the parameters of {method} ({expected})")]
    CallbackSignature {
        method: String,
        expected: String,
        actual: String,
    },
    #[error("{method} has no original implementation to call")]
    NoOriginalImplementation { method: String },
    #[error("expectation {id} on {method} cannot change after replay has started")]
    ExpectationSealed { id: ExpectationId, method: String },
    #[error("no expectation {0} on this mock")]
    UnknownExpectation(ExpectationId),
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("method {0} is not declared by the mocked type")]
    UnknownMethod(String),
    #[error("method name {0} matches several overloads")]
    AmbiguousMethod(String),
    #[error("expectation for {0} sets both a return value and a fault")]
    ConflictingResponses(String),
    #[error("call recording is disabled for {mock}")]
    CallLogDisabled { mock: String },
}

/// Any error returned by a call into a mock.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MockError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// A fault configured on the matched expectation, or raised by a
    /// callback or by the original implementation.
    #[error(transparent)]
    Raised(#[from] Fault),
    #[error(transparent)]
    Verification(#[from] VerificationError),
}
