//! Fluent configuration of a recorded expectation.

use super::core::Mock;
use crate::capture::ArgCapture;
use crate::constraint::Constraint;
use crate::error::UsageError;
use crate::expectation::{Callback, Expectation, ExpectationId, Fault, ResponsePolicy};
use crate::repeat::Repeat;
use crate::value::Value;
use tracing::warn;

/// Handle to an open recording slot. Dropping it unfinished closes the slot
/// without recording anything.
#[must_use = "the expectation is only recorded when the token is finished"]
pub struct PendingToken {
    mock: Mock,
    finished: bool,
}

impl PendingToken {
    pub(crate) fn new(mock: Mock) -> Self {
        Self {
            mock,
            finished: false,
        }
    }

    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    /// A capture tied to this recording. Matchers made with it are split
    /// between the calls of a chain in the order the calls were made; with a
    /// plain [`ArgCapture::new`] they all go to the last call.
    pub fn capture(&self) -> ArgCapture {
        let capture = ArgCapture::new();
        self.mock.track_capture(capture.cursor());
        capture
    }

    /// Turn the bound setup call and the matchers captured while making it
    /// into an expectation.
    pub fn finish(mut self, capture: ArgCapture) -> Result<ExpectationBuilder, UsageError> {
        self.finished = true;
        self.mock.complete_recording(capture)
    }
}

impl Drop for PendingToken {
    fn drop(&mut self) {
        if !self.finished {
            self.mock.cancel_recording();
        }
    }
}

/// Configures one expectation after it was recorded.
///
/// Changes write through to the mock immediately. Once the mock has started
/// replaying, the expectation is sealed: fallible setters return
/// [`UsageError::ExpectationSealed`] and the others log a warning and leave
/// the expectation unchanged.
#[derive(Debug, Clone)]
pub struct ExpectationBuilder {
    mock: Mock,
    id: ExpectationId,
}

impl ExpectationBuilder {
    pub(crate) fn new(mock: Mock, id: ExpectationId) -> Self {
        Self { mock, id }
    }

    pub fn id(&self) -> ExpectationId {
        self.id
    }

    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    /// Current state of the expectation.
    pub fn snapshot(&self) -> Option<Expectation> {
        self.mock.expectation(self.id)
    }

    fn update<F>(&self, f: F) -> Result<(), UsageError>
    where
        F: FnOnce(&mut Expectation, bool) -> Result<(), UsageError>,
    {
        self.mock.update_expectation(self.id, f)
    }

    fn update_or_warn<F>(&self, operation: &str, f: F)
    where
        F: FnOnce(&mut Expectation, bool) -> Result<(), UsageError>,
    {
        if let Err(err) = self.update(f) {
            warn!("Ignoring {} on {}: {}", operation, self.mock.name(), err);
        }
    }

    /// Answer matching calls with `value`.
    pub fn returns(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.update_or_warn("returns", |e, _| {
            let value = value.coerce_to(e.method().return_type());
            e.set_policy(ResponsePolicy::ReturnValue(value), false)
        });
        self
    }

    /// Raise `fault` from matching calls.
    pub fn throws(self, fault: Fault) -> Result<Self, UsageError> {
        self.update(|e, _| e.set_policy(ResponsePolicy::Throw(fault), false))?;
        Ok(self)
    }

    /// Run `callback` with the actual arguments of matching calls.
    pub fn callback(self, callback: Callback) -> Result<Self, UsageError> {
        self.update(|e, _| e.set_policy(ResponsePolicy::Callback(callback), false))?;
        Ok(self)
    }

    /// Forward matching calls to the partial mock's real implementation.
    pub fn call_original(self) -> Result<Self, UsageError> {
        self.update(|e, has_original| e.set_policy(ResponsePolicy::CallOriginal, has_original))?;
        Ok(self)
    }

    /// Replace the argument constraints; one per parameter.
    pub fn with_constraints(self, constraints: Vec<Constraint>) -> Result<Self, UsageError> {
        self.update(|e, _| e.set_constraints(constraints))?;
        Ok(self)
    }

    /// Match any arguments.
    pub fn ignore_arguments(self) -> Self {
        self.update_or_warn("ignore_arguments", |e, _| e.ignore_arguments());
        self
    }

    pub fn repeat(self, repeat: Repeat) -> Self {
        self.update_or_warn("repeat", |e, _| e.set_repeat(repeat));
        self
    }

    pub fn times(self, n: u32) -> Self {
        self.repeat(Repeat::times(n))
    }

    pub fn never(self) -> Self {
        self.repeat(Repeat::never())
    }
}
