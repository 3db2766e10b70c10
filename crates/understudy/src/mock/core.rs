//! The mock instance and its dispatch boundary.
//!
//! Every call a proxy forwards goes through [`Mock::dispatch`]. The
//! container lock is held while the call is bound or matched and released
//! before the response runs, so callbacks and original implementations may
//! call back into the same mock.

use super::builder::{ExpectationBuilder, PendingToken};
use super::container::ExpectationContainer;
use super::types::{Mockable, Mode, PendingSlot, RecordedCall, Target};
use crate::capture::{fit_constraints, resolve_captured, ArgCapture, ArgumentSpec, CaptureCursor};
use crate::config::MockConfig;
use crate::constraint::Constraint;
use crate::error::{MockError, UsageError};
use crate::expectation::{Expectation, ExpectationId, ResponsePolicy};
use crate::method::{Call, MethodDescriptor};
use crate::repeat::Repeat;
use crate::value::{TypeDescriptor, TypeKind, Value};
use crate::verify::{VerificationError, VerificationReport, Violation};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use uuid::Uuid;

struct MockInner {
    id: Uuid,
    ty: TypeDescriptor,
    config: MockConfig,
    container: Mutex<ExpectationContainer>,
    target: Option<Arc<dyn Target>>,
    factory: Option<Weak<dyn Mockable>>,
}

/// A test double for one proxied object.
///
/// Cloning is cheap and yields a handle to the same instance.
#[derive(Clone)]
pub struct Mock {
    inner: Arc<MockInner>,
}

impl Mock {
    pub fn new(ty: TypeDescriptor) -> Self {
        Self::with_config(ty, MockConfig::default())
    }

    pub fn with_config(ty: TypeDescriptor, config: MockConfig) -> Self {
        Self::build(ty, config, None, None)
    }

    /// A mock whose expectations may forward to `target` with
    /// `call_original`.
    pub fn partial(ty: TypeDescriptor, target: impl Target + 'static) -> Self {
        let target: Arc<dyn Target> = Arc::new(target);
        Self::build(ty, MockConfig::default(), Some(target), None)
    }

    /// A mock that asks `factory` for nested mocks when a setup call returns
    /// a type it can mock. The factory is held weakly; once it is dropped,
    /// chained setup calls end at this mock.
    pub fn with_factory(
        ty: TypeDescriptor,
        config: MockConfig,
        factory: Weak<dyn Mockable>,
    ) -> Self {
        Self::build(ty, config, None, Some(factory))
    }

    pub(crate) fn build(
        ty: TypeDescriptor,
        config: MockConfig,
        target: Option<Arc<dyn Target>>,
        factory: Option<Weak<dyn Mockable>>,
    ) -> Self {
        let container = ExpectationContainer::new(config.record_calls, config.max_recorded_calls);
        Self {
            inner: Arc::new(MockInner {
                id: Uuid::new_v4(),
                ty,
                config,
                container: Mutex::new(container),
                target,
                factory,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.inner.ty
    }

    pub fn name(&self) -> &str {
        self.inner
            .config
            .name
            .as_deref()
            .unwrap_or_else(|| self.inner.ty.name())
    }

    pub fn config(&self) -> &MockConfig {
        &self.inner.config
    }

    pub fn mode(&self) -> Mode {
        self.inner.container.lock().mode()
    }

    pub fn has_original(&self) -> bool {
        self.inner.target.is_some()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Entry point for every proxied call.
    ///
    /// While an expectation is being recorded the call declares it and
    /// returns a placeholder. Otherwise the call is matched and the matched
    /// expectation's response is produced; calls matching nothing return the
    /// method's default value.
    pub fn dispatch(&self, call: Call) -> Result<Value, MockError> {
        let mut container = self.inner.container.lock();
        if container.slot().is_some() {
            return self.bind_setup_call(&mut container, call).map_err(MockError::from);
        }

        let resolution = container.resolve(&call);
        drop(container);

        match resolution {
            Some((id, policy)) => {
                debug!("{} matched expectation {} on {}", call, id, self.name());
                self.respond(policy, &call)
            }
            None => {
                warn!("Unexpected call {} on {}", call, self.name());
                Ok(call.method().return_type().default_value())
            }
        }
    }

    fn bind_setup_call(
        &self,
        container: &mut ExpectationContainer,
        call: Call,
    ) -> Result<Value, UsageError> {
        let (validated, cursor, start) = match container.slot() {
            Some(PendingSlot::Failed(err)) => return Err(err.clone()),
            Some(PendingSlot::Bound { .. }) => (
                Err(UsageError::MultipleSetupCalls {
                    mock: self.name().to_string(),
                }),
                None,
                0,
            ),
            Some(PendingSlot::Awaiting { cursor, start }) => {
                (self.validate_setup_call(&call), cursor.clone(), *start)
            }
            None => (self.validate_setup_call(&call), None, 0),
        };
        if let Err(err) = validated {
            if let Some(PendingSlot::Bound {
                nested: Some(nested),
                ..
            }) = container.take_slot()
            {
                nested.cancel_recording();
            }
            container.set_slot(PendingSlot::Failed(err.clone()));
            return Err(err);
        }

        let mark = cursor.as_ref().map_or(start, CaptureCursor::position);
        let nested = self.nested_for(&call, cursor);
        let placeholder = match &nested {
            Some(mock) => Value::Mock(mock.clone()),
            None => call.method().return_type().default_value(),
        };
        debug!("Recording {} on {}", call, self.name());
        container.set_slot(PendingSlot::Bound {
            call,
            nested,
            matchers: mark.saturating_sub(start),
        });
        Ok(placeholder)
    }

    fn validate_setup_call(&self, call: &Call) -> Result<(), UsageError> {
        let method = call.method();
        if !method.is_interceptable() {
            return Err(UsageError::NotInterceptable {
                method: method.qualified_name(),
            });
        }
        if call.args().len() != method.arity() {
            return Err(UsageError::ArgumentCount {
                method: method.qualified_name(),
                expected: method.arity(),
                actual: call.args().len(),
            });
        }
        Ok(())
    }

    /// Nested mock returned from a setup call whose return type is mockable,
    /// already waiting for the next call of the chain.
    fn nested_for(&self, call: &Call, cursor: Option<CaptureCursor>) -> Option<Mock> {
        if !self.inner.config.recursive_stubbing {
            return None;
        }
        let return_type = call.method().return_type();
        if return_type.kind() != TypeKind::Object {
            return None;
        }
        let nested = self
            .inner
            .factory
            .as_ref()
            .and_then(Weak::upgrade)?
            .create_mock(return_type)?;
        nested.inner.container.lock().open_slot(cursor);
        Some(nested)
    }

    fn respond(&self, policy: ResponsePolicy, call: &Call) -> Result<Value, MockError> {
        match policy {
            ResponsePolicy::Default => Ok(call.method().return_type().default_value()),
            ResponsePolicy::ReturnValue(value) => Ok(value),
            ResponsePolicy::Throw(fault) => Err(fault.into()),
            ResponsePolicy::Callback(callback) => Ok(callback.invoke(call.args())?),
            ResponsePolicy::CallOriginal => match &self.inner.target {
                Some(target) => Ok(target.invoke(call)?),
                None => Err(UsageError::NoOriginalImplementation {
                    method: call.method().qualified_name(),
                }
                .into()),
            },
        }
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Open the recording slot; the next call on this mock declares an
    /// expectation instead of being matched.
    pub fn begin_expectation(&self) -> Result<PendingToken, UsageError> {
        if !self.inner.container.lock().open_slot(None) {
            return Err(UsageError::ExpectationPending {
                mock: self.name().to_string(),
            });
        }
        Ok(PendingToken::new(self.clone()))
    }

    /// Declare an expectation by making the call inside `setup`.
    ///
    /// ```ignore
    /// mock.expect(|arg| calculator.add(arg.any(), arg.eq(2)))?
    ///     .returns(5)
    ///     .repeat(Repeat::twice());
    /// ```
    pub fn expect<F, R>(&self, setup: F) -> Result<ExpectationBuilder, UsageError>
    where
        F: FnOnce(&mut ArgCapture) -> R,
    {
        let token = self.begin_expectation()?;
        let mut capture = token.capture();
        setup(&mut capture);
        token.finish(capture)
    }

    /// Like [`Mock::expect`], but the expectation may be hit any number of
    /// times, including never.
    pub fn stub<F, R>(&self, setup: F) -> Result<ExpectationBuilder, UsageError>
    where
        F: FnOnce(&mut ArgCapture) -> R,
    {
        Ok(self.expect(setup)?.repeat(Repeat::any()))
    }

    /// Record an expectation directly, without a setup call.
    pub fn record_expectation(
        &self,
        method: Arc<MethodDescriptor>,
        args: ArgumentSpec,
        policy: ResponsePolicy,
        repeat: Repeat,
    ) -> Result<ExpectationId, UsageError> {
        if !method.is_interceptable() {
            return Err(UsageError::NotInterceptable {
                method: method.qualified_name(),
            });
        }
        let constraints = args.resolve(&method)?;
        let mut container = self.inner.container.lock();
        let mut expectation = Expectation::new(container.next_id(), method, constraints);
        expectation.set_policy(policy, self.has_original())?;
        expectation.set_repeat(repeat)?;
        let id = container.push(expectation);
        debug!("Recorded expectation {} on {}", id, self.name());
        Ok(id)
    }

    /// Attach `cursor` to the open slot so chained setup calls can tell
    /// which matchers were made for them.
    pub(crate) fn track_capture(&self, cursor: &CaptureCursor) {
        self.inner.container.lock().track_capture(cursor.clone());
    }

    /// Finish the setup call bound to the open slot.
    ///
    /// When the setup call returned a nested mock and the closure chained a
    /// call onto it, each call of the chain takes the matchers made for it
    /// (outer calls without matchers use their literal arguments) and each
    /// outer call becomes a link answering its nested mock.
    pub(crate) fn complete_recording(
        &self,
        capture: ArgCapture,
    ) -> Result<ExpectationBuilder, UsageError> {
        self.record_chain(capture.into_constraints())
    }

    fn record_chain(&self, mut captured: Vec<Constraint>) -> Result<ExpectationBuilder, UsageError> {
        let slot = self.inner.container.lock().take_slot();
        let (call, nested, matchers) = match slot {
            Some(PendingSlot::Bound {
                call,
                nested,
                matchers,
            }) => (call, nested, matchers),
            Some(PendingSlot::Failed(err)) => return Err(err),
            Some(PendingSlot::Awaiting { .. }) | None => {
                return Err(UsageError::NoSetupCall {
                    mock: self.name().to_string(),
                })
            }
        };

        if let Some(nested) = nested {
            if nested.has_chained_call() {
                let rest = captured.split_off(matchers.min(captured.len()));
                let constraints = match resolve_captured(call.method(), call.args(), captured) {
                    Ok(constraints) => constraints,
                    Err(err) => {
                        nested.cancel_recording();
                        return Err(err);
                    }
                };
                return self.extend_chain(call, constraints, nested, rest);
            }
            nested.cancel_recording();
        }

        let constraints = resolve_captured(call.method(), call.args(), captured)?;
        let id = self
            .inner
            .container
            .lock()
            .push_new(call.method().clone(), constraints);
        debug!("Recorded expectation {} for {} on {}", id, call, self.name());
        Ok(ExpectationBuilder::new(self.clone(), id))
    }

    fn has_chained_call(&self) -> bool {
        matches!(
            self.inner.container.lock().slot(),
            Some(PendingSlot::Bound { .. } | PendingSlot::Failed(_))
        )
    }

    /// Record the rest of the chain behind `call`. An existing link with the
    /// same signature takes over the pending call so both chains share one
    /// nested mock; otherwise `nested` is linked.
    fn extend_chain(
        &self,
        call: Call,
        constraints: Vec<Constraint>,
        nested: Mock,
        rest: Vec<Constraint>,
    ) -> Result<ExpectationBuilder, UsageError> {
        let signature = call
            .method()
            .signature(constraints.iter().map(Constraint::describe_argument));
        let existing = self
            .inner
            .container
            .lock()
            .find_link(call.method(), &signature);
        if let Some(existing) = existing {
            if nested.hand_over_slot(&existing) {
                return existing.record_chain(rest);
            }
        }

        let builder = nested.record_chain(rest)?;
        let id = self
            .inner
            .container
            .lock()
            .push_link(call.method().clone(), constraints, nested);
        debug!("Promoted {} on {} to nested mock link {}", signature, self.name(), id);
        Ok(builder)
    }

    /// Move this mock's bound setup call to `other`. Fails when `other` is
    /// itself recording.
    fn hand_over_slot(&self, other: &Mock) -> bool {
        let mut target = other.inner.container.lock();
        if target.slot().is_some() {
            return false;
        }
        if let Some(slot) = self.inner.container.lock().take_slot() {
            target.set_slot(slot);
        }
        true
    }

    /// Close the slot without recording anything.
    pub(crate) fn cancel_recording(&self) {
        let slot = self.inner.container.lock().take_slot();
        if let Some(PendingSlot::Bound {
            nested: Some(nested),
            ..
        }) = slot
        {
            nested.cancel_recording();
        }
    }

    /// Apply `f` to one of this mock's expectations under the lock.
    pub(crate) fn update_expectation<F>(&self, id: ExpectationId, f: F) -> Result<(), UsageError>
    where
        F: FnOnce(&mut Expectation, bool) -> Result<(), UsageError>,
    {
        let has_original = self.has_original();
        let mut container = self.inner.container.lock();
        let expectation = container
            .expectation_mut(id)
            .ok_or(UsageError::UnknownExpectation(id))?;
        f(expectation, has_original)
    }

    /// Snapshot of one expectation.
    pub fn expectation(&self, id: ExpectationId) -> Option<Expectation> {
        self.inner.container.lock().expectation(id).cloned()
    }

    /// Snapshot of all expectations in insertion order.
    pub fn expectations(&self) -> Vec<Expectation> {
        self.inner.container.lock().expectations().to_vec()
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Fail with every expectation, here or on nested mocks, that was hit
    /// fewer times than its minimum. Unexpected calls are not reported here;
    /// see [`Mock::assert_no_unexpected_calls`].
    pub fn verify(&self) -> Result<(), VerificationError> {
        self.verification_report().into_result()
    }

    pub(crate) fn verification_report(&self) -> VerificationReport {
        let (mut report, children) = {
            let container = self.inner.container.lock();
            let children: Vec<Mock> = container.children().cloned().collect();
            (container.verify(), children)
        };
        for child in children {
            report.merge(child.verification_report());
        }
        report
    }

    fn ensure_call_log(&self) -> Result<(), UsageError> {
        if self.inner.container.lock().records_calls() {
            return Ok(());
        }
        Err(UsageError::CallLogDisabled {
            mock: self.name().to_string(),
        })
    }

    fn count_calls(
        &self,
        method: &MethodDescriptor,
        constraints: &[Constraint],
    ) -> Result<usize, UsageError> {
        self.ensure_call_log()?;
        let constraints = match constraints {
            [] => Vec::new(),
            _ => fit_constraints(method, constraints.to_vec())?,
        };
        Ok(self
            .inner
            .container
            .lock()
            .count_matching(method, &constraints))
    }

    fn assertion_signature(method: &MethodDescriptor, constraints: &[Constraint]) -> String {
        if constraints.is_empty() {
            return method.signature((0..method.arity()).map(|_| "anything"));
        }
        method.signature(constraints.iter().map(Constraint::describe_argument))
    }

    /// Assert that `method` was called with arguments satisfying
    /// `constraints` (an empty list accepts any arguments). Returns the
    /// number of such calls. Expectations are not consumed.
    pub fn assert_was_called(
        &self,
        method: &MethodDescriptor,
        constraints: &[Constraint],
    ) -> Result<usize, MockError> {
        let count = self.count_calls(method, constraints)?;
        if count == 0 {
            return Err(VerificationError::new(vec![Violation::Missing {
                signature: Self::assertion_signature(method, constraints),
            }])
            .into());
        }
        Ok(count)
    }

    pub fn assert_was_not_called(
        &self,
        method: &MethodDescriptor,
        constraints: &[Constraint],
    ) -> Result<(), MockError> {
        let count = self.count_calls(method, constraints)?;
        if count > 0 {
            return Err(VerificationError::new(vec![Violation::Forbidden {
                signature: Self::assertion_signature(method, constraints),
                actual: count,
            }])
            .into());
        }
        Ok(())
    }

    pub fn assert_was_called_times(
        &self,
        method: &MethodDescriptor,
        constraints: &[Constraint],
        repeat: Repeat,
    ) -> Result<usize, MockError> {
        let count = self.count_calls(method, constraints)?;
        let within = u32::try_from(count).map_or(repeat.max().is_none(), |n| repeat.contains(n));
        if !within {
            return Err(VerificationError::new(vec![Violation::CountMismatch {
                signature: Self::assertion_signature(method, constraints),
                expected: repeat.to_string(),
                actual: count,
            }])
            .into());
        }
        Ok(count)
    }

    /// Logged calls to `method`, oldest first.
    pub fn calls_to(&self, method: &MethodDescriptor) -> Result<Vec<RecordedCall>, UsageError> {
        self.ensure_call_log()?;
        Ok(self
            .inner
            .container
            .lock()
            .calls()
            .filter(|call| *call.method == *method)
            .cloned()
            .collect())
    }

    /// Logged calls that matched no expectation.
    pub fn unexpected_calls(&self) -> Result<Vec<RecordedCall>, UsageError> {
        self.ensure_call_log()?;
        Ok(self
            .inner
            .container
            .lock()
            .calls()
            .filter(|call| call.is_unexpected())
            .cloned()
            .collect())
    }

    /// Fail with one `Expected #0` line per distinct unexpected call.
    pub fn assert_no_unexpected_calls(&self) -> Result<(), MockError> {
        let mut grouped: Vec<(String, usize)> = Vec::new();
        for call in self.unexpected_calls()? {
            let signature = call.signature();
            match grouped.iter_mut().find(|(s, _)| *s == signature) {
                Some((_, count)) => *count += 1,
                None => grouped.push((signature, 1)),
            }
        }
        let mut report = VerificationReport::new();
        for (signature, actual) in grouped {
            report.add(Violation::Unexpected { signature, actual });
        }
        Ok(report.into_result()?)
    }

    /// The whole call log, oldest first.
    pub fn recorded_calls(&self) -> Result<Vec<RecordedCall>, UsageError> {
        self.ensure_call_log()?;
        Ok(self.inner.container.lock().calls().cloned().collect())
    }
}

impl PartialEq for Mock {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Mock {}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("type", &self.inner.ty)
            .field("id", &self.inner.id)
            .finish()
    }
}
