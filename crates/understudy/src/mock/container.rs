//! Per-mock expectation storage and the matching algorithm.
//!
//! The container is only ever touched under its mock's lock.

use super::core::Mock;
use super::types::{Mode, PendingSlot, RecordedCall};
use crate::capture::CaptureCursor;
use crate::constraint::Constraint;
use crate::expectation::{Expectation, ExpectationId, ResponsePolicy};
use crate::method::{Call, MethodDescriptor};
use crate::verify::{verify_expectations, VerificationReport};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct ExpectationContainer {
    mode: Mode,
    expectations: Vec<Expectation>,
    /// Expectations before this index are sealed.
    sealed: usize,
    slot: Option<PendingSlot>,
    calls: VecDeque<RecordedCall>,
    next_sequence: u64,
    record_calls: bool,
    max_recorded_calls: Option<usize>,
    /// Nested mocks handed out by chain-link expectations.
    children: Vec<(ExpectationId, Mock)>,
}

impl ExpectationContainer {
    pub(crate) fn new(record_calls: bool, max_recorded_calls: Option<usize>) -> Self {
        Self {
            mode: Mode::Recording,
            expectations: Vec::new(),
            sealed: 0,
            slot: None,
            calls: VecDeque::new(),
            next_sequence: 0,
            record_calls,
            max_recorded_calls,
            children: Vec::new(),
        }
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    // ------------------------------------------------------------------
    // Recording slot
    // ------------------------------------------------------------------

    /// Returns false if a slot is already open.
    pub(crate) fn open_slot(&mut self, cursor: Option<CaptureCursor>) -> bool {
        if self.slot.is_some() {
            return false;
        }
        let start = cursor.as_ref().map_or(0, CaptureCursor::position);
        self.slot = Some(PendingSlot::Awaiting { cursor, start });
        true
    }

    /// Attach the capture cursor to a slot still waiting for its call.
    pub(crate) fn track_capture(&mut self, tracked: CaptureCursor) {
        if let Some(PendingSlot::Awaiting { cursor, start }) = &mut self.slot {
            *start = tracked.position();
            *cursor = Some(tracked);
        }
    }

    pub(crate) fn slot(&self) -> Option<&PendingSlot> {
        self.slot.as_ref()
    }

    pub(crate) fn set_slot(&mut self, slot: PendingSlot) {
        self.slot = Some(slot);
    }

    pub(crate) fn take_slot(&mut self) -> Option<PendingSlot> {
        self.slot.take()
    }

    // ------------------------------------------------------------------
    // Expectations
    // ------------------------------------------------------------------

    pub(crate) fn next_id(&self) -> ExpectationId {
        ExpectationId(self.expectations.len())
    }

    pub(crate) fn push(&mut self, expectation: Expectation) -> ExpectationId {
        let id = expectation.id();
        self.expectations.push(expectation);
        id
    }

    pub(crate) fn push_new(
        &mut self,
        method: Arc<MethodDescriptor>,
        constraints: Vec<Constraint>,
    ) -> ExpectationId {
        let expectation = Expectation::new(self.next_id(), method, constraints);
        self.push(expectation)
    }

    pub(crate) fn expectation(&self, id: ExpectationId) -> Option<&Expectation> {
        self.expectations.get(id.0)
    }

    pub(crate) fn expectation_mut(&mut self, id: ExpectationId) -> Option<&mut Expectation> {
        self.expectations.get_mut(id.0)
    }

    pub(crate) fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    // ------------------------------------------------------------------
    // Recursive stubbing links
    // ------------------------------------------------------------------

    /// Nested mock of an existing link with the same rendered signature, so
    /// repeated chains through the same call extend one nested mock.
    pub(crate) fn find_link(&self, method: &MethodDescriptor, signature: &str) -> Option<Mock> {
        self.children
            .iter()
            .find(|(id, _)| {
                self.expectation(*id)
                    .is_some_and(|e| **e.method() == *method && e.signature() == signature)
            })
            .map(|(_, mock)| mock.clone())
    }

    pub(crate) fn push_link(
        &mut self,
        method: Arc<MethodDescriptor>,
        constraints: Vec<Constraint>,
        nested: Mock,
    ) -> ExpectationId {
        let id = self.next_id();
        self.push(Expectation::linked(
            id,
            method,
            constraints,
            nested.clone().into(),
        ));
        self.children.push((id, nested));
        id
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = &Mock> {
        self.children.iter().map(|(_, mock)| mock)
    }

    // ------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------

    /// Match a replay call: the first expectation in insertion order with
    /// the same member, satisfied constraints and room left under its
    /// maximum. Every call is logged, matched or not.
    pub(crate) fn resolve(&mut self, call: &Call) -> Option<(ExpectationId, ResponsePolicy)> {
        self.mode = Mode::Replaying;
        for expectation in &mut self.expectations[self.sealed..] {
            expectation.seal();
        }
        self.sealed = self.expectations.len();

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let matched = self
            .expectations
            .iter_mut()
            .find(|e| !e.is_exhausted() && e.matches(call.method(), call.args()))
            .map(|e| {
                e.record_hit();
                (e.id(), e.policy().clone())
            });

        self.log(RecordedCall {
            sequence,
            method: call.method().clone(),
            args: call.args().to_vec(),
            matched: matched.as_ref().map(|(id, _)| *id),
        });
        matched
    }

    fn log(&mut self, call: RecordedCall) {
        if !self.record_calls {
            return;
        }
        if let Some(max) = self.max_recorded_calls {
            while self.calls.len() >= max {
                self.calls.pop_front();
            }
        }
        self.calls.push_back(call);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub(crate) fn records_calls(&self) -> bool {
        self.record_calls
    }

    pub(crate) fn calls(&self) -> impl Iterator<Item = &RecordedCall> {
        self.calls.iter()
    }

    /// Logged calls to `method` whose arguments satisfy `constraints`; an
    /// empty constraint list accepts any arguments.
    pub(crate) fn count_matching(&self, method: &MethodDescriptor, constraints: &[Constraint]) -> usize {
        self.calls
            .iter()
            .filter(|call| *call.method == *method)
            .filter(|call| {
                constraints.is_empty()
                    || (call.args.len() == constraints.len()
                        && constraints.iter().zip(&call.args).all(|(c, a)| c.eval(a)))
            })
            .count()
    }

    pub(crate) fn verify(&self) -> VerificationReport {
        verify_expectations(&self.expectations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repeat::Repeat;
    use crate::value::{TypeDescriptor, Value};

    fn get() -> Arc<MethodDescriptor> {
        MethodDescriptor::method(TypeDescriptor::object("Cache"), "get")
            .param("key", TypeDescriptor::string())
            .returns(TypeDescriptor::int())
            .build()
    }

    fn call(key: &str) -> Call {
        Call::new(get(), vec![Value::from(key)])
    }

    #[test]
    fn test_first_match_in_insertion_order() {
        let mut container = ExpectationContainer::new(true, None);
        let a = container.push_new(get(), vec![Constraint::anything()]);
        let b = container.push_new(get(), vec![Constraint::anything()]);
        if let Some(e) = container.expectation_mut(a) {
            e.set_repeat(Repeat::twice()).unwrap();
        }

        let hits: Vec<_> = (0..3)
            .map(|_| container.resolve(&call("k")).map(|(id, _)| id))
            .collect();
        assert_eq!(hits, vec![Some(a), Some(a), Some(b)]);
        assert!(container.resolve(&call("k")).is_none());
    }

    #[test]
    fn test_replay_seals_and_flips_mode() {
        let mut container = ExpectationContainer::new(true, None);
        let id = container.push_new(get(), vec![Constraint::anything()]);
        assert_eq!(container.mode(), Mode::Recording);

        container.resolve(&call("k"));
        assert_eq!(container.mode(), Mode::Replaying);
        assert!(container.expectation(id).unwrap().is_sealed());

        let late = container.push_new(get(), vec![Constraint::anything()]);
        assert!(!container.expectation(late).unwrap().is_sealed());
    }

    #[test]
    fn test_call_log_cap_drops_oldest() {
        let mut container = ExpectationContainer::new(true, Some(2));
        for key in ["a", "b", "c"] {
            container.resolve(&call(key));
        }
        let sequences: Vec<u64> = container.calls().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn test_call_log_disabled() {
        let mut container = ExpectationContainer::new(false, None);
        container.resolve(&call("a"));
        assert_eq!(container.calls().count(), 0);
        assert!(!container.records_calls());
    }

    #[test]
    fn test_count_matching() {
        let mut container = ExpectationContainer::new(true, None);
        container.resolve(&call("a"));
        container.resolve(&call("b"));
        container.resolve(&call("a"));
        assert_eq!(container.count_matching(&get(), &[]), 3);
        assert_eq!(container.count_matching(&get(), &[Constraint::equal("a")]), 2);
    }

    #[test]
    fn test_single_open_slot() {
        let mut container = ExpectationContainer::new(true, None);
        assert!(container.open_slot(None));
        assert!(!container.open_slot(None));
        assert!(matches!(
            container.take_slot(),
            Some(PendingSlot::Awaiting { cursor: None, start: 0 })
        ));
        assert!(container.open_slot(None));
    }
}
