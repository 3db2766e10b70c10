//! A single recorded expectation and its call accounting.

use super::types::ResponsePolicy;
use crate::capture::{anything, fit_constraints};
use crate::constraint::Constraint;
use crate::error::UsageError;
use crate::method::{MemberKind, MethodDescriptor};
use crate::repeat::Repeat;
use crate::value::Value;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Position of an expectation inside its mock, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ExpectationId(pub(crate) usize);

impl ExpectationId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ExpectationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Expectation {
    id: ExpectationId,
    method: Arc<MethodDescriptor>,
    constraints: Vec<Constraint>,
    repeat: Repeat,
    policy: ResponsePolicy,
    actual_count: u32,
    sealed: bool,
}

impl Expectation {
    /// `constraints` must already have the method's arity.
    pub(crate) fn new(
        id: ExpectationId,
        method: Arc<MethodDescriptor>,
        constraints: Vec<Constraint>,
    ) -> Self {
        Self {
            id,
            method,
            constraints,
            repeat: Repeat::default(),
            policy: ResponsePolicy::default(),
            actual_count: 0,
            sealed: false,
        }
    }

    /// Link in a recursive-stubbing chain: answers `nested` any number of
    /// times.
    pub(crate) fn linked(
        id: ExpectationId,
        method: Arc<MethodDescriptor>,
        constraints: Vec<Constraint>,
        nested: Value,
    ) -> Self {
        Self {
            repeat: Repeat::any(),
            policy: ResponsePolicy::ReturnValue(nested),
            ..Self::new(id, method, constraints)
        }
    }

    pub fn id(&self) -> ExpectationId {
        self.id
    }

    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.method
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn policy(&self) -> &ResponsePolicy {
        &self.policy
    }

    pub fn actual_count(&self) -> u32 {
        self.actual_count
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Same member and every argument satisfies its constraint.
    pub fn matches(&self, method: &MethodDescriptor, args: &[Value]) -> bool {
        *self.method == *method && self.arguments_match(args)
    }

    pub fn arguments_match(&self, args: &[Value]) -> bool {
        args.len() == self.constraints.len()
            && self
                .constraints
                .iter()
                .zip(args)
                .all(|(constraint, arg)| constraint.eval(arg))
    }

    pub fn is_satisfied(&self) -> bool {
        self.repeat.is_satisfied(self.actual_count)
    }

    pub fn is_exhausted(&self) -> bool {
        self.repeat.is_exhausted(self.actual_count)
    }

    pub(crate) fn record_hit(&mut self) {
        self.actual_count = self.actual_count.saturating_add(1);
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    fn ensure_open(&self) -> Result<(), UsageError> {
        if self.sealed {
            return Err(UsageError::ExpectationSealed {
                id: self.id,
                method: self.method.qualified_name(),
            });
        }
        Ok(())
    }

    pub(crate) fn set_constraints(&mut self, constraints: Vec<Constraint>) -> Result<(), UsageError> {
        self.ensure_open()?;
        self.constraints = fit_constraints(&self.method, constraints)?;
        Ok(())
    }

    pub(crate) fn ignore_arguments(&mut self) -> Result<(), UsageError> {
        self.ensure_open()?;
        self.constraints = anything(&self.method);
        Ok(())
    }

    pub(crate) fn set_repeat(&mut self, repeat: Repeat) -> Result<(), UsageError> {
        self.ensure_open()?;
        self.repeat = repeat;
        Ok(())
    }

    pub(crate) fn set_policy(
        &mut self,
        policy: ResponsePolicy,
        has_original: bool,
    ) -> Result<(), UsageError> {
        self.ensure_open()?;
        match &policy {
            ResponsePolicy::Throw(_) if self.method.kind() == MemberKind::PropertySet => {
                return Err(UsageError::ThrowFromPropertySetter {
                    method: self.method.qualified_name(),
                });
            }
            ResponsePolicy::Callback(callback) => callback.check_signature(&self.method)?,
            ResponsePolicy::CallOriginal if !has_original => {
                return Err(UsageError::NoOriginalImplementation {
                    method: self.method.qualified_name(),
                });
            }
            _ => {}
        }
        self.policy = policy;
        Ok(())
    }

    /// Signature rendered from the constraints, e.g. `Type.m(1, anything)`.
    pub fn signature(&self) -> String {
        self.method
            .signature(self.constraints.iter().map(Constraint::describe_argument))
    }
}
