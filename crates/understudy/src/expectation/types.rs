//! Response types attached to expectations.

use crate::error::UsageError;
use crate::method::MethodDescriptor;
use crate::value::{FromArgs, TypeDescriptor, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Faults
// ============================================================================

/// An exception-like failure raised from a replay call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Fault {
    pub kind: String,
    pub message: String,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Callbacks
// ============================================================================

type CallbackFn = dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync;

/// User function invoked with the actual arguments of a matched call.
#[derive(Clone)]
pub struct Callback {
    parameter_types: Vec<TypeDescriptor>,
    func: Arc<CallbackFn>,
    then_return: Option<Value>,
}

impl Callback {
    /// Typed callback; its result becomes the call's return value.
    pub fn new<A, R, F>(f: F) -> Self
    where
        A: FromArgs + 'static,
        R: Into<Value> + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self::try_new(move |args: A| Ok::<R, Fault>(f(args)))
    }

    /// Typed callback that may raise a fault.
    pub fn try_new<A, R, F>(f: F) -> Self
    where
        A: FromArgs + 'static,
        R: Into<Value> + 'static,
        F: Fn(A) -> Result<R, Fault> + Send + Sync + 'static,
    {
        Self {
            parameter_types: A::parameter_types(),
            func: Arc::new(move |args: &[Value]| {
                let typed = A::from_args(args).ok_or_else(|| {
                    Fault::new(
                        "ArgumentMismatch",
                        "callback arguments do not match their declared types",
                    )
                })?;
                f(typed).map(Into::into)
            }),
            then_return: None,
        }
    }

    /// Return `value` instead of the callback's own result.
    pub fn then_return(mut self, value: impl Into<Value>) -> Self {
        self.then_return = Some(value.into());
        self
    }

    pub fn parameter_types(&self) -> &[TypeDescriptor] {
        &self.parameter_types
    }

    /// The callback must declare exactly the target's parameter types.
    pub fn check_signature(&self, method: &MethodDescriptor) -> Result<(), UsageError> {
        let matches = self.parameter_types.len() == method.arity()
            && self
                .parameter_types
                .iter()
                .zip(method.parameter_types())
                .all(|(declared, expected)| declared == expected);
        if matches {
            return Ok(());
        }
        Err(UsageError::CallbackSignature {
            method: method.qualified_name(),
            expected: join_types(method.parameter_types()),
            actual: join_types(self.parameter_types.iter()),
        })
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, Fault> {
        let result = (self.func)(args)?;
        Ok(match &self.then_return {
            Some(value) => value.clone(),
            None => result,
        })
    }
}

fn join_types<'a>(types: impl Iterator<Item = &'a TypeDescriptor>) -> String {
    types
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("parameter_types", &self.parameter_types)
            .field("then_return", &self.then_return)
            .finish()
    }
}

// ============================================================================
// Response Policy
// ============================================================================

/// What a matched call produces.
#[derive(Debug, Clone, Default)]
pub enum ResponsePolicy {
    /// The return type's default value.
    #[default]
    Default,
    ReturnValue(Value),
    Throw(Fault),
    Callback(Callback),
    /// Forward to the real implementation of a partial mock.
    CallOriginal,
}
