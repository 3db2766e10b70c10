//! Type definitions shared by the mock runtime.

use super::core::Mock;
use crate::capture::CaptureCursor;
use crate::error::UsageError;
use crate::expectation::{ExpectationId, Fault};
use crate::method::{Call, MethodDescriptor};
use crate::value::{TypeDescriptor, Value};
use serde::{Serialize, Serializer};
use std::sync::Arc;

// ============================================================================
// Mode and Call Log
// ============================================================================

/// Whether calls declare expectations or are matched against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Recording,
    Replaying,
}

/// A replay call as seen by the mock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCall {
    /// Position among all replay calls on the mock, starting at 0.
    pub sequence: u64,
    #[serde(serialize_with = "serialize_method")]
    pub method: Arc<MethodDescriptor>,
    pub args: Vec<Value>,
    /// Expectation that answered the call; `None` for unexpected calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<ExpectationId>,
}

fn serialize_method<S>(method: &Arc<MethodDescriptor>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&method.qualified_name())
}

impl RecordedCall {
    pub fn is_unexpected(&self) -> bool {
        self.matched.is_none()
    }

    /// `Type.method(args)` with the actual argument values.
    pub fn signature(&self) -> String {
        self.method.signature(&self.args)
    }
}

// ============================================================================
// Recording Slot
// ============================================================================

/// State of an expectation being declared through a setup call.
#[derive(Debug)]
pub(crate) enum PendingSlot {
    /// Waiting for the setup call. `cursor` follows the capture of the setup
    /// closure, when known; `start` is its position when the slot opened.
    Awaiting {
        cursor: Option<CaptureCursor>,
        start: usize,
    },
    /// The setup call arrived. `nested` is the mock handed back for
    /// recursive stubbing, if any; `matchers` counts the matchers captured
    /// for this call.
    Bound {
        call: Call,
        nested: Option<Mock>,
        matchers: usize,
    },
    /// The setup call was rejected; the error is reported again when the
    /// recording is finished.
    Failed(UsageError),
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Real implementation behind a partial mock, invoked for `CallOriginal`.
pub trait Target: Send + Sync {
    fn invoke(&self, call: &Call) -> Result<Value, Fault>;
}

impl<F> Target for F
where
    F: Fn(&Call) -> Result<Value, Fault> + Send + Sync,
{
    fn invoke(&self, call: &Call) -> Result<Value, Fault> {
        self(call)
    }
}

/// Capability to produce fresh mocks, used for recursive stubbing.
pub trait Mockable: Send + Sync {
    /// A new mock standing in for `ty`, or `None` if `ty` cannot be mocked.
    fn create_mock(&self, ty: &TypeDescriptor) -> Option<Mock>;
}
