//! Declarative expectation scripts.
//!
//! A script lists expectations as data and records them on a mock:
//!
//! ```yaml
//! expectations:
//!   - method: Calculator.add
//!     args: [{equals: 1}, {greaterThan: 0}]
//!     returns: 3
//!     repeat: twice
//!   - method: divide
//!     ignoreArguments: true
//!     throws: {kind: DivideByZero, message: "b was 0"}
//! ```

use crate::capture::ArgumentSpec;
use crate::config::{load_document, parse_yaml};
use crate::constraint::ConstraintSpec;
use crate::error::UsageError;
use crate::expectation::{ExpectationId, Fault, ResponsePolicy};
use crate::method::MethodDescriptor;
use crate::mock::Mock;
use crate::repeat::{Repeat, RepeatSpec};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationScript {
    #[serde(default)]
    pub expectations: Vec<ScriptedExpectation>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedExpectation {
    /// `name` or `Type.name`
    pub method: String,

    /// One constraint per parameter. Without it any arguments match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<ConstraintSpec>>,

    #[serde(default)]
    pub ignore_arguments: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throws: Option<Fault>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatSpec>,
}

impl ExpectationScript {
    /// Load from a file; `.json` files are read as JSON, anything else as
    /// YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        load_document(path.as_ref(), "expectation script")
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        Ok(parse_yaml(contents)?)
    }

    /// Record every scripted expectation on `mock`, resolving method names
    /// against `methods`. Stops at the first invalid entry; entries before
    /// it stay recorded.
    pub fn apply(
        &self,
        mock: &Mock,
        methods: &[Arc<MethodDescriptor>],
    ) -> Result<Vec<ExpectationId>, UsageError> {
        let mut ids = Vec::with_capacity(self.expectations.len());
        for scripted in &self.expectations {
            let id = scripted.apply(mock, methods)?;
            ids.push(id);
        }
        debug!(
            "Applied {} scripted expectations to {}",
            ids.len(),
            mock.name()
        );
        Ok(ids)
    }
}

impl ScriptedExpectation {
    fn apply(
        &self,
        mock: &Mock,
        methods: &[Arc<MethodDescriptor>],
    ) -> Result<ExpectationId, UsageError> {
        let method = self.resolve_method(methods)?;
        let args = match (&self.args, self.ignore_arguments) {
            (_, true) | (None, false) => ArgumentSpec::Ignored,
            (Some(specs), false) => ArgumentSpec::from_specs(specs)?,
        };
        let policy = match (&self.returns, &self.throws) {
            (Some(_), Some(_)) => return Err(UsageError::ConflictingResponses(self.method.clone())),
            (Some(value), None) => ResponsePolicy::ReturnValue(
                Value::from(value.clone()).coerce_to(method.return_type()),
            ),
            (None, Some(fault)) => ResponsePolicy::Throw(fault.clone()),
            (None, None) => ResponsePolicy::Default,
        };
        let repeat = self.repeat.map(Repeat::from).unwrap_or_default();
        mock.record_expectation(method, args, policy, repeat)
    }

    /// Find the single method named by `self.method`. When the name matches
    /// several overloads, the number of `args` picks one.
    fn resolve_method(
        &self,
        methods: &[Arc<MethodDescriptor>],
    ) -> Result<Arc<MethodDescriptor>, UsageError> {
        let (type_name, name) = match self.method.rsplit_once('.') {
            Some((ty, name)) => (Some(ty), name),
            None => (None, self.method.as_str()),
        };
        let mut candidates: Vec<&Arc<MethodDescriptor>> = methods
            .iter()
            .filter(|m| m.name() == name)
            .filter(|m| type_name.map_or(true, |ty| m.declaring_type().name() == ty))
            .collect();
        if candidates.len() > 1 {
            if let Some(args) = &self.args {
                candidates.retain(|m| m.arity() == args.len());
            }
        }
        match candidates.as_slice() {
            [] => Err(UsageError::UnknownMethod(self.method.clone())),
            [method] => Ok(Arc::clone(method)),
            _ => Err(UsageError::AmbiguousMethod(self.method.clone())),
        }
    }
}
