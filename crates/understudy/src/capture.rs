//! Argument capture for expectation setup.
//!
//! An expectation is declared by making the call itself inside a setup
//! closure. Matchers cannot be passed as ordinary arguments without breaking
//! the call's types, so each matcher method records a [`Constraint`] on the
//! [`ArgCapture`] handed to the closure and returns a placeholder of the
//! argument's type:
//!
//! ```ignore
//! mock.expect(|arg| {
//!     calculator.add(arg.any(), arg.eq(3));
//! })?;
//! ```
//!
//! The capture belongs to one setup closure. When the closure chains calls
//! through nested mocks, each call receives the matchers recorded before it
//! was made and after the previous link.

use crate::constraint::{Constraint, ConstraintSpec};
use crate::error::UsageError;
use crate::method::{Direction, MethodDescriptor};
use crate::value::{FromValue, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Number of matchers recorded on a capture, readable by the mocks the
/// setup closure calls into.
#[derive(Debug, Clone, Default)]
pub(crate) struct CaptureCursor(Arc<AtomicUsize>);

impl CaptureCursor {
    fn advance(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn position(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ordered matcher list for one setup call.
#[derive(Debug, Default)]
pub struct ArgCapture {
    constraints: Vec<Constraint>,
    cursor: CaptureCursor,
}

impl ArgCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match any value.
    pub fn any<T: Default>(&mut self) -> T {
        self.is(Constraint::anything())
    }

    /// Match values equal to `value`; the value itself is passed through.
    pub fn eq<T>(&mut self, value: T) -> T
    where
        T: Clone + Into<Value>,
    {
        self.push(Constraint::equal(value.clone()));
        value
    }

    /// Match with an arbitrary constraint.
    pub fn is<T: Default>(&mut self, constraint: Constraint) -> T {
        self.push(constraint);
        T::default()
    }

    /// Match values accepted by `f`.
    pub fn matching<T, F>(&mut self, description: &str, f: F) -> T
    where
        T: FromValue + Default + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.is(Constraint::predicate(description, f))
    }

    /// Placeholder for an out parameter; matches anything.
    pub fn out<T: Default>(&mut self) -> T {
        self.any()
    }

    fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
        self.cursor.advance();
    }

    pub(crate) fn cursor(&self) -> &CaptureCursor {
        &self.cursor
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn into_constraints(self) -> Vec<Constraint> {
        self.constraints
    }
}

/// Argument matching supplied when recording an expectation without a
/// setup call.
#[derive(Debug, Clone)]
pub enum ArgumentSpec {
    /// Literal values; each becomes an equality constraint.
    Literal(Vec<Value>),
    Constraints(Vec<Constraint>),
    /// Match any arguments.
    Ignored,
}

impl ArgumentSpec {
    /// Compile script constraint specs.
    pub fn from_specs(specs: &[ConstraintSpec]) -> Result<Self, UsageError> {
        let compiled: Result<Vec<_>, _> = specs.iter().map(Constraint::compile).collect();
        Ok(ArgumentSpec::Constraints(compiled?))
    }

    pub(crate) fn resolve(self, method: &MethodDescriptor) -> Result<Vec<Constraint>, UsageError> {
        match self {
            ArgumentSpec::Literal(args) => {
                check_argument_count(method, args.len())?;
                Ok(literal_constraints(method, &args))
            }
            ArgumentSpec::Constraints(constraints) => fit_constraints(method, constraints),
            ArgumentSpec::Ignored => Ok(anything(method)),
        }
    }
}

/// Turn the matchers captured during a setup call into the expectation's
/// constraint list, synthesizing literal constraints when none were used.
pub(crate) fn resolve_captured(
    method: &MethodDescriptor,
    args: &[Value],
    captured: Vec<Constraint>,
) -> Result<Vec<Constraint>, UsageError> {
    if captured.is_empty() {
        return Ok(literal_constraints(method, args));
    }
    fit_constraints(method, captured)
}

pub(crate) fn literal_constraints(method: &MethodDescriptor, args: &[Value]) -> Vec<Constraint> {
    method
        .parameters()
        .iter()
        .zip(args)
        .map(|(param, arg)| match param.direction {
            Direction::Out => Constraint::anything(),
            Direction::In | Direction::Ref => {
                Constraint::equal(arg.clone().coerce_to(&param.ty))
            }
        })
        .collect()
}

/// Check one constraint per parameter and convert equality operands to the
/// parameter types.
pub(crate) fn fit_constraints(
    method: &MethodDescriptor,
    constraints: Vec<Constraint>,
) -> Result<Vec<Constraint>, UsageError> {
    check_constraint_arity(method, constraints.len())?;
    Ok(method
        .parameters()
        .iter()
        .zip(constraints)
        .map(|(param, constraint)| constraint.coerce_operands(&param.ty))
        .collect())
}

pub(crate) fn anything(method: &MethodDescriptor) -> Vec<Constraint> {
    (0..method.arity()).map(|_| Constraint::anything()).collect()
}

pub(crate) fn check_constraint_arity(
    method: &MethodDescriptor,
    actual: usize,
) -> Result<(), UsageError> {
    if actual != method.arity() {
        return Err(UsageError::ConstraintArity {
            method: method.qualified_name(),
            expected: method.arity(),
            actual,
        });
    }
    Ok(())
}

pub(crate) fn check_argument_count(method: &MethodDescriptor, actual: usize) -> Result<(), UsageError> {
    if actual != method.arity() {
        return Err(UsageError::ArgumentCount {
            method: method.qualified_name(),
            expected: method.arity(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeDescriptor;

    fn transfer() -> MethodDescriptor {
        MethodDescriptor::method(TypeDescriptor::object("Bank"), "transfer")
            .param("from", TypeDescriptor::string())
            .param("amount", TypeDescriptor::int())
            .out_param("receipt", TypeDescriptor::string())
    }

    #[test]
    fn test_matchers_return_placeholders() {
        let mut capture = ArgCapture::new();
        let from: String = capture.eq("alice".to_string());
        let amount: i64 = capture.any();
        let receipt: String = capture.out();

        assert_eq!(from, "alice");
        assert_eq!(amount, 0);
        assert_eq!(receipt, "");
        assert_eq!(capture.len(), 3);
        assert_eq!(capture.constraints()[0].message(), "equal to \"alice\"");
        assert!(capture.constraints()[1].is_anything());
    }

    #[test]
    fn test_matching_records_predicate() {
        let mut capture = ArgCapture::new();
        let _: i64 = capture.matching("positive", |n: &i64| *n > 0);
        let constraint = &capture.constraints()[0];
        assert!(constraint.eval(&Value::from(5)));
        assert!(!constraint.eval(&Value::from(-5)));
        assert_eq!(constraint.message(), "positive");
    }

    #[test]
    fn test_literal_synthesis_skips_out_parameters() {
        let method = transfer();
        let args = vec![Value::from("alice"), Value::from(10), Value::Null];
        let constraints = resolve_captured(&method, &args, Vec::new()).unwrap();

        assert_eq!(constraints.len(), 3);
        assert!(constraints[0].eval(&Value::from("alice")));
        assert!(!constraints[0].eval(&Value::from("bob")));
        assert!(constraints[1].eval(&Value::from(10)));
        assert!(constraints[2].is_anything());
    }

    #[test]
    fn test_captured_arity_mismatch_is_usage_error() {
        let method = transfer();
        let args = vec![Value::from("alice"), Value::from(10), Value::Null];
        let err = resolve_captured(&method, &args, vec![Constraint::anything()]).unwrap_err();
        assert!(matches!(
            err,
            UsageError::ConstraintArity {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_argument_spec_resolution() {
        let method = transfer();
        assert_eq!(ArgumentSpec::Ignored.resolve(&method).unwrap().len(), 3);
        assert!(matches!(
            ArgumentSpec::Literal(vec![Value::from(1)]).resolve(&method),
            Err(UsageError::ArgumentCount { .. })
        ));
        let specs = vec![
            ConstraintSpec::StartsWith("al".to_string()),
            ConstraintSpec::GreaterThan(serde_json::json!(0)),
            ConstraintSpec::Anything,
        ];
        let constraints = ArgumentSpec::from_specs(&specs)
            .unwrap()
            .resolve(&method)
            .unwrap();
        assert!(constraints[0].eval(&Value::from("alice")));
        assert!(!constraints[1].eval(&Value::from(0)));
    }

    #[test]
    fn test_integer_operands_fit_float_parameters() {
        let sqrt = MethodDescriptor::method(TypeDescriptor::object("Calculator"), "sqrt")
            .param("x", TypeDescriptor::float())
            .returns(TypeDescriptor::float());

        let literal = ArgumentSpec::Literal(vec![Value::from(4)])
            .resolve(&sqrt)
            .unwrap();
        assert!(literal[0].eval(&Value::from(4.0)));

        let specs = vec![ConstraintSpec::Or(vec![
            ConstraintSpec::Equals(serde_json::json!(4)),
            ConstraintSpec::Not(Box::new(ConstraintSpec::Equals(serde_json::json!(9)))),
        ])];
        let scripted = ArgumentSpec::from_specs(&specs)
            .unwrap()
            .resolve(&sqrt)
            .unwrap();
        assert!(scripted[0].eval(&Value::from(4.0)));
        assert!(!scripted[0].eval(&Value::from(9.0)));

        let captured = resolve_captured(&sqrt, &[Value::from(0.0)], vec![Constraint::equal(4)])
            .unwrap();
        assert!(captured[0].eval(&Value::from(4.0)));
        assert_eq!(captured[0].describe_argument(), "4");
    }
}
