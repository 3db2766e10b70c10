//! Constraint composition with AND, OR and NOT.

use super::leaf::{Leaf, PredicateFn};
use crate::value::{FromValue, TypeDescriptor, Value};
use regex::Regex;
use std::fmt;
use std::ops;
use std::sync::Arc;

/// Composable predicate over one argument value.
///
/// `eval` short-circuits; `message` always renders every operand.
#[derive(Debug, Clone)]
pub enum Constraint {
    Leaf(Leaf),
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
    Not(Box<Constraint>),
}

impl Constraint {
    pub fn anything() -> Self {
        Constraint::Leaf(Leaf::Anything)
    }

    pub fn equal(value: impl Into<Value>) -> Self {
        Constraint::Leaf(Leaf::Equal(value.into()))
    }

    pub fn null() -> Self {
        Constraint::Leaf(Leaf::Equal(Value::Null))
    }

    pub fn not_null() -> Self {
        Constraint::Leaf(Leaf::NotNull)
    }

    pub fn less_than(value: impl Into<Value>) -> Self {
        Constraint::Leaf(Leaf::LessThan(value.into()))
    }

    pub fn less_or_equal(value: impl Into<Value>) -> Self {
        Constraint::Leaf(Leaf::LessOrEqual(value.into()))
    }

    pub fn greater_than(value: impl Into<Value>) -> Self {
        Constraint::Leaf(Leaf::GreaterThan(value.into()))
    }

    pub fn greater_or_equal(value: impl Into<Value>) -> Self {
        Constraint::Leaf(Leaf::GreaterOrEqual(value.into()))
    }

    pub fn contains(text: impl Into<String>) -> Self {
        Constraint::Leaf(Leaf::Contains(text.into()))
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Constraint::Leaf(Leaf::StartsWith(prefix.into()))
    }

    pub fn ends_with(suffix: impl Into<String>) -> Self {
        Constraint::Leaf(Leaf::EndsWith(suffix.into()))
    }

    pub fn matches_regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Constraint::Leaf(Leaf::Matches(Arc::new(Regex::new(pattern)?))))
    }

    pub fn list_contains(item: impl Into<Value>) -> Self {
        Constraint::Leaf(Leaf::ListContains(item.into()))
    }

    pub fn type_of(ty: TypeDescriptor) -> Self {
        Constraint::Leaf(Leaf::TypeOf(ty))
    }

    pub fn predicate<T, F>(description: impl Into<String>, f: F) -> Self
    where
        T: FromValue + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Constraint::Leaf(Leaf::Predicate(PredicateFn::new(description, f)))
    }

    pub fn and(self, other: Constraint) -> Self {
        Constraint::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Constraint) -> Self {
        Constraint::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Constraint::Not(Box::new(self))
    }

    pub fn eval(&self, value: &Value) -> bool {
        match self {
            Constraint::Leaf(leaf) => leaf.eval(value),
            Constraint::And(left, right) => left.eval(value) && right.eval(value),
            Constraint::Or(left, right) => left.eval(value) || right.eval(value),
            Constraint::Not(inner) => !inner.eval(value),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Constraint::Leaf(leaf) => leaf.message(),
            Constraint::And(left, right) => format!("{} and {}", left.message(), right.message()),
            Constraint::Or(left, right) => format!("{} or {}", left.message(), right.message()),
            Constraint::Not(inner) => format!("not {}", inner.message()),
        }
    }

    /// Rendering used inside call signatures: an equality leaf shows its
    /// operand, every other constraint shows its message.
    pub fn describe_argument(&self) -> String {
        match self {
            Constraint::Leaf(Leaf::Equal(value)) => value.to_string(),
            other => other.message(),
        }
    }

    pub fn is_anything(&self) -> bool {
        matches!(self, Constraint::Leaf(Leaf::Anything))
    }

    /// Convert equality operands to the parameter type the constraint is
    /// applied to, so `equal(4)` on a float parameter matches `4.0`.
    pub(crate) fn coerce_operands(self, ty: &TypeDescriptor) -> Self {
        match self {
            Constraint::Leaf(Leaf::Equal(value)) => Constraint::equal(value.coerce_to(ty)),
            Constraint::Leaf(leaf) => Constraint::Leaf(leaf),
            Constraint::And(left, right) => left.coerce_operands(ty).and(right.coerce_operands(ty)),
            Constraint::Or(left, right) => left.coerce_operands(ty).or(right.coerce_operands(ty)),
            Constraint::Not(inner) => inner.coerce_operands(ty).negate(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl From<Leaf> for Constraint {
    fn from(leaf: Leaf) -> Self {
        Constraint::Leaf(leaf)
    }
}

impl ops::BitAnd for Constraint {
    type Output = Constraint;

    fn bitand(self, rhs: Constraint) -> Constraint {
        self.and(rhs)
    }
}

impl ops::BitOr for Constraint {
    type Output = Constraint;

    fn bitor(self, rhs: Constraint) -> Constraint {
        self.or(rhs)
    }
}

impl ops::Not for Constraint {
    type Output = Constraint;

    fn not(self) -> Constraint {
        self.negate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_and() {
        let c = Constraint::greater_than(1) & Constraint::less_than(5);
        assert!(c.eval(&Value::from(3)));
        assert!(!c.eval(&Value::from(5)));
        assert!(!c.eval(&Value::from(0)));
        assert_eq!(c.message(), "greater than 1 and less than 5");
    }

    #[test]
    fn test_or() {
        let c = Constraint::equal("foo") | Constraint::equal("bar");
        assert!(c.eval(&Value::from("foo")));
        assert!(c.eval(&Value::from("bar")));
        assert!(!c.eval(&Value::from("baz")));
        assert!(!c.eval(&Value::Null));
        assert_eq!(c.message(), "equal to \"foo\" or equal to \"bar\"");
    }

    #[test]
    fn test_not() {
        let c = !Constraint::null();
        assert!(c.eval(&Value::from(1)));
        assert!(!c.eval(&Value::Null));
        assert_eq!(c.message(), "not equal to null");
    }

    #[test]
    fn test_nested() {
        // not (foo or bar)
        let c = (Constraint::equal("foo") | Constraint::equal("bar")).negate();
        assert!(!c.eval(&Value::from("foo")));
        assert!(c.eval(&Value::from("baz")));
        assert_eq!(c.message(), "not equal to \"foo\" or equal to \"bar\"");
    }

    #[test]
    fn test_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counting = Constraint::predicate("counted", move |_: &Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        let and = Constraint::equal(1).and(counting.clone());
        assert!(!and.eval(&Value::from(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let or = Constraint::anything().or(counting.clone());
        assert!(or.eval(&Value::from(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Messages compose fully even when evaluation stops early.
        assert_eq!(and.message(), "equal to 1 and counted");
        assert_eq!(or.message(), "anything or counted");
    }

    #[test]
    fn test_describe_argument() {
        assert_eq!(Constraint::equal("a").describe_argument(), "\"a\"");
        assert_eq!(Constraint::equal(3.14).describe_argument(), "3.14");
        assert_eq!(Constraint::null().describe_argument(), "null");
        assert_eq!(Constraint::anything().describe_argument(), "anything");
        assert_eq!(
            Constraint::starts_with("x").describe_argument(),
            "starts with \"x\""
        );
    }

    #[test]
    fn test_invalid_regex() {
        assert!(Constraint::matches_regex("(unclosed").is_err());
    }
}
