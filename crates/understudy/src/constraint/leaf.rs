//! Leaf constraints: single predicates over one argument value.

use crate::value::{FromValue, TypeDescriptor, Value};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// User predicate wrapped with its declared input type.
#[derive(Clone)]
pub struct PredicateFn {
    description: String,
    input: TypeDescriptor,
    func: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl PredicateFn {
    /// Wrap `f`; values that cannot be extracted as `T` never reach it.
    pub fn new<T, F>(description: impl Into<String>, f: F) -> Self
    where
        T: FromValue + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            input: T::type_descriptor(),
            func: Arc::new(move |value| T::from_value(value).is_some_and(|typed| f(&typed))),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_type(&self) -> &TypeDescriptor {
        &self.input
    }

    pub fn call(&self, value: &Value) -> bool {
        (self.func)(value)
    }
}

impl fmt::Debug for PredicateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateFn")
            .field("description", &self.description)
            .field("input", &self.input)
            .finish()
    }
}

/// Predicate over a single value.
#[derive(Debug, Clone)]
pub enum Leaf {
    Anything,
    Equal(Value),
    NotNull,
    LessThan(Value),
    LessOrEqual(Value),
    GreaterThan(Value),
    GreaterOrEqual(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Matches(Arc<Regex>),
    /// The value is a list holding an element equal to the operand.
    ListContains(Value),
    /// The value's runtime type is the given type or one of its subtypes.
    TypeOf(TypeDescriptor),
    Predicate(PredicateFn),
}

impl Leaf {
    /// Evaluate against a value. Total for every input, null included.
    pub fn eval(&self, value: &Value) -> bool {
        match self {
            Leaf::Anything => true,
            Leaf::Equal(expected) => value == expected,
            Leaf::NotNull => !value.is_null(),
            Leaf::LessThan(bound) => matches!(value.compare(bound), Some(Ordering::Less)),
            Leaf::LessOrEqual(bound) => {
                matches!(value.compare(bound), Some(Ordering::Less | Ordering::Equal))
            }
            Leaf::GreaterThan(bound) => matches!(value.compare(bound), Some(Ordering::Greater)),
            Leaf::GreaterOrEqual(bound) => matches!(
                value.compare(bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Leaf::Contains(needle) => value
                .as_text()
                .is_some_and(|text| text.contains(needle.as_str())),
            Leaf::StartsWith(prefix) => value
                .as_text()
                .is_some_and(|text| text.starts_with(prefix.as_str())),
            Leaf::EndsWith(suffix) => value
                .as_text()
                .is_some_and(|text| text.ends_with(suffix.as_str())),
            Leaf::Matches(regex) => value.as_text().is_some_and(|text| regex.is_match(&text)),
            // Lists carry no element type, so numbers match by value.
            Leaf::ListContains(item) => value.as_list().is_some_and(|items| {
                items
                    .iter()
                    .any(|i| i.compare(item).map_or(i == item, Ordering::is_eq))
            }),
            Leaf::TypeOf(ty) => value
                .type_descriptor()
                .is_some_and(|actual| actual.is_assignable_to(ty)),
            Leaf::Predicate(predicate) => predicate.call(value),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Leaf::Anything => "anything".to_string(),
            Leaf::Equal(v) => format!("equal to {v}"),
            Leaf::NotNull => "not null".to_string(),
            Leaf::LessThan(v) => format!("less than {v}"),
            Leaf::LessOrEqual(v) => format!("less than or equal to {v}"),
            Leaf::GreaterThan(v) => format!("greater than {v}"),
            Leaf::GreaterOrEqual(v) => format!("greater than or equal to {v}"),
            Leaf::Contains(s) => format!("contains \"{s}\""),
            Leaf::StartsWith(s) => format!("starts with \"{s}\""),
            Leaf::EndsWith(s) => format!("ends with \"{s}\""),
            Leaf::Matches(regex) => format!("matches regex \"{}\"", regex.as_str()),
            Leaf::ListContains(v) => format!("list containing {v}"),
            Leaf::TypeOf(ty) => format!("type of {ty}"),
            Leaf::Predicate(predicate) => predicate.description().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    #[test]
    fn test_equal() {
        let leaf = Leaf::Equal(Value::from(5));
        assert!(leaf.eval(&Value::from(5)));
        assert!(!leaf.eval(&Value::from(6)));
        assert!(!leaf.eval(&Value::from(5.0)));
        assert!(!leaf.eval(&Value::Null));
        assert!(Leaf::Equal(Value::Null).eval(&Value::Null));
    }

    #[test]
    fn test_ordering() {
        let less = Leaf::LessThan(Value::from(10));
        assert!(less.eval(&Value::from(9)));
        assert!(less.eval(&Value::from(9.5)));
        assert!(!less.eval(&Value::from(10)));

        let at_most = Leaf::LessOrEqual(Value::from(10));
        assert!(at_most.eval(&Value::from(10)));
        assert!(!at_most.eval(&Value::from(11)));

        let greater = Leaf::GreaterThan(Value::from("m"));
        assert!(greater.eval(&Value::from("z")));
        assert!(!greater.eval(&Value::from("a")));

        let at_least = Leaf::GreaterOrEqual(Value::from(1));
        assert!(at_least.eval(&Value::from(1)));
    }

    #[test]
    fn test_ordering_non_comparable_is_false() {
        let less = Leaf::LessThan(Value::from(10));
        assert!(!less.eval(&Value::Null));
        assert!(!less.eval(&Value::from("5")));
        assert!(!less.eval(&Value::from(vec![1])));
        assert!(!Leaf::GreaterOrEqual(Value::from(0)).eval(&Value::from(true)));
    }

    #[test]
    fn test_string_constraints_use_text() {
        assert!(Leaf::Contains("ell".into()).eval(&Value::from("hello")));
        assert!(Leaf::Contains("12".into()).eval(&Value::from(3121)));
        assert!(Leaf::StartsWith("he".into()).eval(&Value::from("hello")));
        assert!(!Leaf::StartsWith("lo".into()).eval(&Value::from("hello")));
        assert!(Leaf::EndsWith("lo".into()).eval(&Value::from("hello")));
    }

    #[test]
    fn test_string_constraints_reject_null() {
        assert!(!Leaf::Contains(String::new()).eval(&Value::Null));
        assert!(!Leaf::StartsWith(String::new()).eval(&Value::Null));
        assert!(!Leaf::EndsWith(String::new()).eval(&Value::Null));
        let regex = Leaf::Matches(Arc::new(Regex::new(".*").unwrap()));
        assert!(!regex.eval(&Value::Null));
    }

    #[test]
    fn test_regex() {
        let leaf = Leaf::Matches(Arc::new(Regex::new(r"^order-\d+$").unwrap()));
        assert!(leaf.eval(&Value::from("order-42")));
        assert!(!leaf.eval(&Value::from("order-x")));
        assert_eq!(leaf.message(), "matches regex \"^order-\\d+$\"");
    }

    #[test]
    fn test_type_of() {
        let shape = TypeDescriptor::object("Shape");
        let square = TypeDescriptor::object("Square").extends(shape.clone());
        let leaf = Leaf::TypeOf(shape);

        assert!(leaf.eval(&Value::from(Object::new(square))));
        assert!(!leaf.eval(&Value::from(Object::new(TypeDescriptor::object("Line")))));
        assert!(!leaf.eval(&Value::Null));
        assert!(Leaf::TypeOf(TypeDescriptor::int()).eval(&Value::from(1)));
    }

    #[test]
    fn test_predicate_fails_closed_on_type_mismatch() {
        let leaf = Leaf::Predicate(PredicateFn::new("even number", |n: &i64| n % 2 == 0));
        assert!(leaf.eval(&Value::from(4)));
        assert!(!leaf.eval(&Value::from(3)));
        assert!(!leaf.eval(&Value::from("4")));
        assert!(!leaf.eval(&Value::Null));
        assert_eq!(leaf.message(), "even number");
    }

    #[test]
    fn test_list_contains() {
        let leaf = Leaf::ListContains(Value::from("b"));
        assert!(leaf.eval(&Value::from(vec!["a", "b"])));
        assert!(!leaf.eval(&Value::from(vec!["a"])));
        assert!(!leaf.eval(&Value::from("b")));

        let number = Leaf::ListContains(Value::from(2));
        assert!(number.eval(&Value::from(vec![1.5, 2.0])));
        assert!(!number.eval(&Value::from(vec![2.5])));
    }

    #[test]
    fn test_messages() {
        assert_eq!(Leaf::Anything.message(), "anything");
        assert_eq!(Leaf::Equal(Value::from("a")).message(), "equal to \"a\"");
        assert_eq!(Leaf::Equal(Value::Null).message(), "equal to null");
        assert_eq!(Leaf::LessThan(Value::from(3)).message(), "less than 3");
        assert_eq!(
            Leaf::GreaterOrEqual(Value::from(3)).message(),
            "greater than or equal to 3"
        );
        assert_eq!(Leaf::Contains("x".into()).message(), "contains \"x\"");
        assert_eq!(
            Leaf::TypeOf(TypeDescriptor::object("Shape")).message(),
            "type of Shape"
        );
    }
}
