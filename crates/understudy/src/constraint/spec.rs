//! Serializable constraint descriptions.
//!
//! Expectation scripts describe argument constraints as data, e.g.
//! `{"greaterThan": 3}` or `{"not": {"contains": "x"}}`. A
//! [`ConstraintSpec`] is compiled into a [`Constraint`] once, when the script
//! is applied.

use super::logical::Constraint;
use crate::value::{TypeDescriptor, Value};
use serde::{Deserialize, Serialize};

/// Constraint configuration, deserialized from scripts.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintSpec {
    Anything,
    Null,
    NotNull,
    Equals(serde_json::Value),
    LessThan(serde_json::Value),
    LessOrEqual(serde_json::Value),
    GreaterThan(serde_json::Value),
    GreaterOrEqual(serde_json::Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Matches(String),
    ListContains(serde_json::Value),
    /// Type name; built-in names (`int`, `string`, ...) resolve to built-ins.
    TypeOf(String),
    Not(Box<ConstraintSpec>),
    /// Every inner constraint must hold; an empty list matches anything.
    And(Vec<ConstraintSpec>),
    /// At least one inner constraint must hold; an empty list matches nothing.
    Or(Vec<ConstraintSpec>),
}

impl Default for ConstraintSpec {
    fn default() -> Self {
        ConstraintSpec::Anything
    }
}

impl Constraint {
    /// Compile a [`ConstraintSpec`] into its runtime form.
    pub fn compile(spec: &ConstraintSpec) -> Result<Self, regex::Error> {
        let value = |v: &serde_json::Value| Value::from(v.clone());
        Ok(match spec {
            ConstraintSpec::Anything => Constraint::anything(),
            ConstraintSpec::Null => Constraint::null(),
            ConstraintSpec::NotNull => Constraint::not_null(),
            ConstraintSpec::Equals(v) => Constraint::equal(value(v)),
            ConstraintSpec::LessThan(v) => Constraint::less_than(value(v)),
            ConstraintSpec::LessOrEqual(v) => Constraint::less_or_equal(value(v)),
            ConstraintSpec::GreaterThan(v) => Constraint::greater_than(value(v)),
            ConstraintSpec::GreaterOrEqual(v) => Constraint::greater_or_equal(value(v)),
            ConstraintSpec::Contains(s) => Constraint::contains(s.as_str()),
            ConstraintSpec::StartsWith(s) => Constraint::starts_with(s.as_str()),
            ConstraintSpec::EndsWith(s) => Constraint::ends_with(s.as_str()),
            ConstraintSpec::Matches(pattern) => Constraint::matches_regex(pattern)?,
            ConstraintSpec::ListContains(v) => Constraint::list_contains(value(v)),
            ConstraintSpec::TypeOf(name) => Constraint::type_of(TypeDescriptor::named(name)),
            ConstraintSpec::Not(inner) => Self::compile(inner)?.negate(),
            ConstraintSpec::And(specs) => {
                let compiled: Result<Vec<_>, _> = specs.iter().map(Self::compile).collect();
                compiled?
                    .into_iter()
                    .reduce(Constraint::and)
                    .unwrap_or_else(Constraint::anything)
            }
            ConstraintSpec::Or(specs) => {
                let compiled: Result<Vec<_>, _> = specs.iter().map(Self::compile).collect();
                compiled?
                    .into_iter()
                    .reduce(Constraint::or)
                    .unwrap_or_else(|| Constraint::anything().negate())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_serde() {
        let spec: ConstraintSpec = serde_json::from_str(r#"{"equals": 1}"#).unwrap();
        assert_eq!(spec, ConstraintSpec::Equals(serde_json::json!(1)));

        let spec: ConstraintSpec = serde_json::from_str(r#""anything""#).unwrap();
        assert_eq!(spec, ConstraintSpec::Anything);

        let spec: ConstraintSpec = serde_json::from_str(r#"{"startsWith": "/api"}"#).unwrap();
        assert_eq!(spec, ConstraintSpec::StartsWith("/api".to_string()));

        let spec: ConstraintSpec =
            serde_json::from_str(r#"{"not": {"typeOf": "Shape"}}"#).unwrap();
        assert_eq!(
            spec,
            ConstraintSpec::Not(Box::new(ConstraintSpec::TypeOf("Shape".to_string())))
        );
    }

    #[test]
    fn test_spec_from_yaml() {
        let yaml = r#"
and:
  - greaterOrEqual: 1
  - lessThan: 10
"#;
        let spec: ConstraintSpec = crate::config::parse_yaml(yaml).unwrap();
        let constraint = Constraint::compile(&spec).unwrap();
        assert!(constraint.eval(&Value::from(1)));
        assert!(!constraint.eval(&Value::from(10)));
        assert_eq!(
            constraint.message(),
            "greater than or equal to 1 and less than 10"
        );
    }

    #[test]
    fn test_compile_or_and_not() {
        let spec = ConstraintSpec::Or(vec![
            ConstraintSpec::Contains("admin".to_string()),
            ConstraintSpec::Not(Box::new(ConstraintSpec::NotNull)),
        ]);
        let constraint = Constraint::compile(&spec).unwrap();
        assert!(constraint.eval(&Value::from("superadmin")));
        assert!(constraint.eval(&Value::Null));
        assert!(!constraint.eval(&Value::from("guest")));
    }

    #[test]
    fn test_compile_empty_groups() {
        let all = Constraint::compile(&ConstraintSpec::And(vec![])).unwrap();
        let none = Constraint::compile(&ConstraintSpec::Or(vec![])).unwrap();
        assert!(all.eval(&Value::from(1)));
        assert!(!none.eval(&Value::from(1)));
    }

    #[test]
    fn test_compile_builtin_type_names() {
        let constraint = Constraint::compile(&ConstraintSpec::TypeOf("int".to_string())).unwrap();
        assert!(constraint.eval(&Value::from(3)));
        assert!(!constraint.eval(&Value::from("3")));
    }

    #[test]
    fn test_compile_bad_regex() {
        let result = Constraint::compile(&ConstraintSpec::Matches("[".to_string()));
        assert!(result.is_err());
    }
}
