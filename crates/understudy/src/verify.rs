//! Verification and failure reporting.
//!
//! Violations are collected into a [`VerificationReport`] and rendered one
//! per line. The unsatisfied-expectation line is
//! `Type.method(1, "a"); Expected #3, Actual #2.`

use crate::expectation::Expectation;
use serde::Serialize;
use std::fmt;

/// One reason verification or an assertion failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    /// An expectation was hit fewer times than its minimum.
    Unsatisfied {
        signature: String,
        expected: u32,
        actual: u32,
    },
    /// Calls that matched no expectation, grouped by signature.
    Unexpected { signature: String, actual: usize },
    /// A call asserted to have happened was never made.
    Missing { signature: String },
    /// A call asserted not to have happened was made.
    Forbidden { signature: String, actual: usize },
    /// A call was made a number of times outside the asserted range.
    CountMismatch {
        signature: String,
        expected: String,
        actual: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Unsatisfied {
                signature,
                expected,
                actual,
            } => write!(f, "{signature}; Expected #{expected}, Actual #{actual}."),
            Violation::Unexpected { signature, actual } => {
                write!(f, "{signature}; Expected #0, Actual #{actual}.")
            }
            Violation::Missing { signature } => write!(
                f,
                "Expected that {signature} would be called, but it was not found."
            ),
            Violation::Forbidden { signature, actual } => write!(
                f,
                "Expected that {signature} would not be called, but it was found {actual} time(s)."
            ),
            Violation::CountMismatch {
                signature,
                expected,
                actual,
            } => write!(
                f,
                "Expected that {signature} would be called {expected} time(s), but it was found {actual} time(s)."
            ),
        }
    }
}

/// Aggregated violations, rendered as a multi-line report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{report}")]
pub struct VerificationError {
    pub violations: Vec<Violation>,
    pub report: String,
}

impl VerificationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        let report = violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self { violations, report }
    }
}

/// Collects violations across expectations and mocks.
#[derive(Debug, Default, Serialize)]
pub struct VerificationReport {
    pub violations: Vec<Violation>,
    /// Number of mocks checked.
    pub mocks_checked: usize,
    /// Number of expectations checked.
    pub expectations_checked: usize,
}

impl VerificationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn merge(&mut self, other: VerificationReport) {
        self.violations.extend(other.violations);
        self.mocks_checked += other.mocks_checked;
        self.expectations_checked += other.expectations_checked;
    }

    pub fn into_result(self) -> Result<(), VerificationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(VerificationError::new(self.violations))
        }
    }
}

/// Check every expectation's lower bound.
pub(crate) fn verify_expectations<'a>(
    expectations: impl IntoIterator<Item = &'a Expectation>,
) -> VerificationReport {
    let mut report = VerificationReport::new();
    report.mocks_checked = 1;
    for expectation in expectations {
        report.expectations_checked += 1;
        if !expectation.is_satisfied() {
            report.add(Violation::Unsatisfied {
                signature: expectation.signature(),
                expected: expectation.repeat().min(),
                actual: expectation.actual_count(),
            });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsatisfied_line_format() {
        let violation = Violation::Unsatisfied {
            signature: "Calculator.m(1, \"a\", 3.14)".to_string(),
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            violation.to_string(),
            "Calculator.m(1, \"a\", 3.14); Expected #3, Actual #2."
        );
    }

    #[test]
    fn test_assertion_line_formats() {
        let missing = Violation::Missing {
            signature: "Calculator.add(1, 2)".to_string(),
        };
        assert_eq!(
            missing.to_string(),
            "Expected that Calculator.add(1, 2) would be called, but it was not found."
        );

        let forbidden = Violation::Forbidden {
            signature: "Calculator.reset()".to_string(),
            actual: 2,
        };
        assert_eq!(
            forbidden.to_string(),
            "Expected that Calculator.reset() would not be called, but it was found 2 time(s)."
        );

        let unexpected = Violation::Unexpected {
            signature: "Calculator.add(5, 5)".to_string(),
            actual: 1,
        };
        assert_eq!(
            unexpected.to_string(),
            "Calculator.add(5, 5); Expected #0, Actual #1."
        );
    }

    #[test]
    fn test_report_joins_lines() {
        let mut report = VerificationReport::new();
        assert!(report.is_valid());
        report.add(Violation::Missing {
            signature: "A.a()".to_string(),
        });
        let mut other = VerificationReport::new();
        other.add(Violation::Missing {
            signature: "B.b()".to_string(),
        });
        report.merge(other);

        let err = report.into_result().unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert_eq!(
            err.to_string(),
            "Expected that A.a() would be called, but it was not found.\n\
             Expected that B.b() would be called, but it was not found."
        );
    }

    #[test]
    fn test_violation_serializes_with_kind_tag() {
        let violation = Violation::Unsatisfied {
            signature: "A.a()".to_string(),
            expected: 1,
            actual: 0,
        };
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["kind"], "unsatisfied");
        assert_eq!(json["expected"], 1);
    }
}
