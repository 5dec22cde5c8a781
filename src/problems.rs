//! Diagnostics reported while validating feed data.
//!
//! Validation never aborts on bad data. Every finding goes to a
//! [`ProblemSink`] supplied by the caller, who decides what is fatal.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

pub trait ProblemSink {
    fn missing_value(&mut self, field: &str);
    fn invalid_value(&mut self, field: &str, value: &str, detail: Option<&str>);
    fn duplicate_id(&mut self, key_fields: &[&str], key_values: &[&str], severity: Severity);
    fn other_problem(&mut self, message: &str, severity: Severity);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    MissingValue {
        field: String,
    },
    InvalidValue {
        field: String,
        value: String,
        detail: Option<String>,
    },
    DuplicateId {
        key_fields: Vec<String>,
        key_values: Vec<String>,
        severity: Severity,
    },
    Other {
        message: String,
        severity: Severity,
    },
}

impl Problem {
    /// Missing and invalid values are errors; the rest carry their own severity.
    pub fn severity(&self) -> Severity {
        match self {
            Problem::MissingValue { .. } | Problem::InvalidValue { .. } => Severity::Error,
            Problem::DuplicateId { severity, .. } | Problem::Other { severity, .. } => *severity,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::MissingValue { field } => write!(f, "missing value for field '{field}'"),
            Problem::InvalidValue {
                field,
                value,
                detail,
            } => {
                write!(f, "invalid value '{value}' for field '{field}'")?;
                if let Some(detail) = detail {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
            Problem::DuplicateId {
                key_fields,
                key_values,
                ..
            } => write!(
                f,
                "duplicate ({}) = ({})",
                key_fields.join(", "),
                key_values.join(", ")
            ),
            Problem::Other { message, .. } => f.write_str(message),
        }
    }
}

/// Sink that keeps every problem in report order.
#[derive(Debug, Default, Clone)]
pub struct ProblemCollector {
    problems: Vec<Problem>,
}

impl ProblemCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, problem: Problem) {
        match problem.severity() {
            Severity::Warning => debug!(%problem, "feed warning"),
            Severity::Error => warn!(%problem, "feed error"),
        }
        self.problems.push(problem);
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| p.is_warning())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| !p.is_warning())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn clear(&mut self) {
        self.problems.clear();
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }
}

impl ProblemSink for ProblemCollector {
    fn missing_value(&mut self, field: &str) {
        self.push(Problem::MissingValue {
            field: field.to_string(),
        });
    }

    fn invalid_value(&mut self, field: &str, value: &str, detail: Option<&str>) {
        self.push(Problem::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            detail: detail.map(str::to_string),
        });
    }

    fn duplicate_id(&mut self, key_fields: &[&str], key_values: &[&str], severity: Severity) {
        self.push(Problem::DuplicateId {
            key_fields: key_fields.iter().map(|s| s.to_string()).collect(),
            key_values: key_values.iter().map(|s| s.to_string()).collect(),
            severity,
        });
    }

    fn other_problem(&mut self, message: &str, severity: Severity) {
        self.push(Problem::Other {
            message: message.to_string(),
            severity,
        });
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreProblems;

impl ProblemSink for IgnoreProblems {
    fn missing_value(&mut self, _field: &str) {}
    fn invalid_value(&mut self, _field: &str, _value: &str, _detail: Option<&str>) {}
    fn duplicate_id(&mut self, _key_fields: &[&str], _key_values: &[&str], _severity: Severity) {}
    fn other_problem(&mut self, _message: &str, _severity: Severity) {}
}
