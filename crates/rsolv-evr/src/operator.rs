//! Relation operators for dependency constraints

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Comparison operators allowed in rpm dependency relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (=)
    Equal,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid operator: {0}")]
pub struct InvalidOperatorError(pub String);

impl Operator {
    /// Parse operator from string
    pub fn from_str(s: &str) -> Result<Self, InvalidOperatorError> {
        match s {
            "=" | "==" => Ok(Operator::Equal),
            "<" => Ok(Operator::LessThan),
            "<=" | "=<" => Ok(Operator::LessThanOrEqual),
            ">" => Ok(Operator::GreaterThan),
            ">=" | "=>" => Ok(Operator::GreaterThanOrEqual),
            _ => Err(InvalidOperatorError(s.to_string())),
        }
    }

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
        }
    }

    /// Whether an EVR comparing as `ordering` against the relation's EVR satisfies it
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::LessThan => ordering == Ordering::Less,
            Operator::LessThanOrEqual => ordering != Ordering::Greater,
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }

    pub(crate) fn includes_less(&self) -> bool {
        matches!(self, Operator::LessThan | Operator::LessThanOrEqual)
    }

    pub(crate) fn includes_equal(&self) -> bool {
        matches!(
            self,
            Operator::Equal | Operator::LessThanOrEqual | Operator::GreaterThanOrEqual
        )
    }

    pub(crate) fn includes_greater(&self) -> bool {
        matches!(self, Operator::GreaterThan | Operator::GreaterThanOrEqual)
    }

    /// Get all supported operators
    pub fn supported_operators() -> &'static [&'static str] {
        &["=", "==", "<", "<=", "=<", ">", ">=", "=>"]
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
