//! Dependency relations: `name [op evr]`

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

use crate::evr::{Evr, EvrError};
use crate::operator::Operator;

lazy_static! {
    static ref RELATION_RE: Regex =
        Regex::new(r"^\s*([^\s<>=]+)\s*(?:(==|=<|=>|<=|>=|=|<|>)\s*([^\s<>=]\S*))?\s*$").unwrap();
}

/// A dependency relation as found in provides, requires, conflicts and obsoletes.
///
/// A relation without a constraint matches every EVR of the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    name: String,
    constraint: Option<(Operator, Evr)>,
}

impl Relation {
    /// A bare name relation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn with_constraint(name: impl Into<String>, operator: Operator, evr: Evr) -> Self {
        Self {
            name: name.into(),
            constraint: Some((operator, evr)),
        }
    }

    pub fn parse(input: &str) -> Result<Self, EvrError> {
        let caps = RELATION_RE
            .captures(input)
            .ok_or_else(|| EvrError::InvalidRelation(input.to_string()))?;

        let name = caps[1].to_string();
        let constraint = match (caps.get(2), caps.get(3)) {
            (Some(op), Some(evr)) => Some((Operator::from_str(op.as_str())?, Evr::parse(evr.as_str())?)),
            _ => None,
        };

        Ok(Self { name, constraint })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraint(&self) -> Option<(Operator, &Evr)> {
        self.constraint.as_ref().map(|(op, evr)| (*op, evr))
    }

    pub fn is_versioned(&self) -> bool {
        self.constraint.is_some()
    }

    /// Replace the constraint, keeping the name
    pub fn constrained(mut self, operator: Operator, evr: Evr) -> Self {
        self.constraint = Some((operator, evr));
        self
    }

    /// Whether a concrete package EVR satisfies this relation
    pub fn matches_evr(&self, evr: &Evr) -> bool {
        match &self.constraint {
            None => true,
            Some((op, wanted)) => op.matches(evr.compare(wanted)),
        }
    }

    /// rpm range overlap between two relations of the same name.
    ///
    /// This is the test used to decide whether a provide satisfies a requirement, or
    /// whether a conflict hits a provide.
    pub fn intersects(&self, other: &Relation) -> bool {
        if self.name != other.name {
            return false;
        }

        let ((op1, evr1), (op2, evr2)) = match (&self.constraint, &other.constraint) {
            (Some(a), Some(b)) => (a, b),
            _ => return true,
        };

        if (op1.includes_less() && op2.includes_less())
            || (op1.includes_greater() && op2.includes_greater())
        {
            return true;
        }

        match evr1.compare(evr2) {
            Ordering::Less => op1.includes_greater() || op2.includes_less(),
            Ordering::Greater => op1.includes_less() || op2.includes_greater(),
            Ordering::Equal => op1.includes_equal() && op2.includes_equal(),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some((op, evr)) => write!(f, "{} {} {}", self.name, op, evr),
            None => write!(f, "{}", self.name),
        }
    }
}

impl std::str::FromStr for Relation {
    type Err = EvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Relation::parse(s)
    }
}
