//! EVR comparison utilities

use crate::evr::Evr;
use crate::operator::Operator;

/// Comparator for comparing EVR strings
pub struct Comparator;

impl Comparator {
    /// Check if evr1 > evr2
    pub fn greater_than(evr1: &str, evr2: &str) -> bool {
        Self::compare(evr1, ">", evr2)
    }

    /// Check if evr1 >= evr2
    pub fn greater_than_or_equal_to(evr1: &str, evr2: &str) -> bool {
        Self::compare(evr1, ">=", evr2)
    }

    /// Check if evr1 < evr2
    pub fn less_than(evr1: &str, evr2: &str) -> bool {
        Self::compare(evr1, "<", evr2)
    }

    /// Check if evr1 <= evr2
    pub fn less_than_or_equal_to(evr1: &str, evr2: &str) -> bool {
        Self::compare(evr1, "<=", evr2)
    }

    /// Check if evr1 == evr2
    pub fn equal_to(evr1: &str, evr2: &str) -> bool {
        Self::compare(evr1, "=", evr2)
    }

    /// Compare evr1 to evr2 using the given operator.
    ///
    /// Unparsable EVRs or operators never satisfy a comparison.
    pub fn compare(evr1: &str, operator: &str, evr2: &str) -> bool {
        let (Ok(a), Ok(b), Ok(op)) = (Evr::parse(evr1), Evr::parse(evr2), Operator::from_str(operator)) else {
            return false;
        };
        op.matches(a.compare(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greater_than() {
        assert!(Comparator::greater_than("2.4.6-1", "2.2.15-3"));
        assert!(!Comparator::greater_than("1.0-1", "1.0-1"));
        assert!(Comparator::greater_than("1:1.0", "5.0"));
        assert!(!Comparator::greater_than("1.0~beta", "1.0"));
    }

    #[test]
    fn test_less_than_or_equal_to() {
        assert!(Comparator::less_than_or_equal_to("1.0", "1.0-7"));
        assert!(Comparator::less_than_or_equal_to("0.9", "1.0"));
        assert!(!Comparator::less_than_or_equal_to("1.1", "1.0"));
    }

    #[test]
    fn test_equal_to() {
        assert!(Comparator::equal_to("0:1.0-1", "1.0-1"));
        assert!(!Comparator::equal_to("1.0-1", "1.0-2"));
    }

    #[test]
    fn test_invalid_input() {
        assert!(!Comparator::compare("1.0", "~>", "1.0"));
        assert!(!Comparator::greater_than("a:1", "1"));
    }
}
