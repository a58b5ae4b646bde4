//! Comparison operators

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Binary comparison between two scalar operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Equality
    Equal,
    /// Inequality
    NotEqual,
    /// Less than
    Less,
    /// Less than or equal
    LessOrEqual,
    /// Greater than
    Greater,
    /// Greater than or equal
    GreaterOrEqual,
}

impl ComparisonOp {
    /// Check if the operator needs ordered operands (as opposed to equality)
    pub const fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual
        )
    }

    /// Decide the comparison from the ordering of the operands
    pub fn holds_for(&self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::Less => ordering == Ordering::Less,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::Greater => ordering == Ordering::Greater,
            Self::GreaterOrEqual => ordering != Ordering::Less,
        }
    }

    /// Get the operator symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ComparisonOp::GreaterOrEqual, Ordering::Equal, true)]
    #[case(ComparisonOp::GreaterOrEqual, Ordering::Less, false)]
    #[case(ComparisonOp::NotEqual, Ordering::Greater, true)]
    #[case(ComparisonOp::LessOrEqual, Ordering::Greater, false)]
    #[case(ComparisonOp::Equal, Ordering::Equal, true)]
    fn test_holds_for(#[case] op: ComparisonOp, #[case] ordering: Ordering, #[case] expected: bool) {
        assert_eq!(op.holds_for(ordering), expected);
    }
}
