//! Three-valued logic and value comparison
//!
//! Truth values are `Option<bool>`: `None` is unknown. The connectives follow
//! Kleene's strong logic:
//!
//! | A     | B     | A and B | A or B |
//! |-------|-------|---------|--------|
//! | true  | true  | true    | true   |
//! | true  | false | false   | true   |
//! | true  | null  | null    | true   |
//! | false | false | false   | false  |
//! | false | null  | false   | null   |
//! | null  | null  | null    | null   |

use cohort_expr::{ComparisonOp, Value};
use std::cmp::Ordering;

/// Kleene conjunction over lazily evaluated operands
///
/// Stops at the first false operand.
pub fn and_all(operands: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for operand in operands {
        match operand {
            Some(false) => return Some(false),
            Some(true) => {}
            None => unknown = true,
        }
    }
    if unknown { None } else { Some(true) }
}

/// Kleene disjunction over lazily evaluated operands
///
/// Stops at the first true operand.
pub fn or_any(operands: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for operand in operands {
        match operand {
            Some(true) => return Some(true),
            Some(false) => {}
            None => unknown = true,
        }
    }
    if unknown { None } else { Some(false) }
}

/// Kleene negation
pub fn negate(operand: Option<bool>) -> Option<bool> {
    operand.map(|b| !b)
}

/// Order two values
///
/// `None` if either is null or the types cannot be compared. Integers and
/// decimals compare numerically.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) => Some(a.as_decimal()?.cmp(&b.as_decimal()?)),
    }
}

/// Apply a comparison; unknown when the operands cannot be ordered
pub fn apply_comparison(op: ComparisonOp, left: &Value, right: &Value) -> Option<bool> {
    compare_values(left, right).map(|ordering| op.holds_for(ordering))
}
