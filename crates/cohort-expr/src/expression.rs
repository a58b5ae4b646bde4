//! Expression tree over variable values
//!
//! Expressions are built with the free functions [`var`], [`lit`], [`and`],
//! [`or`], [`not`] and the comparison methods on [`Expr`]:
//!
//! ```
//! use cohort_expr::{Expr, and, var};
//!
//! let flu_vaccine = var("flu_vaccine_tpp_table")
//!     .gt(0)
//!     .or(var("flu_vaccine_med").gt(0))
//!     .or(var("flu_vaccine_clinical").gt(0));
//! assert_eq!(
//!     flu_vaccine.to_string(),
//!     "flu_vaccine_tpp_table > 0 OR flu_vaccine_med > 0 OR flu_vaccine_clinical > 0"
//! );
//! ```
//!
//! Plain Rust values convert into literals, so `var("sex").eq("M")` compares
//! against the string `"M"`, never against a variable named `M`.

use crate::operator::ComparisonOp;
use crate::value::Value;
use chrono::NaiveDate;
use indexmap::IndexSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expression over variable values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    /// Constant value
    Literal { value: Value },
    /// Value of another variable for the same patient
    Variable { name: String },
    /// Binary comparison; unknown if either side is null
    Compare {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Kleene conjunction
    And { operands: Vec<Expr> },
    /// Kleene disjunction
    Or { operands: Vec<Expr> },
    /// Kleene negation
    Not { operand: Box<Expr> },
    /// True if the operand is null, never unknown
    IsNull { operand: Box<Expr> },
}

/// Reference to a variable
pub fn var(name: impl Into<String>) -> Expr {
    Expr::Variable { name: name.into() }
}

/// Literal value
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal {
        value: value.into(),
    }
}

/// Conjunction of all operands
pub fn and(operands: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::And {
        operands: operands.into_iter().collect(),
    }
}

/// Disjunction of all operands
pub fn or(operands: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Or {
        operands: operands.into_iter().collect(),
    }
}

/// Negation
pub fn not(operand: Expr) -> Expr {
    Expr::Not {
        operand: Box::new(operand),
    }
}

impl Expr {
    fn compare(self, op: ComparisonOp, right: impl Into<Expr>) -> Expr {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn eq(self, right: impl Into<Expr>) -> Expr {
        self.compare(ComparisonOp::Equal, right)
    }

    pub fn ne(self, right: impl Into<Expr>) -> Expr {
        self.compare(ComparisonOp::NotEqual, right)
    }

    pub fn lt(self, right: impl Into<Expr>) -> Expr {
        self.compare(ComparisonOp::Less, right)
    }

    pub fn le(self, right: impl Into<Expr>) -> Expr {
        self.compare(ComparisonOp::LessOrEqual, right)
    }

    pub fn gt(self, right: impl Into<Expr>) -> Expr {
        self.compare(ComparisonOp::Greater, right)
    }

    pub fn ge(self, right: impl Into<Expr>) -> Expr {
        self.compare(ComparisonOp::GreaterOrEqual, right)
    }

    /// Conjunction, flattening into an existing `And`
    pub fn and(self, right: impl Into<Expr>) -> Expr {
        match self {
            Expr::And { mut operands } => {
                operands.push(right.into());
                Expr::And { operands }
            }
            left => and([left, right.into()]),
        }
    }

    /// Disjunction, flattening into an existing `Or`
    pub fn or(self, right: impl Into<Expr>) -> Expr {
        match self {
            Expr::Or { mut operands } => {
                operands.push(right.into());
                Expr::Or { operands }
            }
            left => or([left, right.into()]),
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            operand: Box::new(self),
        }
    }

    /// Names of all referenced variables, in first-seen order
    pub fn references(&self) -> IndexSet<&str> {
        let mut names = IndexSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut IndexSet<&'a str>) {
        match self {
            Expr::Literal { .. } => {}
            Expr::Variable { name } => {
                names.insert(name.as_str());
            }
            Expr::Compare { left, right, .. } => {
                left.collect_references(names);
                right.collect_references(names);
            }
            Expr::And { operands } | Expr::Or { operands } => {
                for operand in operands {
                    operand.collect_references(names);
                }
            }
            Expr::Not { operand } | Expr::IsNull { operand } => operand.collect_references(names),
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Expr::And { .. } | Expr::Or { .. })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, operands: &[Expr], sep: &str) -> fmt::Result {
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                if operand.is_compound() {
                    write!(f, "({operand})")?;
                } else {
                    write!(f, "{operand}")?;
                }
            }
            Ok(())
        }

        match self {
            Expr::Literal { value } => match value {
                Value::Null => f.write_str("null"),
                Value::String(s) => write!(f, "{s:?}"),
                Value::Date(d) => write!(f, "@{}", d.format("%Y-%m-%d")),
                other => write!(f, "{other}"),
            },
            Expr::Variable { name } => f.write_str(name),
            Expr::Compare { op, left, right } => write!(f, "{left} {op} {right}"),
            Expr::And { operands } => join(f, operands, " AND "),
            Expr::Or { operands } => join(f, operands, " OR "),
            Expr::Not { operand } if operand.is_compound() => write!(f, "NOT ({operand})"),
            Expr::Not { operand } => write!(f, "NOT {operand}"),
            Expr::IsNull { operand } => write!(f, "{operand} IS NULL"),
        }
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    lit(value)
                }
            }
        )*
    };
}

literal_from!(bool, i32, i64, Decimal, NaiveDate, &str, String, Value);
