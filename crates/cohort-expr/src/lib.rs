//! Cohort expressions
//!
//! This crate defines the typed building blocks variable definitions are
//! written in:
//!
//! - [`Value`] / [`ValueType`]: the scalar a variable resolves to per patient
//! - [`Expr`]: a boolean/comparison expression tree over variables and
//!   literals, built with [`var`], [`lit`], [`and`], [`or`] and [`not`]
//! - [`DateExpr`]: a date relative to the index date, the study end date, a
//!   literal, or another variable's date
//!
//! Expressions are plain data. Evaluation (three-valued logic, type checks)
//! lives in `cohort-eval`.
//!
//! # Example
//!
//! ```
//! use cohort_expr::{and, not, var};
//!
//! let population = and([
//!     not(var("has_died")),
//!     var("registered"),
//!     var("age").ge(70),
//!     var("sex").eq("M").or(var("sex").eq("F")),
//! ]);
//! assert_eq!(population.references().len(), 4);
//! ```

pub mod date;
pub mod expression;
pub mod operator;
pub mod value;

pub use date::{DateAnchor, DateExpr, DateOffset, DateUnit};
pub use expression::{Expr, and, lit, not, or, var};
pub use operator::ComparisonOp;
pub use value::{Value, ValueType};
