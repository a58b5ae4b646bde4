//! Compiled study representation
//!
//! Compilation resolves variable names to slots, codelist names to shared
//! codelists and static dates to calendar dates. Nothing here is looked up by
//! name at evaluation time.

use crate::logic::{and_all, apply_comparison, negate, or_any};
use crate::variable::{
    AddressAttribute, DateFormat, EventTable, PracticeAttribute, Returning, Selection,
};
use chrono::NaiveDate;
use cohort_codelist::Codelist;
use cohort_diagnostics::Diagnostics;
use cohort_expr::{ComparisonOp, DateExpr, DateOffset, Value, ValueType};
use std::borrow::Cow;
use std::sync::Arc;

static NULL: Value = Value::Null;

/// Expression with variables resolved to slots
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CompiledExpr {
    Literal(Value),
    Slot(usize),
    Compare {
        op: ComparisonOp,
        left: Box<CompiledExpr>,
        right: Box<CompiledExpr>,
    },
    And(Vec<CompiledExpr>),
    Or(Vec<CompiledExpr>),
    Not(Box<CompiledExpr>),
    IsNull(Box<CompiledExpr>),
}

impl CompiledExpr {
    fn operand<'v>(&'v self, values: &'v [Value]) -> Cow<'v, Value> {
        match self {
            Self::Literal(value) => Cow::Borrowed(value),
            Self::Slot(slot) => Cow::Borrowed(values.get(*slot).unwrap_or(&NULL)),
            other => Cow::Owned(other.value(values)),
        }
    }

    /// Evaluate to a value; logical results are `Boolean` or `Null`
    pub(crate) fn value(&self, values: &[Value]) -> Value {
        match self {
            Self::Literal(_) | Self::Slot(_) => self.operand(values).into_owned(),
            Self::IsNull(operand) => Value::Boolean(operand.operand(values).is_null()),
            _ => self.truth(values).map_or(Value::Null, Value::Boolean),
        }
    }

    /// Evaluate as a condition
    pub(crate) fn truth(&self, values: &[Value]) -> Option<bool> {
        match self {
            Self::Literal(value) => value.truthiness(),
            Self::Slot(slot) => values.get(*slot).and_then(Value::truthiness),
            Self::Compare { op, left, right } => {
                apply_comparison(*op, &left.operand(values), &right.operand(values))
            }
            Self::And(operands) => and_all(operands.iter().map(|o| o.truth(values))),
            Self::Or(operands) => or_any(operands.iter().map(|o| o.truth(values))),
            Self::Not(operand) => negate(operand.truth(values)),
            Self::IsNull(operand) => Some(operand.operand(values).is_null()),
        }
    }
}

/// A date bound
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CompiledDate {
    /// Known at compile time
    Fixed(NaiveDate),
    /// Another variable's date plus an offset
    Relative {
        slot: usize,
        offset: Option<DateOffset>,
        source: DateExpr,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct CompiledWindow {
    pub(crate) start: Option<CompiledDate>,
    pub(crate) end: Option<CompiledDate>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledEventQuery {
    pub(crate) table: EventTable,
    pub(crate) codelist: Arc<Codelist>,
    pub(crate) window: CompiledWindow,
    pub(crate) selection: Selection,
    pub(crate) returning: Returning,
    pub(crate) ignore_missing_values: bool,
    pub(crate) ignore_days_with: Option<Arc<Codelist>>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledVaccinationQuery {
    pub(crate) target_disease: Option<String>,
    pub(crate) products: Option<Arc<Codelist>>,
    pub(crate) window: CompiledWindow,
    pub(crate) selection: Selection,
    pub(crate) returning: Returning,
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledKind {
    Events(CompiledEventQuery),
    Vaccination(CompiledVaccinationQuery),
    AgeAsOf(CompiledDate),
    Sex,
    DiedFromAnyCause {
        window: CompiledWindow,
        returning: Returning,
    },
    RegisteredAsOf(CompiledDate),
    RegisteredWithOnePracticeBetween {
        start: CompiledDate,
        end: CompiledDate,
    },
    DateDeregistered(CompiledWindow),
    PracticeAsOf {
        date: CompiledDate,
        attribute: PracticeAttribute,
    },
    AddressAsOf {
        date: CompiledDate,
        attribute: AddressAttribute,
        round_to_nearest: Option<i64>,
    },
    DateOf(usize),
    Satisfying(CompiledExpr),
    CategorisedAs {
        branches: Vec<(CompiledExpr, Value)>,
        default: Value,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledVariable {
    pub(crate) name: String,
    pub(crate) kind: CompiledKind,
}

/// One output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub value_type: ValueType,
    pub date_format: DateFormat,
    pub(crate) slot: usize,
}

impl Column {
    /// Render a value for this column; null is an empty cell
    pub fn render(&self, value: &Value) -> String {
        match value {
            Value::Date(date) => self.date_format.format(*date),
            other => other.to_string(),
        }
    }
}

/// A validated study, ready to evaluate
///
/// Immutable and `Send + Sync`; one instance is shared by every worker.
#[derive(Debug, Clone)]
pub struct CompiledStudy {
    pub(crate) index_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
    /// Indexed by slot (declaration order)
    pub(crate) variables: Vec<CompiledVariable>,
    pub(crate) types: Vec<ValueType>,
    /// Slots in evaluation order
    pub(crate) order: Vec<usize>,
    pub(crate) population: CompiledExpr,
    pub(crate) population_source: String,
    pub(crate) columns: Vec<Column>,
    pub(crate) diagnostics: Diagnostics,
}

impl CompiledStudy {
    pub fn index_date(&self) -> NaiveDate {
        self.index_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Output columns in declaration order, hidden variables excluded
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Non-fatal findings from compilation
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Number of declared variables, hidden ones included
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Variable names in the order they are evaluated
    pub fn evaluation_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&slot| self.variables[slot].name.as_str())
            .collect()
    }

    /// Slot of a variable by name
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    /// Static output type of a variable
    pub fn value_type(&self, name: &str) -> Option<ValueType> {
        self.slot(name).map(|slot| self.types[slot])
    }
}
