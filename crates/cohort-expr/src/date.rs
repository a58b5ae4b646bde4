//! Relative date expressions for variable windows
//!
//! A [`DateExpr`] is an anchor plus an optional calendar offset, e.g.
//! `index_date - 1 year` or `bmi_stage_date`. Anchors are resolved by the
//! evaluator; this module only knows how to apply the offset.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a relative date is measured from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateAnchor {
    /// A fixed calendar date
    Literal { date: NaiveDate },
    /// The study index date
    IndexDate,
    /// The study end date
    EndDate,
    /// The date value of another variable; null if that variable is null
    Variable { name: String },
}

/// Calendar unit of an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateUnit {
    Days,
    Months,
    Years,
}

impl DateUnit {
    fn label(&self, amount: u32) -> &'static str {
        match (self, amount) {
            (Self::Days, 1) => "day",
            (Self::Days, _) => "days",
            (Self::Months, 1) => "month",
            (Self::Months, _) => "months",
            (Self::Years, 1) => "year",
            (Self::Years, _) => "years",
        }
    }
}

/// Signed calendar offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateOffset {
    pub amount: i32,
    pub unit: DateUnit,
}

impl DateOffset {
    /// Shift a date by this offset
    ///
    /// Month and year offsets clamp to the last day of the target month
    /// (2020-02-29 + 1 year = 2021-02-28). `None` if the result is out of
    /// range.
    pub fn apply(&self, date: NaiveDate) -> Option<NaiveDate> {
        let magnitude = self.amount.unsigned_abs();
        let forward = self.amount >= 0;
        match self.unit {
            DateUnit::Days => {
                let days = Days::new(u64::from(magnitude));
                if forward {
                    date.checked_add_days(days)
                } else {
                    date.checked_sub_days(days)
                }
            }
            DateUnit::Months | DateUnit::Years => {
                let months = if self.unit == DateUnit::Years {
                    magnitude.checked_mul(12)?
                } else {
                    magnitude
                };
                if forward {
                    date.checked_add_months(Months::new(months))
                } else {
                    date.checked_sub_months(Months::new(months))
                }
            }
        }
    }
}

/// A date relative to an anchor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateExpr {
    pub anchor: DateAnchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<DateOffset>,
}

impl DateExpr {
    pub fn literal(date: NaiveDate) -> Self {
        Self::anchored(DateAnchor::Literal { date })
    }

    pub fn index_date() -> Self {
        Self::anchored(DateAnchor::IndexDate)
    }

    pub fn end_date() -> Self {
        Self::anchored(DateAnchor::EndDate)
    }

    /// The date of another variable
    pub fn variable(name: impl Into<String>) -> Self {
        Self::anchored(DateAnchor::Variable { name: name.into() })
    }

    fn anchored(anchor: DateAnchor) -> Self {
        Self {
            anchor,
            offset: None,
        }
    }

    /// Replace the offset
    pub fn offset(mut self, amount: i32, unit: DateUnit) -> Self {
        self.offset = Some(DateOffset { amount, unit });
        self
    }

    pub fn plus_days(self, days: i32) -> Self {
        self.offset(days, DateUnit::Days)
    }

    pub fn minus_days(self, days: i32) -> Self {
        self.offset(-days, DateUnit::Days)
    }

    pub fn plus_months(self, months: i32) -> Self {
        self.offset(months, DateUnit::Months)
    }

    pub fn minus_months(self, months: i32) -> Self {
        self.offset(-months, DateUnit::Months)
    }

    pub fn plus_years(self, years: i32) -> Self {
        self.offset(years, DateUnit::Years)
    }

    pub fn minus_years(self, years: i32) -> Self {
        self.offset(-years, DateUnit::Years)
    }

    /// Variable this date depends on, if any
    pub fn referenced_variable(&self) -> Option<&str> {
        match &self.anchor {
            DateAnchor::Variable { name } => Some(name),
            _ => None,
        }
    }

    /// Apply the offset to an already resolved anchor date
    pub fn shift(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        match &self.offset {
            Some(offset) => offset.apply(anchor),
            None => Some(anchor),
        }
    }

    /// Resolve without variable lookups; `None` for variable anchors
    ///
    /// Used for constant folding and for checking windows against the study
    /// period.
    pub fn resolve_static(&self, index_date: NaiveDate, end_date: NaiveDate) -> Option<NaiveDate> {
        let anchor = match &self.anchor {
            DateAnchor::Literal { date } => *date,
            DateAnchor::IndexDate => index_date,
            DateAnchor::EndDate => end_date,
            DateAnchor::Variable { .. } => return None,
        };
        self.shift(anchor)
    }
}

impl From<NaiveDate> for DateExpr {
    fn from(date: NaiveDate) -> Self {
        Self::literal(date)
    }
}

impl fmt::Display for DateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.anchor {
            DateAnchor::Literal { date } => write!(f, "{}", date.format("%Y-%m-%d"))?,
            DateAnchor::IndexDate => f.write_str("index_date")?,
            DateAnchor::EndDate => f.write_str("end_date")?,
            DateAnchor::Variable { name } => f.write_str(name)?,
        }
        if let Some(offset) = &self.offset {
            let sign = if offset.amount < 0 { '-' } else { '+' };
            let amount = offset.amount.unsigned_abs();
            write!(f, " {sign} {amount} {}", offset.unit.label(amount))?;
        }
        Ok(())
    }
}
