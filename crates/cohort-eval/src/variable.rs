//! Variable definitions
//!
//! A [`VariableSpec`] names one rule that reduces a patient's history to a
//! single value. The rule is a [`VariableKind`]; event queries are built
//! fluently:
//!
//! ```
//! use cohort_eval::{EventQuery, Returning, VariableSpec};
//! use cohort_expr::DateExpr;
//!
//! let bmi = VariableSpec::new(
//!     "bmi",
//!     EventQuery::clinical("bmi_codes")
//!         .on_or_before(DateExpr::index_date())
//!         .find_last_match_in_period()
//!         .returning(Returning::NumericValue)
//!         .ignore_missing_values(),
//! );
//! assert_eq!(bmi.codelists(), vec!["bmi_codes"]);
//! ```

use chrono::NaiveDate;
use cohort_expr::{DateExpr, Expr, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output rendering of date values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDay,
    #[serde(rename = "YYYY-MM")]
    YearMonth,
    #[serde(rename = "YYYY")]
    Year,
}

impl DateFormat {
    pub fn format(&self, date: NaiveDate) -> String {
        match self {
            Self::YearMonthDay => date.format("%Y-%m-%d").to_string(),
            Self::YearMonth => date.format("%Y-%m").to_string(),
            Self::Year => date.format("%Y").to_string(),
        }
    }
}

/// Which qualifying event an event query picks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// No policy; only valid when the output does not depend on the event
    #[default]
    Unspecified,
    /// Earliest qualifying event, first listed on ties
    FirstMatch,
    /// Latest qualifying event, last listed on ties
    LastMatch,
}

/// What an event query outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Returning {
    /// 1 if any event qualifies, else 0
    #[default]
    BinaryFlag,
    /// Date of the selected event
    Date,
    /// Codelist category of the selected event's code
    Category,
    /// Recorded value of the selected event
    NumericValue,
    /// Count of qualifying events
    NumberOfMatches,
}

impl Returning {
    /// True if the output depends on which event is selected
    pub const fn needs_selection(&self) -> bool {
        matches!(self, Self::Date | Self::Category | Self::NumericValue)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::BinaryFlag => "binary_flag",
            Self::Date => "date",
            Self::Category => "category",
            Self::NumericValue => "numeric_value",
            Self::NumberOfMatches => "number_of_matches_in_period",
        }
    }
}

impl fmt::Display for Returning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive date bounds; an absent bound is open
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_or_after: Option<DateExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_or_before: Option<DateExpr>,
}

impl DateWindow {
    /// No bounds
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn on_or_before(date: impl Into<DateExpr>) -> Self {
        Self {
            on_or_after: None,
            on_or_before: Some(date.into()),
        }
    }

    pub fn on_or_after(date: impl Into<DateExpr>) -> Self {
        Self {
            on_or_after: Some(date.into()),
            on_or_before: None,
        }
    }

    pub fn between(start: impl Into<DateExpr>, end: impl Into<DateExpr>) -> Self {
        Self {
            on_or_after: Some(start.into()),
            on_or_before: Some(end.into()),
        }
    }

    /// Variables the bounds are anchored on
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.on_or_after
            .iter()
            .chain(self.on_or_before.iter())
            .filter_map(DateExpr::referenced_variable)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.on_or_after, &self.on_or_before) {
            (Some(start), Some(end)) => write!(f, "between {start} and {end}"),
            (Some(start), None) => write!(f, "on or after {start}"),
            (None, Some(end)) => write!(f, "on or before {end}"),
            (None, None) => f.write_str("at any time"),
        }
    }
}

/// Event table an event query reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTable {
    Clinical,
    Medications,
}

/// Codelist-driven query over clinical events or medications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    pub table: EventTable,
    pub codelist: String,
    #[serde(default)]
    pub window: DateWindow,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub returning: Returning,
    /// Exclude events without a recorded value from candidacy
    #[serde(default)]
    pub ignore_missing_values: bool,
    /// Exclude events on any day that also carries a code from this list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_days_with: Option<String>,
}

impl EventQuery {
    pub fn new(table: EventTable, codelist: impl Into<String>) -> Self {
        Self {
            table,
            codelist: codelist.into(),
            window: DateWindow::all_time(),
            selection: Selection::Unspecified,
            returning: Returning::BinaryFlag,
            ignore_missing_values: false,
            ignore_days_with: None,
        }
    }

    /// Query the clinical events table
    pub fn clinical(codelist: impl Into<String>) -> Self {
        Self::new(EventTable::Clinical, codelist)
    }

    /// Query the medications table
    pub fn medications(codelist: impl Into<String>) -> Self {
        Self::new(EventTable::Medications, codelist)
    }

    pub fn window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn on_or_before(mut self, date: impl Into<DateExpr>) -> Self {
        self.window.on_or_before = Some(date.into());
        self
    }

    pub fn on_or_after(mut self, date: impl Into<DateExpr>) -> Self {
        self.window.on_or_after = Some(date.into());
        self
    }

    pub fn between(self, start: impl Into<DateExpr>, end: impl Into<DateExpr>) -> Self {
        self.window(DateWindow::between(start, end))
    }

    pub fn find_first_match_in_period(mut self) -> Self {
        self.selection = Selection::FirstMatch;
        self
    }

    pub fn find_last_match_in_period(mut self) -> Self {
        self.selection = Selection::LastMatch;
        self
    }

    pub fn returning(mut self, returning: Returning) -> Self {
        self.returning = returning;
        self
    }

    pub fn ignore_missing_values(mut self) -> Self {
        self.ignore_missing_values = true;
        self
    }

    pub fn ignore_days_where_these_codes_occur(mut self, codelist: impl Into<String>) -> Self {
        self.ignore_days_with = Some(codelist.into());
        self
    }
}

/// Query over vaccination records
///
/// A record qualifies if it names the target disease or its product code is
/// in the product codelist; either suffices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaccinationQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_disease: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_codelist: Option<String>,
    #[serde(default)]
    pub window: DateWindow,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub returning: Returning,
}

impl VaccinationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_disease(mut self, disease: impl Into<String>) -> Self {
        self.target_disease = Some(disease.into());
        self
    }

    pub fn product_codes(mut self, codelist: impl Into<String>) -> Self {
        self.product_codelist = Some(codelist.into());
        self
    }

    pub fn between(mut self, start: impl Into<DateExpr>, end: impl Into<DateExpr>) -> Self {
        self.window = DateWindow::between(start, end);
        self
    }

    pub fn window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn find_first_match_in_period(mut self) -> Self {
        self.selection = Selection::FirstMatch;
        self
    }

    pub fn find_last_match_in_period(mut self) -> Self {
        self.selection = Selection::LastMatch;
        self
    }

    pub fn returning(mut self, returning: Returning) -> Self {
        self.returning = returning;
        self
    }
}

/// Attribute of the practice a patient is registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeAttribute {
    PseudoId,
    Nuts1RegionName,
    StpCode,
}

/// Attribute of the patient's address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressAttribute {
    IndexOfMultipleDeprivation,
    RuralUrbanClassification,
}

/// When a categorisation branch applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    When(Expr),
    Default,
}

/// One `label <- condition` branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub label: Value,
    pub condition: Condition,
}

/// Ordered branches mapping predicates to labels
///
/// Non-default branches are tried in declaration order and the first true
/// one wins; a branch whose predicate is unknown does not match. The default
/// branch applies when nothing else does, wherever it is declared.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategorisationRule {
    pub branches: Vec<Branch>,
}

impl CategorisationRule {
    pub fn new() -> Self {
        Self {
            branches: Vec::new(),
        }
    }

    pub fn when(mut self, label: impl Into<Value>, predicate: Expr) -> Self {
        self.branches.push(Branch {
            label: label.into(),
            condition: Condition::When(predicate),
        });
        self
    }

    /// Add the default branch
    pub fn otherwise(mut self, label: impl Into<Value>) -> Self {
        self.branches.push(Branch {
            label: label.into(),
            condition: Condition::Default,
        });
        self
    }

    pub fn default_count(&self) -> usize {
        self.branches
            .iter()
            .filter(|b| matches!(b.condition, Condition::Default))
            .count()
    }
}

/// How a variable is computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariableKind {
    /// Clinical event or medication query
    Events { query: EventQuery },
    /// Vaccination record query
    Vaccination { query: VaccinationQuery },
    /// Age in whole years
    AgeAsOf { date: DateExpr },
    /// Recorded sex label
    Sex,
    /// Death within the window, as a flag or a date
    DiedFromAnyCause {
        #[serde(default)]
        window: DateWindow,
        #[serde(default)]
        returning: Returning,
    },
    /// Registered with any practice on the date
    RegisteredAsOf { date: DateExpr },
    /// One registration spans the whole interval
    RegisteredWithOnePracticeBetween { start: DateExpr, end: DateExpr },
    /// End of the last registration when none is still open
    DateDeregistered {
        #[serde(default)]
        window: DateWindow,
    },
    /// Attribute of the practice in force on the date
    PracticeAsOf {
        date: DateExpr,
        attribute: PracticeAttribute,
    },
    /// Attribute of the address in force on the date
    AddressAsOf {
        date: DateExpr,
        attribute: AddressAttribute,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round_to_nearest: Option<i64>,
    },
    /// Date of the event selected by another variable
    DateOf { variable: String },
    /// 0/1 flag from a predicate; unknown gives null
    Satisfying { predicate: Expr },
    /// Label of the first matching branch
    CategorisedAs { rule: CategorisationRule },
}

impl VariableKind {
    /// Names of all variables this kind depends on
    pub fn references(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        match self {
            Self::Events { query } => names.extend(query.window.references()),
            Self::Vaccination { query } => names.extend(query.window.references()),
            Self::AgeAsOf { date }
            | Self::RegisteredAsOf { date }
            | Self::PracticeAsOf { date, .. }
            | Self::AddressAsOf { date, .. } => names.extend(date.referenced_variable()),
            Self::Sex => {}
            Self::DiedFromAnyCause { window, .. } | Self::DateDeregistered { window } => {
                names.extend(window.references());
            }
            Self::RegisteredWithOnePracticeBetween { start, end } => {
                names.extend(start.referenced_variable());
                names.extend(end.referenced_variable());
            }
            Self::DateOf { variable } => names.push(variable),
            Self::Satisfying { predicate } => names.extend(predicate.references()),
            Self::CategorisedAs { rule } => {
                for branch in &rule.branches {
                    if let Condition::When(predicate) = &branch.condition {
                        names.extend(predicate.references());
                    }
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        names.retain(|name| seen.insert(*name));
        names
    }

    /// Names of all codelists this kind reads
    pub fn codelists(&self) -> Vec<&str> {
        match self {
            Self::Events { query } => std::iter::once(query.codelist.as_str())
                .chain(query.ignore_days_with.as_deref())
                .collect(),
            Self::Vaccination { query } => query.product_codelist.as_deref().into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl From<EventQuery> for VariableKind {
    fn from(query: EventQuery) -> Self {
        Self::Events { query }
    }
}

impl From<VaccinationQuery> for VariableKind {
    fn from(query: VaccinationQuery) -> Self {
        Self::Vaccination { query }
    }
}

impl From<CategorisationRule> for VariableKind {
    fn from(rule: CategorisationRule) -> Self {
        Self::CategorisedAs { rule }
    }
}

/// A named variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: VariableKind,
    /// Evaluated and referenceable but not written to the output
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub date_format: DateFormat,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<VariableKind>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            hidden: false,
            date_format: DateFormat::default(),
        }
    }

    /// Mark as an intermediate variable
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    pub fn references(&self) -> Vec<&str> {
        self.kind.references()
    }

    pub fn codelists(&self) -> Vec<&str> {
        self.kind.codelists()
    }
}
