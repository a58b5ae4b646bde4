//! Study definitions

use crate::variable::VariableSpec;
use chrono::NaiveDate;
use cohort_expr::{Expr, lit};
use serde::{Deserialize, Serialize};

/// Everything needed to extract one cohort
///
/// `index_date` and `end_date` anchor all relative windows. The population
/// predicate decides which patients produce an output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDefinition {
    pub index_date: NaiveDate,
    pub end_date: NaiveDate,
    pub population: Expr,
    pub variables: Vec<VariableSpec>,
}

impl StudyDefinition {
    /// A definition with every patient in the population and no variables
    pub fn new(index_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            index_date,
            end_date,
            population: lit(true),
            variables: Vec::new(),
        }
    }

    pub fn with_population(mut self, population: Expr) -> Self {
        self.population = population;
        self
    }

    pub fn with_variable(mut self, variable: VariableSpec) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn add_variable(&mut self, variable: VariableSpec) -> &mut Self {
        self.variables.push(variable);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Names of variables written to the output, in declaration order
    pub fn output_columns(&self) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .filter(|v| !v.hidden)
            .map(|v| v.name.as_str())
    }
}
