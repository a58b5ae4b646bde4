//! Study compilation
//!
//! Compilation validates a [`StudyDefinition`] against a codelist registry
//! before any patient is touched:
//!
//! 1. variable names are unique and every reference resolves
//! 2. variables are ordered leaf-first (declaration order among independent
//!    variables); cycles are rejected
//! 3. each variable is type checked in that order, so the types of its
//!    dependencies are already known
//! 4. the population predicate is type checked and, if it references no
//!    variable, folded; a constant unknown is rejected
//!
//! Any failure aborts the run. Non-fatal findings are attached to the
//! compiled study as diagnostics.

use crate::compiled::{
    Column, CompiledDate, CompiledEventQuery, CompiledExpr, CompiledKind, CompiledStudy,
    CompiledVaccinationQuery, CompiledVariable, CompiledWindow,
};
use crate::definition::StudyDefinition;
use crate::error::{EvalError, EvalResult};
use crate::variable::{
    AddressAttribute, Condition, DateWindow, EventQuery, PracticeAttribute, Returning, Selection,
    VaccinationQuery, VariableKind, VariableSpec,
};
use cohort_codelist::CodelistRegistry;
use cohort_diagnostics::{COH0107, COH0108, Diagnostic, Diagnostics};
use cohort_expr::{DateAnchor, DateExpr, Expr, ValueType};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use smallvec::SmallVec;
use std::collections::BTreeSet;

type Dependencies = SmallVec<[usize; 4]>;

const POPULATION: &str = "population";

/// Compile a study definition against a registry
pub fn compile(definition: &StudyDefinition, registry: &CodelistRegistry) -> EvalResult<CompiledStudy> {
    Compiler::new(definition, registry)?.compile()
}

/// Single-use compiler for one study definition
pub struct Compiler<'a> {
    definition: &'a StudyDefinition,
    registry: &'a CodelistRegistry,
    slots: IndexMap<&'a str, usize>,
    types: Vec<Option<ValueType>>,
    used_codelists: IndexSet<&'a str>,
    diagnostics: Diagnostics,
}

impl<'a> Compiler<'a> {
    /// Index the variables, rejecting duplicate names
    pub fn new(definition: &'a StudyDefinition, registry: &'a CodelistRegistry) -> EvalResult<Self> {
        let mut slots = IndexMap::with_capacity(definition.variables.len());
        for (slot, variable) in definition.variables.iter().enumerate() {
            if slots.insert(variable.name.as_str(), slot).is_some() {
                return Err(EvalError::DuplicateVariable {
                    name: variable.name.clone(),
                });
            }
        }

        Ok(Self {
            definition,
            registry,
            slots,
            types: vec![None; definition.variables.len()],
            used_codelists: IndexSet::new(),
            diagnostics: Diagnostics::new(),
        })
    }

    pub fn compile(mut self) -> EvalResult<CompiledStudy> {
        let dependencies = self.dependencies()?;
        let order = topological_order(&dependencies)
            .map_err(|cycle| self.cycle_error(&cycle))?;

        let definition = self.definition;
        let mut compiled: Vec<Option<CompiledVariable>> = vec![None; definition.variables.len()];
        for &slot in &order {
            let variable = &definition.variables[slot];
            let (kind, value_type) = self.compile_variable(variable)?;
            debug!("Compiled variable {} as {}", variable.name, value_type);
            self.types[slot] = Some(value_type);
            compiled[slot] = Some(CompiledVariable {
                name: variable.name.clone(),
                kind,
            });
        }

        let population = self.compile_population()?;
        self.report_unused_codelists();

        let variables = compiled
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EvalError::internal("variable missing from evaluation order"))?;
        let types = self
            .types
            .iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EvalError::internal("variable left untyped"))?;

        let columns = self
            .definition
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.hidden)
            .map(|(slot, v)| Column {
                name: v.name.clone(),
                value_type: types[slot],
                date_format: v.date_format,
                slot,
            })
            .collect();

        Ok(CompiledStudy {
            index_date: self.definition.index_date,
            end_date: self.definition.end_date,
            variables,
            types,
            order,
            population,
            population_source: self.definition.population.to_string(),
            columns,
            diagnostics: self.diagnostics,
        })
    }

    fn dependencies(&self) -> EvalResult<Vec<Dependencies>> {
        self.definition
            .variables
            .iter()
            .map(|variable| {
                let mut deps = Dependencies::new();
                for name in variable.references() {
                    let slot = self.resolve(name, &variable.name)?;
                    if !deps.contains(&slot) {
                        deps.push(slot);
                    }
                }
                Ok(deps)
            })
            .collect()
    }

    fn resolve(&self, name: &str, referenced_by: &str) -> EvalResult<usize> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::unknown_variable(name, referenced_by))
    }

    fn cycle_error(&self, cycle: &[usize]) -> EvalError {
        EvalError::CyclicDependency {
            cycle: cycle
                .iter()
                .map(|&slot| self.definition.variables[slot].name.clone())
                .collect(),
        }
    }

    fn type_of(&self, slot: usize) -> EvalResult<ValueType> {
        self.types[slot].ok_or_else(|| {
            EvalError::internal(format!(
                "variable '{}' used before it was typed",
                self.definition.variables[slot].name
            ))
        })
    }

    fn compile_variable(&mut self, variable: &'a VariableSpec) -> EvalResult<(CompiledKind, ValueType)> {
        let name = variable.name.as_str();
        match &variable.kind {
            VariableKind::Events { query } => self.compile_events(name, query),
            VariableKind::Vaccination { query } => self.compile_vaccination(name, query),
            VariableKind::AgeAsOf { date } => Ok((
                CompiledKind::AgeAsOf(self.compile_date(name, date)?),
                ValueType::Integer,
            )),
            VariableKind::Sex => Ok((CompiledKind::Sex, ValueType::String)),
            VariableKind::DiedFromAnyCause { window, returning } => {
                let value_type = match returning {
                    Returning::BinaryFlag => ValueType::Integer,
                    Returning::Date => ValueType::Date,
                    other => {
                        return Err(EvalError::type_mismatch(name, "binary_flag or date", other.name()));
                    }
                };
                Ok((
                    CompiledKind::DiedFromAnyCause {
                        window: self.compile_window(name, window)?,
                        returning: *returning,
                    },
                    value_type,
                ))
            }
            VariableKind::RegisteredAsOf { date } => Ok((
                CompiledKind::RegisteredAsOf(self.compile_date(name, date)?),
                ValueType::Integer,
            )),
            VariableKind::RegisteredWithOnePracticeBetween { start, end } => Ok((
                CompiledKind::RegisteredWithOnePracticeBetween {
                    start: self.compile_date(name, start)?,
                    end: self.compile_date(name, end)?,
                },
                ValueType::Integer,
            )),
            VariableKind::DateDeregistered { window } => Ok((
                CompiledKind::DateDeregistered(self.compile_window(name, window)?),
                ValueType::Date,
            )),
            VariableKind::PracticeAsOf { date, attribute } => {
                let value_type = match attribute {
                    PracticeAttribute::PseudoId => ValueType::Integer,
                    PracticeAttribute::Nuts1RegionName | PracticeAttribute::StpCode => ValueType::String,
                };
                Ok((
                    CompiledKind::PracticeAsOf {
                        date: self.compile_date(name, date)?,
                        attribute: *attribute,
                    },
                    value_type,
                ))
            }
            VariableKind::AddressAsOf {
                date,
                attribute,
                round_to_nearest,
            } => {
                if round_to_nearest.is_some_and(|n| n <= 0) {
                    return Err(EvalError::type_mismatch(
                        name,
                        "positive round_to_nearest",
                        format!("{round_to_nearest:?}"),
                    ));
                }
                if *attribute == AddressAttribute::RuralUrbanClassification && round_to_nearest.is_some() {
                    return Err(EvalError::type_mismatch(
                        name,
                        "no rounding for rural_urban_classification",
                        "round_to_nearest",
                    ));
                }
                Ok((
                    CompiledKind::AddressAsOf {
                        date: self.compile_date(name, date)?,
                        attribute: *attribute,
                        round_to_nearest: *round_to_nearest,
                    },
                    ValueType::Integer,
                ))
            }
            VariableKind::DateOf { variable: target } => {
                let slot = self.resolve(target, name)?;
                let selection = match &self.definition.variables[slot].kind {
                    VariableKind::Events { query } => query.selection,
                    VariableKind::Vaccination { query } => query.selection,
                    _ => {
                        return Err(EvalError::type_mismatch(
                            name,
                            "date_of an event query",
                            format!("date_of '{target}'"),
                        ));
                    }
                };
                if selection == Selection::Unspecified {
                    return Err(EvalError::ambiguous_selection(target.as_str(), "a date for date_of"));
                }
                Ok((CompiledKind::DateOf(slot), ValueType::Date))
            }
            VariableKind::Satisfying { predicate } => {
                let (expr, _) = self.compile_expr(name, predicate)?;
                Ok((CompiledKind::Satisfying(expr), ValueType::Integer))
            }
            VariableKind::CategorisedAs { rule } => {
                let defaults = rule.default_count();
                if defaults != 1 {
                    return Err(EvalError::NoDefaultBranch {
                        variable: name.to_string(),
                        found: defaults,
                    });
                }

                let mut label_type: Option<ValueType> = None;
                let mut branches = Vec::new();
                let mut default = None;
                for branch in &rule.branches {
                    let found = branch.label.value_type().ok_or_else(|| {
                        EvalError::type_mismatch(name, "non-null category label", "null")
                    })?;
                    match label_type {
                        Some(expected) if expected != found => {
                            return Err(EvalError::type_mismatch(name, expected.name(), found.name()));
                        }
                        _ => label_type = Some(found),
                    }
                    match &branch.condition {
                        Condition::When(predicate) => {
                            let (expr, _) = self.compile_expr(name, predicate)?;
                            branches.push((expr, branch.label.clone()));
                        }
                        Condition::Default => default = Some(branch.label.clone()),
                    }
                }

                match (default, label_type) {
                    (Some(default), Some(value_type)) => {
                        Ok((CompiledKind::CategorisedAs { branches, default }, value_type))
                    }
                    _ => Err(EvalError::internal("categorisation default vanished")),
                }
            }
        }
    }

    fn compile_events(&mut self, name: &str, query: &'a EventQuery) -> EvalResult<(CompiledKind, ValueType)> {
        if query.returning.needs_selection() && query.selection == Selection::Unspecified {
            return Err(EvalError::ambiguous_selection(name, query.returning.name()));
        }

        let codelist = self.registry.get_shared(&query.codelist)?;
        self.used_codelists.insert(&query.codelist);
        let ignore_days_with = match &query.ignore_days_with {
            Some(list) => {
                self.used_codelists.insert(list);
                Some(self.registry.get_shared(list)?)
            }
            None => None,
        };

        let value_type = match query.returning {
            Returning::BinaryFlag | Returning::NumberOfMatches => ValueType::Integer,
            Returning::Date => ValueType::Date,
            Returning::NumericValue => ValueType::Decimal,
            Returning::Category => {
                if !codelist.is_categorised() {
                    return Err(EvalError::type_mismatch(
                        name,
                        "categorised codelist",
                        format!("codelist '{}' without categories", query.codelist),
                    ));
                }
                ValueType::String
            }
        };

        let window = self.compile_window(name, &query.window)?;
        Ok((
            CompiledKind::Events(CompiledEventQuery {
                table: query.table,
                codelist,
                window,
                selection: query.selection,
                returning: query.returning,
                ignore_missing_values: query.ignore_missing_values,
                ignore_days_with,
            }),
            value_type,
        ))
    }

    fn compile_vaccination(
        &mut self,
        name: &str,
        query: &'a VaccinationQuery,
    ) -> EvalResult<(CompiledKind, ValueType)> {
        if query.target_disease.is_none() && query.product_codelist.is_none() {
            return Err(EvalError::type_mismatch(
                name,
                "target disease or product codelist",
                "neither",
            ));
        }
        let value_type = match query.returning {
            Returning::BinaryFlag | Returning::NumberOfMatches => ValueType::Integer,
            Returning::Date => ValueType::Date,
            other => {
                return Err(EvalError::type_mismatch(
                    name,
                    "binary_flag, date or number_of_matches_in_period",
                    other.name(),
                ));
            }
        };
        if query.returning.needs_selection() && query.selection == Selection::Unspecified {
            return Err(EvalError::ambiguous_selection(name, query.returning.name()));
        }

        let products = match &query.product_codelist {
            Some(list) => {
                self.used_codelists.insert(list);
                Some(self.registry.get_shared(list)?)
            }
            None => None,
        };

        Ok((
            CompiledKind::Vaccination(CompiledVaccinationQuery {
                target_disease: query.target_disease.clone(),
                products,
                window: self.compile_window(name, &query.window)?,
                selection: query.selection,
                returning: query.returning,
            }),
            value_type,
        ))
    }

    fn compile_window(&mut self, name: &str, window: &DateWindow) -> EvalResult<CompiledWindow> {
        let start = window
            .on_or_after
            .as_ref()
            .map(|d| self.compile_date(name, d))
            .transpose()?;
        let end = window
            .on_or_before
            .as_ref()
            .map(|d| self.compile_date(name, d))
            .transpose()?;

        if let Some(CompiledDate::Fixed(start)) = &start {
            if *start > self.definition.end_date {
                self.diagnostics.push(
                    Diagnostic::warning(
                        COH0108,
                        format!("window {window} starts after the study end date"),
                    )
                    .with_subject(name),
                );
            }
            if let Some(CompiledDate::Fixed(end)) = &end {
                if start > end {
                    self.diagnostics.push(
                        Diagnostic::warning(COH0108, format!("window {window} is empty"))
                            .with_subject(name),
                    );
                }
            }
        }

        Ok(CompiledWindow { start, end })
    }

    fn compile_date(&self, name: &str, date: &DateExpr) -> EvalResult<CompiledDate> {
        match &date.anchor {
            DateAnchor::Variable { name: anchor } => {
                let slot = self.resolve(anchor, name)?;
                let found = self.type_of(slot)?;
                if found != ValueType::Date {
                    return Err(EvalError::type_mismatch(
                        name,
                        "Date",
                        format!("{found} ('{anchor}')"),
                    ));
                }
                Ok(CompiledDate::Relative {
                    slot,
                    offset: date.offset,
                    source: date.clone(),
                })
            }
            _ => date
                .resolve_static(self.definition.index_date, self.definition.end_date)
                .map(CompiledDate::Fixed)
                .ok_or_else(|| EvalError::date_overflow(name, date.to_string())),
        }
    }

    /// Compile an expression, returning its static type (`None` for a null literal)
    fn compile_expr(&self, context: &str, expr: &Expr) -> EvalResult<(CompiledExpr, Option<ValueType>)> {
        match expr {
            Expr::Literal { value } => Ok((CompiledExpr::Literal(value.clone()), value.value_type())),
            Expr::Variable { name } => {
                let slot = self.resolve(name, context)?;
                Ok((CompiledExpr::Slot(slot), Some(self.type_of(slot)?)))
            }
            Expr::Compare { op, left, right } => {
                let (left, left_type) = self.compile_expr(context, left)?;
                let (right, right_type) = self.compile_expr(context, right)?;
                if let (Some(l), Some(r)) = (left_type, right_type) {
                    if !l.is_comparable_with(&r) {
                        return Err(EvalError::type_mismatch(
                            context,
                            format!("operands comparable with {l} for '{op}'"),
                            r.name(),
                        ));
                    }
                }
                Ok((
                    CompiledExpr::Compare {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    Some(ValueType::Boolean),
                ))
            }
            Expr::And { operands } => Ok((
                CompiledExpr::And(self.compile_operands(context, operands)?),
                Some(ValueType::Boolean),
            )),
            Expr::Or { operands } => Ok((
                CompiledExpr::Or(self.compile_operands(context, operands)?),
                Some(ValueType::Boolean),
            )),
            Expr::Not { operand } => {
                let (operand, _) = self.compile_expr(context, operand)?;
                Ok((CompiledExpr::Not(Box::new(operand)), Some(ValueType::Boolean)))
            }
            Expr::IsNull { operand } => {
                let (operand, _) = self.compile_expr(context, operand)?;
                Ok((CompiledExpr::IsNull(Box::new(operand)), Some(ValueType::Boolean)))
            }
        }
    }

    fn compile_operands(&self, context: &str, operands: &[Expr]) -> EvalResult<Vec<CompiledExpr>> {
        operands
            .iter()
            .map(|operand| self.compile_expr(context, operand).map(|(expr, _)| expr))
            .collect()
    }

    fn compile_population(&self) -> EvalResult<CompiledExpr> {
        let population = &self.definition.population;
        let (expr, _) = self.compile_expr(POPULATION, population)?;
        if population.references().is_empty() && expr.truth(&[]).is_none() {
            return Err(EvalError::indeterminate(POPULATION, population.to_string()));
        }
        Ok(expr)
    }

    fn report_unused_codelists(&mut self) {
        for name in self.registry.names() {
            if !self.used_codelists.contains(name) {
                self.diagnostics.push(
                    Diagnostic::info(COH0107, format!("codelist '{name}' is not used by any variable"))
                        .with_subject(name),
                );
            }
        }
    }
}

/// Order slots so that every slot follows its dependencies
///
/// Among slots whose dependencies are met the lowest (earliest declared)
/// goes first. On failure returns one cycle, first slot repeated at the end.
fn topological_order(dependencies: &[Dependencies]) -> Result<Vec<usize>, Vec<usize>> {
    let count = dependencies.len();
    let mut pending: Vec<usize> = dependencies.iter().map(|d| d.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (slot, deps) in dependencies.iter().enumerate() {
        for &dep in deps {
            dependents[dep].push(slot);
        }
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|&slot| pending[slot] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(slot) = ready.pop_first() {
        order.push(slot);
        for &dependent in &dependents[slot] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == count {
        return Ok(order);
    }

    // Every unordered slot still waits on another unordered slot, so walking
    // unordered dependencies from any of them must revisit a slot.
    let unordered: BTreeSet<usize> = (0..count).filter(|&slot| pending[slot] > 0).collect();
    let mut path: Vec<usize> = Vec::new();
    let mut current = unordered.first().copied();
    while let Some(slot) = current {
        if let Some(start) = path.iter().position(|&s| s == slot) {
            let mut cycle = path.split_off(start);
            cycle.push(slot);
            return Err(cycle);
        }
        path.push(slot);
        current = dependencies[slot]
            .iter()
            .copied()
            .find(|dep| unordered.contains(dep));
    }
    Err(path)
}
