//! Cohort evaluation engine
//!
//! The engine evaluates a [`CompiledStudy`] against patient records. Each
//! patient is evaluated independently: variables are resolved in the
//! compiled order into per-patient slots, then the population predicate
//! decides inclusion.
//!
//! Batches run on the `rayon` thread pool. The compiled study and its
//! codelists are shared by reference; a failing patient is recorded and the
//! batch carries on.

use crate::compiled::{
    CompiledDate, CompiledEventQuery, CompiledKind, CompiledStudy, CompiledVaccinationQuery,
    CompiledWindow,
};
use crate::error::{EvalError, EvalResult, PatientFailure};
use crate::selection::{Resolution, select};
use crate::variable::{AddressAttribute, EventTable, PracticeAttribute, Returning};
use chrono::NaiveDate;
use cohort_expr::Value;
use cohort_model::{PatientId, PatientRecord};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;

/// Resolved, inclusive date bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Period {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl Period {
    fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

/// Per-patient working state
struct PatientState<'p> {
    record: &'p PatientRecord,
    values: Vec<Value>,
    /// Date of the event each event query selected
    selected: Vec<Option<NaiveDate>>,
}

/// All variable values for one patient
#[derive(Debug, Clone)]
pub struct PatientEvaluation<'s> {
    study: &'s CompiledStudy,
    pub patient_id: PatientId,
    /// Whether the population predicate held
    pub included: bool,
    /// Events skipped because they lack a date or code
    pub malformed_events: usize,
    values: Vec<Value>,
}

impl PatientEvaluation<'_> {
    /// Value of any variable, hidden ones included
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.study.slot(name).map(|slot| &self.values[slot])
    }

    /// The output row, if the patient is in the population
    pub fn row(&self) -> Option<OutputRow> {
        self.included.then(|| OutputRow {
            patient_id: self.patient_id,
            values: self
                .study
                .columns()
                .iter()
                .map(|column| self.values[column.slot].clone())
                .collect(),
        })
    }
}

/// One output row: the patient id and one value per output column
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub patient_id: PatientId,
    pub values: Vec<Value>,
}

/// Counts for a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationSummary {
    pub patients: usize,
    pub included: usize,
    pub excluded: usize,
    pub failed: usize,
    pub malformed_events: usize,
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} patients: {} included, {} excluded, {} failed; {} malformed events skipped",
            self.patients, self.included, self.excluded, self.failed, self.malformed_events
        )
    }
}

/// Result of evaluating a batch of patients
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchResult {
    /// Rows of included patients, in input order
    pub rows: Vec<OutputRow>,
    /// Patients that could not be evaluated, in input order
    pub failures: Vec<PatientFailure>,
    pub summary: EvaluationSummary,
}

/// Evaluates a compiled study against patient records
#[derive(Debug, Clone)]
pub struct CohortEngine {
    study: CompiledStudy,
}

impl CohortEngine {
    pub fn new(study: CompiledStudy) -> Self {
        Self { study }
    }

    pub fn study(&self) -> &CompiledStudy {
        &self.study
    }

    /// Evaluate every variable and the population predicate for one patient
    ///
    /// Fails with `IndeterminatePredicate` if the population predicate is
    /// unknown for this patient, or `DateOverflow` if a relative window
    /// leaves the calendar.
    pub fn evaluate_patient(&self, record: &PatientRecord) -> EvalResult<PatientEvaluation<'_>> {
        let malformed_events = count_malformed(record);
        if malformed_events > 0 {
            debug!(
                "Patient {}: skipping {} malformed events",
                record.patient_id, malformed_events
            );
        }

        let slots = self.study.variables.len();
        let mut state = PatientState {
            record,
            values: vec![Value::Null; slots],
            selected: vec![None; slots],
        };

        for &slot in &self.study.order {
            let variable = &self.study.variables[slot];
            let (value, selected) = self.evaluate_kind(&variable.name, &variable.kind, &state)?;
            state.values[slot] = value;
            state.selected[slot] = selected;
        }

        let included = self.study.population.truth(&state.values).ok_or_else(|| {
            EvalError::indeterminate("population", self.study.population_source.clone())
        })?;

        Ok(PatientEvaluation {
            study: &self.study,
            patient_id: record.patient_id,
            included,
            malformed_events,
            values: state.values,
        })
    }

    /// Evaluate a batch on the global thread pool
    pub fn evaluate_batch(&self, patients: &[PatientRecord]) -> BatchResult {
        let outcomes: Vec<Result<(Option<OutputRow>, usize), PatientFailure>> = patients
            .par_iter()
            .map(|record| {
                self.evaluate_patient(record)
                    .map(|evaluation| (evaluation.row(), evaluation.malformed_events))
                    .map_err(|error| PatientFailure {
                        patient_id: record.patient_id,
                        error,
                    })
            })
            .collect();

        let mut result = BatchResult::default();
        result.summary.patients = patients.len();
        for outcome in outcomes {
            match outcome {
                Ok((Some(row), malformed)) => {
                    result.summary.included += 1;
                    result.summary.malformed_events += malformed;
                    result.rows.push(row);
                }
                Ok((None, malformed)) => {
                    result.summary.excluded += 1;
                    result.summary.malformed_events += malformed;
                }
                Err(failure) => {
                    warn!("Patient {} failed: {}", failure.patient_id, failure.error);
                    result.summary.failed += 1;
                    result.failures.push(failure);
                }
            }
        }

        info!("Evaluation finished: {}", result.summary);
        result
    }

    /// Evaluate a batch on a dedicated pool with `threads` workers
    pub fn evaluate_batch_with_threads(
        &self,
        patients: &[PatientRecord],
        threads: usize,
    ) -> EvalResult<BatchResult> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| EvalError::internal(format!("failed to build thread pool: {e}")))?;
        Ok(pool.install(|| self.evaluate_batch(patients)))
    }

    fn evaluate_kind(
        &self,
        name: &str,
        kind: &CompiledKind,
        state: &PatientState<'_>,
    ) -> EvalResult<(Value, Option<NaiveDate>)> {
        let record = state.record;
        let value: Value = match kind {
            CompiledKind::Events(query) => return self.evaluate_events(name, query, state),
            CompiledKind::Vaccination(query) => return self.evaluate_vaccination(name, query, state),
            CompiledKind::AgeAsOf(date) => {
                resolve_date(name, date, state)?.and_then(|d| record.age_on(d)).into()
            }
            CompiledKind::Sex => record.sex.map(|sex| sex.label()).into(),
            CompiledKind::DiedFromAnyCause { window, returning } => {
                let died = match resolve_window(name, window, state)? {
                    Some(period) => record.date_of_death.filter(|d| period.contains(*d)),
                    None => None,
                };
                match returning {
                    Returning::Date => died.into(),
                    _ => Value::flag(died.is_some()),
                }
            }
            CompiledKind::RegisteredAsOf(date) => resolve_date(name, date, state)?
                .map_or(Value::Null, |d| Value::flag(record.is_registered_on(d))),
            CompiledKind::RegisteredWithOnePracticeBetween { start, end } => {
                match (resolve_date(name, start, state)?, resolve_date(name, end, state)?) {
                    (Some(start), Some(end)) => Value::flag(record.is_continuously_registered(start, end)),
                    _ => Value::Null,
                }
            }
            CompiledKind::DateDeregistered(window) => match resolve_window(name, window, state)? {
                Some(period) => record.date_deregistered().filter(|d| period.contains(*d)).into(),
                None => Value::Null,
            },
            CompiledKind::PracticeAsOf { date, attribute } => {
                let registration = resolve_date(name, date, state)?.and_then(|d| record.registration_on(d));
                match (registration, attribute) {
                    (None, _) => Value::Null,
                    (Some(r), PracticeAttribute::PseudoId) => Value::Integer(r.practice_pseudo_id),
                    (Some(r), PracticeAttribute::Nuts1RegionName) => r.nuts1_region_name.clone().into(),
                    (Some(r), PracticeAttribute::StpCode) => r.stp_code.clone().into(),
                }
            }
            CompiledKind::AddressAsOf {
                date,
                attribute,
                round_to_nearest,
            } => {
                let address = resolve_date(name, date, state)?.and_then(|d| record.address_on(d));
                let raw = address.and_then(|a| match attribute {
                    AddressAttribute::IndexOfMultipleDeprivation => a.imd_rank,
                    AddressAttribute::RuralUrbanClassification => a.rural_urban,
                });
                match (raw, round_to_nearest) {
                    (Some(v), Some(n)) => Value::Integer(round_to(v, *n)),
                    (raw, _) => raw.into(),
                }
            }
            CompiledKind::DateOf(slot) => state.selected[*slot].into(),
            CompiledKind::Satisfying(predicate) => predicate
                .truth(&state.values)
                .map_or(Value::Null, Value::flag),
            CompiledKind::CategorisedAs { branches, default } => branches
                .iter()
                .find(|(predicate, _)| predicate.truth(&state.values) == Some(true))
                .map_or_else(|| default.clone(), |(_, label)| label.clone()),
        };
        Ok((value, None))
    }

    fn evaluate_events(
        &self,
        name: &str,
        query: &CompiledEventQuery,
        state: &PatientState<'_>,
    ) -> EvalResult<(Value, Option<NaiveDate>)> {
        let Some(period) = resolve_window(name, &query.window, state)? else {
            return Ok((empty_output(query.returning), None));
        };

        let events = match query.table {
            EventTable::Clinical => &state.record.clinical_events,
            EventTable::Medications => &state.record.medications,
        };

        let ignored_days: HashSet<NaiveDate> = match &query.ignore_days_with {
            Some(ignore) => events
                .iter()
                .filter(|e| !e.is_malformed() && ignore.contains(&e.to_code()))
                .filter_map(|e| e.date)
                .collect(),
            None => HashSet::new(),
        };

        let candidates = events.iter().filter_map(|event| {
            let date = event.date?;
            let qualifies = !event.is_malformed()
                && period.contains(date)
                && !(query.ignore_missing_values && event.value.is_none())
                && !ignored_days.contains(&date)
                && query.codelist.contains(&event.to_code());
            qualifies.then_some((event, date))
        });

        let resolution = select(query.selection, candidates);
        let value: Value = match query.returning {
            Returning::Category => resolution
                .event()
                .and_then(|e| query.codelist.category(&e.to_code()))
                .into(),
            Returning::NumericValue => resolution.event().and_then(|e| e.value).into(),
            returning => scalar_output(returning, &resolution),
        };
        Ok((value, resolution.date()))
    }

    fn evaluate_vaccination(
        &self,
        name: &str,
        query: &CompiledVaccinationQuery,
        state: &PatientState<'_>,
    ) -> EvalResult<(Value, Option<NaiveDate>)> {
        let Some(period) = resolve_window(name, &query.window, state)? else {
            return Ok((empty_output(query.returning), None));
        };

        let candidates = state.record.vaccinations.iter().filter_map(|record| {
            let date = record.date?;
            let by_disease = query
                .target_disease
                .as_deref()
                .zip(record.target_disease.as_deref())
                .is_some_and(|(wanted, given)| wanted.eq_ignore_ascii_case(given));
            let by_product = query
                .products
                .as_deref()
                .zip(record.product.as_ref())
                .is_some_and(|(list, product)| list.contains(product));
            (!record.is_malformed() && period.contains(date) && (by_disease || by_product))
                .then_some((record, date))
        });

        let resolution = select(query.selection, candidates);
        Ok((scalar_output(query.returning, &resolution), resolution.date()))
    }
}

fn count_malformed(record: &PatientRecord) -> usize {
    let events = record
        .clinical_events
        .iter()
        .chain(&record.medications)
        .filter(|e| e.is_malformed())
        .count();
    let vaccinations = record.vaccinations.iter().filter(|v| v.is_malformed()).count();
    events + vaccinations
}

/// Output of a query whose window matches nothing
fn empty_output(returning: Returning) -> Value {
    match returning {
        Returning::BinaryFlag | Returning::NumberOfMatches => Value::Integer(0),
        _ => Value::Null,
    }
}

fn scalar_output<E>(returning: Returning, resolution: &Resolution<'_, E>) -> Value {
    match returning {
        Returning::BinaryFlag => Value::flag(resolution.matches() > 0),
        Returning::NumberOfMatches => Value::Integer(resolution.matches() as i64),
        Returning::Date => resolution.date().into(),
        Returning::Category | Returning::NumericValue => Value::Null,
    }
}

/// Round half away from zero to a multiple of `step`
fn round_to(value: i64, step: i64) -> i64 {
    let half = step / 2;
    let adjusted = if value >= 0 {
        value.saturating_add(half)
    } else {
        value.saturating_sub(half)
    };
    (adjusted / step) * step
}

fn resolve_date(name: &str, date: &CompiledDate, state: &PatientState<'_>) -> EvalResult<Option<NaiveDate>> {
    match date {
        CompiledDate::Fixed(date) => Ok(Some(*date)),
        CompiledDate::Relative { slot, offset, source } => {
            let Some(anchor) = state.values[*slot].as_date() else {
                return Ok(None);
            };
            match offset {
                Some(offset) => offset
                    .apply(anchor)
                    .map(Some)
                    .ok_or_else(|| EvalError::date_overflow(name, source.to_string())),
                None => Ok(Some(anchor)),
            }
        }
    }
}

/// Resolve a window; `None` if a bound is null, so nothing can match
fn resolve_window(
    name: &str,
    window: &CompiledWindow,
    state: &PatientState<'_>,
) -> EvalResult<Option<Period>> {
    let start = match &window.start {
        Some(date) => match resolve_date(name, date, state)? {
            Some(date) => Some(date),
            None => return Ok(None),
        },
        None => None,
    };
    let end = match &window.end {
        Some(date) => match resolve_date(name, date, state)? {
            Some(date) => Some(date),
            None => return Ok(None),
        },
        None => None,
    };
    Ok(Some(Period { start, end }))
}
