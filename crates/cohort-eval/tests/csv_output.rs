//! CSV rendering of evaluation results

mod common;

use cohort_codelist::CodingSystem;
use cohort_eval::{
    CohortEngine, DateFormat, EventQuery, Returning, StudyDefinition, VariableKind, VariableSpec,
    compile, write_csv, write_csv_file,
};
use cohort_expr::DateExpr;
use cohort_model::{CodedEvent, PatientRecord, Sex};
use common::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn definition() -> StudyDefinition {
    StudyDefinition::new(index_date(), end_date())
        .with_variable(VariableSpec::new("sex", VariableKind::Sex))
        .with_variable(
            VariableSpec::new(
                "age",
                VariableKind::AgeAsOf {
                    date: DateExpr::index_date(),
                },
            )
            .hidden(),
        )
        .with_variable(VariableSpec::new(
            "ethnicity",
            EventQuery::clinical("ethnicity_codes")
                .find_last_match_in_period()
                .returning(Returning::Category),
        ))
        .with_variable(
            VariableSpec::new(
                "sev_obesity",
                EventQuery::clinical("sev_obesity_codes")
                    .find_last_match_in_period()
                    .returning(Returning::Date),
            )
            .with_date_format(DateFormat::YearMonth),
        )
}

fn patients() -> Vec<PatientRecord> {
    vec![
        PatientRecord::new(7)
            .with_sex(Sex::Male)
            .with_clinical_event(CodedEvent::new(CodingSystem::Snomed, "976631000000101", ymd(2015, 1, 1)))
            .with_clinical_event(CodedEvent::new(CodingSystem::Ctv3, "22K8.", ymd(2021, 1, 15))),
        PatientRecord::new(8),
    ]
}

#[test]
fn test_write_csv_renders_nulls_and_date_formats() {
    let engine = CohortEngine::new(compile(&definition(), &registry()).unwrap());
    let result = engine.evaluate_batch(&patients());

    let mut buffer = Vec::new();
    write_csv(engine.study(), &result.rows, &mut buffer).unwrap();

    assert_eq!(
        String::from_utf8(buffer).unwrap(),
        "patient_id,sex,ethnicity,sev_obesity\n\
         7,M,5,2021-01\n\
         8,,,\n"
    );
}

#[test]
fn test_write_csv_file_replaces_existing_output() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("input.csv");
    std::fs::write(&path, "stale").unwrap();

    let engine = CohortEngine::new(compile(&definition(), &registry()).unwrap());
    let result = engine.evaluate_batch(&patients());
    write_csv_file(engine.study(), &result.rows, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("patient_id,sex,ethnicity,sev_obesity\n"));
    assert_eq!(written.lines().count(), 3);
}

#[test]
fn test_empty_batch_writes_header_only() {
    let engine = CohortEngine::new(compile(&definition(), &registry()).unwrap());

    let mut buffer = Vec::new();
    write_csv(engine.study(), &[], &mut buffer).unwrap();

    assert_eq!(String::from_utf8(buffer).unwrap(), "patient_id,sex,ethnicity,sev_obesity\n");
}
