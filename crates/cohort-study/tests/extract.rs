//! Full runs from a config file on disk

mod common;

use cohort_codelist::CodelistError;
use cohort_diagnostics::{COH0108, Severity};
use cohort_study::{StudyConfig, StudyError, StudyVariant, compile_study, extract, load_registry};
use common::*;
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

const PATIENTS: &str = r#"[
  {
    "patient_id": 1,
    "date_of_birth": "1940-05-01",
    "sex": "F",
    "registrations": [
      { "practice_pseudo_id": 1, "start_date": "2000-01-01",
        "nuts1_region_name": "London", "stp_code": "E54000027" }
    ],
    "addresses": [
      { "start_date": "2010-01-01", "imd_rank": 12345, "rural_urban": 1 }
    ],
    "clinical_events": [
      { "system": "snomed", "code": "976631000000101", "date": "2015-01-01" },
      { "system": "ctv3", "code": "137R.", "date": "2019-03-01" },
      { "system": "snomed" , "code": "" , "date": "2019-03-01" }
    ],
    "vaccinations": [
      { "date": "2021-01-05", "target_disease": "SARS-2 CORONAVIRUS" }
    ]
  },
  { "patient_id": 2, "date_of_birth": "1990-02-02", "sex": "M" }
]"#;

/// A run directory with codelists, patients and a config using relative paths
fn run_dir(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("codelists")).unwrap();
    write_codelists(&dir.path().join("codelists"));
    std::fs::write(dir.path().join("patients.json"), PATIENTS).unwrap();
    std::fs::write(dir.path().join("study.json"), config).unwrap();
    dir
}

fn load_config(dir: &Path) -> StudyConfig {
    StudyConfig::from_json_file(dir.join("study.json")).unwrap()
}

#[test]
fn test_extract_writes_included_patients() {
    let dir = run_dir(
        r#"{ "codelist_dir": "codelists", "patients": "patients.json",
             "output": "out/input.csv", "threads": 2 }"#,
    );
    let config = load_config(dir.path());
    let report = extract(&config).unwrap();

    assert_eq!(report.summary.patients, 2);
    assert_eq!(report.summary.included, 1);
    assert_eq!(report.summary.excluded, 1);
    assert_eq!(report.summary.malformed_events, 1);
    assert!(report.failures.is_empty());
    assert_eq!(report.output, dir.path().join("out/input.csv"));

    let csv = std::fs::read_to_string(&report.output).unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("patient_id,covid_vax_1_date,death_date,dereg_date,age,sex,ethnicity,"));
    assert!(!header.contains("has_died"));

    let row: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(&row[..7], &["1", "2021-01-05", "", "", "79", "F", "5"]);
    assert_eq!(lines.next(), None);
}

#[test]
fn test_flow_chart_extract() {
    let dir = run_dir(r#"{ "variant": "flow_chart", "output": "flow.csv" }"#);
    let config = load_config(dir.path());
    assert_eq!(config.variant, StudyVariant::FlowChart);

    let report = extract(&config).unwrap();
    assert_eq!(report.summary.included, 2);

    let csv = std::fs::read_to_string(dir.path().join("flow.csv")).unwrap();
    assert_eq!(
        csv.lines().next().unwrap(),
        "patient_id,covid_vax_1_date,has_died,registered,age,has_follow_up_previous_year,\
         nursing_residential_care,sex,imd,death_date"
    );
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn test_missing_codelist_file_stops_the_run() {
    let dir = run_dir("{}");
    std::fs::remove_file(dir.path().join("codelists/primis-covid19-vacc-uptake-bmi.csv")).unwrap();
    let config = load_config(dir.path());

    let error = extract(&config).unwrap_err();
    assert!(matches!(
        error,
        StudyError::Codelist(CodelistError::MissingSource { .. })
    ));
    assert!(!config.output.exists());
}

#[test]
fn test_missing_patient_file_stops_the_run() {
    let dir = run_dir(r#"{ "patients": "elsewhere.json" }"#);
    let config = load_config(dir.path());

    let error = extract(&config).unwrap_err();
    assert!(matches!(error, StudyError::Model(_)));
    assert!(error.code().is_system_error());
}

#[test]
fn test_invalid_config_is_reported_with_its_path() {
    let dir = run_dir(r#"{ "threads": "many" }"#);
    let error = StudyConfig::from_json_file(dir.path().join("study.json")).unwrap_err();

    assert!(error.to_string().contains("study.json"));
    assert_eq!(error.code().to_string(), "COH0402");
}

#[test]
fn test_default_study_compiles_without_warnings() {
    let dir = run_dir("{}");
    let config = load_config(dir.path());
    let registry = load_registry(&config).unwrap();
    let study = compile_study(&config, &registry).unwrap();

    assert_eq!(study.diagnostics().count(Severity::Warning), 0);
    assert_eq!(study.index_date(), config.start_date);
}

#[test]
fn test_short_study_warns_about_late_windows() {
    let dir = run_dir(r#"{ "end_date": "2021-01-31" }"#);
    let config = load_config(dir.path());
    let registry = load_registry(&config).unwrap();
    let study = compile_study(&config, &registry).unwrap();

    let warning = study
        .diagnostics()
        .iter()
        .find(|d| d.severity == Severity::Warning)
        .unwrap();
    assert_eq!(warning.code, COH0108);
    assert_eq!(
        warning.subject.as_deref(),
        Some("severely_clinically_vulnerable_since_feb_15")
    );
}
