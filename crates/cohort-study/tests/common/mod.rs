//! Shared fixtures for cohort-study integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use cohort_codelist::{CodelistRegistry, CodingSystem};
use cohort_model::{Address, CodedEvent, PatientRecord, Registration, Sex};
use cohort_study::codelists::*;
use cohort_study::{StudyConfig, load_registry, study_manifest};
use std::path::Path;

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub const ETHNICITY_INDIAN: &str = "976631000000101";
pub const ETHNICITY_BRITISH: &str = "92491000000104";
pub const CURRENT_SMOKER: &str = "137R.";
pub const EX_SMOKER: &str = "137S.";
pub const NEVER_SMOKED: &str = "1371.";
pub const CARE_HOME_RESIDENT: &str = "160734000";
pub const BMI_RECORDED: &str = "60621009";
pub const BMI_STAGE_RECORDED: &str = "914741000000103";
pub const SEVERELY_OBESE: &str = "408512008";
pub const HIGH_RISK_FLAG: &str = "1300561000000107";
pub const LOW_RISK_FLAG: &str = "1300591000000101";
pub const HEART_FAILURE: &str = "22298006";
pub const FLU_GIVEN: &str = "65E..";
pub const FLU_DECLINED: &str = "9OX5.";
pub const COVID_CLINICAL: &str = "Y20d1";
pub const COVID_POSITIVE_TEST: &str = "Y240b";
pub const PFIZER_FIRST_DOSE: &str = "39115611000001103";

/// Rows written to each codelist file: (list, code, category)
const FIXTURE_CODES: &[(&str, &str, Option<&str>)] = &[
    (ETHNICITY, ETHNICITY_INDIAN, Some("5")),
    (ETHNICITY, ETHNICITY_BRITISH, Some("1")),
    (CLEAR_SMOKING, CURRENT_SMOKER, Some("S")),
    (CLEAR_SMOKING, EX_SMOKER, Some("E")),
    (CLEAR_SMOKING, NEVER_SMOKED, Some("N")),
    (CARE_HOME, CARE_HOME_RESIDENT, None),
    (BMI, BMI_RECORDED, None),
    (BMI_STAGE, BMI_STAGE_RECORDED, None),
    (SEV_OBESITY, SEVERELY_OBESE, None),
    (SHIELDING, HIGH_RISK_FLAG, None),
    (NON_SHIELDING, LOW_RISK_FLAG, None),
    (CHRONIC_HEART_DISEASE, HEART_FAILURE, None),
    (FLU_CLINICAL_GIVEN, FLU_GIVEN, None),
    (FLU_CLINICAL_NOT_GIVEN, FLU_DECLINED, None),
    (COVID_PRIMARY_CARE_CODE, COVID_CLINICAL, None),
    (COVID_PRIMARY_CARE_POSITIVE_TEST, COVID_POSITIVE_TEST, None),
    (COVID_VACCINE_PRODUCTS, PFIZER_FIRST_DOSE, None),
];

/// Write one CSV per manifest source into `dir`, with the columns the
/// manifest declares; lists without fixture rows get a header only
pub fn write_codelists(dir: &Path) {
    for entry in study_manifest().sources {
        let source = &entry.source;
        let mut contents = source.column.clone();
        if let Some(column) = &source.category_column {
            contents.push(',');
            contents.push_str(column);
        }
        contents.push('\n');

        for (_, code, category) in FIXTURE_CODES.iter().filter(|(name, ..)| *name == entry.name) {
            contents.push_str(code);
            if source.category_column.is_some() {
                contents.push(',');
                contents.push_str(category.unwrap_or_default());
            }
            contents.push('\n');
        }
        std::fs::write(dir.join(&source.path), contents).unwrap();
    }
}

/// Registry built from the fixture codelist files
pub fn fixture_registry() -> CodelistRegistry {
    let dir = tempfile::tempdir().unwrap();
    write_codelists(dir.path());
    let config = StudyConfig {
        codelist_dir: dir.path().to_path_buf(),
        ..StudyConfig::default()
    };
    load_registry(&config).unwrap()
}

pub fn clinical(system: CodingSystem, code: &str, date: NaiveDate) -> CodedEvent {
    CodedEvent::new(system, code, date)
}

pub fn snomed(code: &str, date: NaiveDate) -> CodedEvent {
    clinical(CodingSystem::Snomed, code, date)
}

pub fn ctv3(code: &str, date: NaiveDate) -> CodedEvent {
    clinical(CodingSystem::Ctv3, code, date)
}

/// A patient who meets every inclusion criterion of the main study
///
/// Aged 79 on the age reference date, registered with practice 1 since
/// 2000 and living at an address with deprivation rank 12345.
pub fn eligible_patient(patient_id: u64) -> PatientRecord {
    PatientRecord::new(patient_id)
        .born(ymd(1940, 5, 1))
        .with_sex(Sex::Female)
        .with_registration(Registration {
            practice_pseudo_id: 1,
            start_date: ymd(2000, 1, 1),
            end_date: None,
            nuts1_region_name: Some("London".to_string()),
            stp_code: Some("E54000027".to_string()),
        })
        .with_address(Address {
            start_date: ymd(2010, 1, 1),
            end_date: None,
            imd_rank: Some(12345),
            rural_urban: Some(1),
        })
}
