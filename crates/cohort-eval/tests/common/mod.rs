//! Shared fixtures for cohort-eval integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use cohort_codelist::{Code, Codelist, CodelistRegistry, CodingSystem};
use cohort_model::{Address, PatientRecord, Registration};

pub const INDEX_DATE: (i32, u32, u32) = (2020, 12, 7);
pub const END_DATE: (i32, u32, u32) = (2021, 3, 17);

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn index_date() -> NaiveDate {
    ymd(INDEX_DATE.0, INDEX_DATE.1, INDEX_DATE.2)
}

pub fn end_date() -> NaiveDate {
    ymd(END_DATE.0, END_DATE.1, END_DATE.2)
}

pub fn registration(practice: i64, start: NaiveDate, end: Option<NaiveDate>) -> Registration {
    Registration {
        practice_pseudo_id: practice,
        start_date: start,
        end_date: end,
        nuts1_region_name: Some("London".to_string()),
        stp_code: Some("E54000027".to_string()),
    }
}

pub fn address(start: NaiveDate, imd_rank: i64) -> Address {
    Address {
        start_date: start,
        end_date: None,
        imd_rank: Some(imd_rank),
        rural_urban: Some(1),
    }
}

/// A registered patient born on the given date
pub fn registered_patient(patient_id: u64, born: NaiveDate) -> PatientRecord {
    PatientRecord::new(patient_id)
        .born(born)
        .with_registration(registration(1, ymd(2000, 1, 1), None))
}

/// Codelists used across scenarios
pub fn registry() -> CodelistRegistry {
    let mut builder = CodelistRegistry::builder();
    builder
        .insert(
            Codelist::from_entries(
                "ethnicity_codes",
                [
                    (Code::snomed("976631000000101"), Some("5".to_string())),
                    (Code::snomed("92491000000104"), Some("1".to_string())),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    builder
        .insert(Codelist::from_codes("sev_obesity_codes", CodingSystem::Ctv3, ["22K8."]).unwrap())
        .unwrap();
    builder
        .insert(Codelist::from_codes("shield_codes", CodingSystem::Snomed, ["1300561000000107"]).unwrap())
        .unwrap();
    builder
        .insert(Codelist::from_codes("bmi_codes", CodingSystem::Ctv3, ["22K.."]).unwrap())
        .unwrap();
    builder
        .insert(Codelist::from_codes("bmi_stage_codes", CodingSystem::Ctv3, ["22KC."]).unwrap())
        .unwrap();
    builder
        .insert(Codelist::from_codes("covid_vaccine_products", CodingSystem::Dmd, ["39115611000001103"]).unwrap())
        .unwrap();
    builder.build()
}
