//! Patient-level behaviour of the main study

mod common;

use cohort_codelist::{Code, CodingSystem};
use cohort_eval::{CohortEngine, compile};
use cohort_expr::Value;
use cohort_model::{PatientRecord, Registration, Sex, VaccinationRecord};
use cohort_study::{StudyVariant, VaccineUptakeStudy};
use common::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use rust_decimal::Decimal;

fn engine() -> CohortEngine {
    let definition = VaccineUptakeStudy::new(StudyVariant::Main).definition();
    CohortEngine::new(compile(&definition, &fixture_registry()).unwrap())
}

#[test]
fn test_eligible_patient_is_included() {
    let engine = engine();
    let patient = eligible_patient(1);
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert!(evaluation.included);
    assert_eq!(evaluation.get("age"), Some(&Value::Integer(79)));
    assert_eq!(evaluation.get("sex"), Some(&Value::from("F")));
    assert_eq!(evaluation.get("practice_id_at_start"), Some(&Value::Integer(1)));
    assert_eq!(evaluation.get("practice_id_at_death"), Some(&Value::Null));
    assert_eq!(evaluation.get("index_of_multiple_deprivation"), Some(&Value::Integer(12300)));
    assert_eq!(evaluation.get("imd"), Some(&Value::Integer(2)));
    assert_eq!(evaluation.get("region"), Some(&Value::from("London")));
    assert_eq!(evaluation.get("stp"), Some(&Value::from("E54000027")));
    assert_eq!(evaluation.get("rural_urban"), Some(&Value::Integer(1)));
    assert_eq!(evaluation.get("covid_vax_1_date"), Some(&Value::Null));
    assert_eq!(evaluation.get("smoking_status"), Some(&Value::from("M")));
    assert_eq!(evaluation.get("flu_vaccine"), Some(&Value::Integer(0)));
    assert_eq!(evaluation.get("shielded"), Some(&Value::Integer(0)));
    assert_eq!(evaluation.get("shielded_since_feb_15"), Some(&Value::Integer(0)));
}

#[test]
fn test_hidden_inclusion_variables_are_not_output() {
    let engine = engine();
    let columns: Vec<&str> = engine.study().columns().iter().map(|c| c.name.as_str()).collect();

    for hidden in [
        "has_died",
        "registered",
        "has_follow_up_previous_year",
        "nursing_residential_care",
        "index_of_multiple_deprivation",
        "most_recent_smoking_code",
        "flu_vaccine_med",
        "previous_flag",
    ] {
        assert!(!columns.contains(&hidden), "{hidden} is output");
    }
    for shown in [
        "covid_vax_1_date",
        "age",
        "sex",
        "ethnicity",
        "imd",
        "smoking_status",
        "shielded",
        "chronic_kidney_disease_all_stages_1_5",
        "chronis_respiratory_disease",
    ] {
        assert!(columns.contains(&shown), "{shown} is missing");
    }
}

#[rstest]
#[case::died_before_index(eligible_patient(2).died(ymd(2020, 11, 1)))]
#[case::too_young(eligible_patient(3).born(ymd(1960, 1, 1)))]
#[case::no_birth_date(PatientRecord { date_of_birth: None, ..eligible_patient(4) })]
#[case::care_home(eligible_patient(5).with_clinical_event(snomed(CARE_HOME_RESIDENT, ymd(2019, 4, 1))))]
#[case::unknown_sex(eligible_patient(6).with_sex(Sex::Unknown))]
#[case::no_address(PatientRecord { addresses: Vec::new(), ..eligible_patient(7) })]
#[case::registered_recently(PatientRecord {
    registrations: vec![Registration {
        practice_pseudo_id: 9,
        start_date: ymd(2020, 6, 1),
        end_date: None,
        nuts1_region_name: Some("London".to_string()),
        stp_code: Some("E54000027".to_string()),
    }],
    ..eligible_patient(8)
})]
#[case::not_registered(PatientRecord { registrations: Vec::new(), ..eligible_patient(9) })]
fn test_exclusions(#[case] patient: PatientRecord) {
    let engine = engine();
    let evaluation = engine.evaluate_patient(&patient).unwrap();
    assert!(!evaluation.included);
}

#[test]
fn test_care_home_code_after_index_does_not_exclude() {
    let engine = engine();
    let patient = eligible_patient(10).with_clinical_event(snomed(CARE_HOME_RESIDENT, ymd(2021, 1, 5)));
    assert!(engine.evaluate_patient(&patient).unwrap().included);
}

#[test]
fn test_ethnicity_uses_latest_code_before_index() {
    let engine = engine();
    let patient = eligible_patient(11)
        .with_clinical_event(snomed(ETHNICITY_BRITISH, ymd(2005, 3, 1)))
        .with_clinical_event(snomed(ETHNICITY_INDIAN, ymd(2015, 1, 1)))
        .with_clinical_event(snomed(ETHNICITY_BRITISH, ymd(2021, 1, 1)));
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("ethnicity"), Some(&Value::from("5")));
    for other in [
        "ethnicity_other",
        "ethnicity_not_given",
        "ethnicity_not_stated",
        "ethnicity_no_record",
    ] {
        assert_eq!(evaluation.get(other), Some(&Value::Null), "{other}");
    }
}

#[test]
fn test_bmi_skips_events_without_a_value() {
    let engine = engine();
    let patient = eligible_patient(12)
        .with_clinical_event(snomed(BMI_RECORDED, ymd(2020, 2, 1)).with_value(Decimal::new(275, 1)))
        .with_clinical_event(snomed(BMI_RECORDED, ymd(2020, 6, 1)));
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("bmi"), Some(&Value::Decimal(Decimal::new(275, 1))));
}

#[rstest]
#[case::after_stage_with_value(ymd(2020, 1, 15), Some(Decimal::new(41, 0)), Value::Date(ymd(2020, 1, 15)))]
#[case::after_stage_without_value(ymd(2020, 1, 15), None, Value::Null)]
#[case::before_stage(ymd(2019, 1, 15), Some(Decimal::new(41, 0)), Value::Null)]
#[case::after_index(ymd(2021, 1, 15), Some(Decimal::new(41, 0)), Value::Null)]
fn test_sev_obesity_follows_bmi_stage(
    #[case] date: chrono::NaiveDate,
    #[case] value: Option<Decimal>,
    #[case] expected: Value,
) {
    let engine = engine();
    let mut event = snomed(SEVERELY_OBESE, date);
    event.value = value;
    let patient = eligible_patient(13)
        .with_clinical_event(snomed(BMI_STAGE_RECORDED, ymd(2019, 6, 1)))
        .with_clinical_event(event);
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("bmi_stage_date"), Some(&Value::Date(ymd(2019, 6, 1))));
    assert_eq!(evaluation.get("sev_obesity"), Some(&expected));
}

#[test]
fn test_sev_obesity_with_later_index_date() {
    let definition = VaccineUptakeStudy::new(StudyVariant::Main)
        .with_start_date(ymd(2021, 3, 17))
        .with_end_date(ymd(2021, 6, 30))
        .definition();
    let engine = CohortEngine::new(compile(&definition, &fixture_registry()).unwrap());
    let patient = eligible_patient(24)
        .with_clinical_event(snomed(BMI_STAGE_RECORDED, ymd(2021, 1, 10)))
        .with_clinical_event(snomed(SEVERELY_OBESE, ymd(2021, 1, 15)).with_value(Decimal::new(42, 0)));
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("sev_obesity"), Some(&Value::Date(ymd(2021, 1, 15))));
}

#[test]
fn test_sev_obesity_needs_a_bmi_stage() {
    let engine = engine();
    let patient = eligible_patient(14)
        .with_clinical_event(snomed(SEVERELY_OBESE, ymd(2020, 1, 15)).with_value(Decimal::new(41, 0)));
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("sev_obesity"), Some(&Value::Null));
}

#[rstest]
#[case::current(vec![(NEVER_SMOKED, ymd(2010, 1, 1)), (CURRENT_SMOKER, ymd(2019, 1, 1))], "S")]
#[case::ex(vec![(EX_SMOKER, ymd(2019, 1, 1))], "E")]
#[case::never_after_smoking(vec![(CURRENT_SMOKER, ymd(2010, 1, 1)), (NEVER_SMOKED, ymd(2019, 1, 1))], "E")]
#[case::never(vec![(NEVER_SMOKED, ymd(2019, 1, 1))], "N")]
#[case::missing(vec![], "M")]
fn test_smoking_status(#[case] codes: Vec<(&str, chrono::NaiveDate)>, #[case] expected: &str) {
    let engine = engine();
    let patient = codes
        .into_iter()
        .fold(eligible_patient(15), |patient, (code, date)| {
            patient.with_clinical_event(ctv3(code, date))
        });
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("smoking_status"), Some(&Value::from(expected)));
}

#[test]
fn test_covid_vaccination_after_index() {
    let engine = engine();
    let patient = eligible_patient(16)
        .with_vaccination(VaccinationRecord::for_disease("SARS-2 CORONAVIRUS", ymd(2020, 12, 7)))
        .with_vaccination(VaccinationRecord::for_product(
            Code::new(CodingSystem::Dmd, PFIZER_FIRST_DOSE),
            ymd(2020, 12, 20),
        ))
        .with_vaccination(VaccinationRecord::for_disease("SARS-2 CORONAVIRUS", ymd(2021, 1, 10)));
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("covid_vax_1_date"), Some(&Value::Date(ymd(2020, 12, 20))));
}

#[test]
fn test_censoring_dates() {
    let engine = engine();
    let patient = eligible_patient(17).died(ymd(2021, 1, 10));
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert!(evaluation.included);
    assert_eq!(evaluation.get("death_date"), Some(&Value::Date(ymd(2021, 1, 10))));
    assert_eq!(evaluation.get("practice_id_at_death"), Some(&Value::Integer(1)));
    assert_eq!(evaluation.get("dereg_date"), Some(&Value::Null));
}

#[rstest]
#[case::tpp_table(eligible_patient(18).with_vaccination(VaccinationRecord::for_disease("INFLUENZA", ymd(2018, 10, 1))), 1)]
#[case::clinical(eligible_patient(19).with_clinical_event(ctv3(FLU_GIVEN, ymd(2018, 10, 1))), 1)]
#[case::declined_same_day(
    eligible_patient(20)
        .with_clinical_event(ctv3(FLU_GIVEN, ymd(2018, 10, 1)))
        .with_clinical_event(ctv3(FLU_DECLINED, ymd(2018, 10, 1))),
    0
)]
#[case::outside_seasons(eligible_patient(21).with_clinical_event(ctv3(FLU_GIVEN, ymd(2020, 10, 1))), 0)]
fn test_flu_vaccine(#[case] patient: PatientRecord, #[case] expected: i64) {
    let engine = engine();
    let evaluation = engine.evaluate_patient(&patient).unwrap();
    assert_eq!(evaluation.get("flu_vaccine"), Some(&Value::Integer(expected)));
}

#[test]
fn test_prior_covid_takes_earliest_primary_care_code() {
    let engine = engine();
    let patient = eligible_patient(22)
        .with_clinical_event(ctv3(COVID_CLINICAL, ymd(2020, 5, 3)))
        .with_clinical_event(ctv3(COVID_POSITIVE_TEST, ymd(2020, 4, 20)));
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("prior_covid_date"), Some(&Value::Date(ymd(2020, 4, 20))));
}

#[rstest]
#[case::high_risk_only(vec![(HIGH_RISK_FLAG, ymd(2020, 4, 1))], 1, 0)]
#[case::lowered_later(vec![(HIGH_RISK_FLAG, ymd(2020, 4, 1)), (LOW_RISK_FLAG, ymd(2020, 9, 1))], 0, 0)]
#[case::raised_again(
    vec![(HIGH_RISK_FLAG, ymd(2020, 4, 1)), (LOW_RISK_FLAG, ymd(2020, 9, 1)), (HIGH_RISK_FLAG, ymd(2020, 11, 1))],
    1,
    0
)]
#[case::new_since_feb_15(vec![(HIGH_RISK_FLAG, ymd(2021, 2, 20))], 1, 1)]
#[case::flagged_before_feb_15(vec![(LOW_RISK_FLAG, ymd(2020, 6, 1)), (HIGH_RISK_FLAG, ymd(2021, 2, 20))], 1, 0)]
#[case::raised_again_after_feb_15(
    vec![(HIGH_RISK_FLAG, ymd(2021, 2, 20)), (LOW_RISK_FLAG, ymd(2021, 3, 1)), (HIGH_RISK_FLAG, ymd(2021, 3, 10))],
    1,
    1
)]
#[case::reduced_after_feb_15(vec![(HIGH_RISK_FLAG, ymd(2021, 2, 20)), (LOW_RISK_FLAG, ymd(2021, 3, 1))], 0, 0)]
#[case::never_flagged(vec![], 0, 0)]
fn test_shielding(
    #[case] flags: Vec<(&str, chrono::NaiveDate)>,
    #[case] shielded: i64,
    #[case] since_feb_15: i64,
) {
    let engine = engine();
    let patient = flags
        .into_iter()
        .fold(eligible_patient(23), |patient, (code, date)| {
            patient.with_clinical_event(snomed(code, date))
        });
    let evaluation = engine.evaluate_patient(&patient).unwrap();

    assert_eq!(evaluation.get("shielded"), Some(&Value::Integer(shielded)));
    assert_eq!(evaluation.get("shielded_since_feb_15"), Some(&Value::Integer(since_feb_15)));
}

#[test]
fn test_imd_quintile_boundaries() {
    let engine = engine();
    let with_rank = |id: u64, rank: i64| {
        let mut patient = eligible_patient(id);
        patient.addresses[0].imd_rank = Some(rank);
        patient
    };

    let imd = |patient: PatientRecord| {
        engine
            .evaluate_patient(&patient)
            .unwrap()
            .get("imd")
            .cloned()
    };
    assert_eq!(imd(with_rank(30, 100)), Some(Value::Integer(1)));
    assert_eq!(imd(with_rank(31, 6500)), Some(Value::Integer(1)));
    assert_eq!(imd(with_rank(32, 6600)), Some(Value::Integer(2)));
    assert_eq!(imd(with_rank(33, 32_800)), Some(Value::Integer(5)));
    assert_eq!(imd(with_rank(34, 20)), Some(Value::Integer(0)));
}
