//! Codelists of the vaccine uptake study
//!
//! Paths are relative to the codelist directory of a run. Derived lists are
//! built after every source has loaded.

use cohort_codelist::{
    CodelistManifest, CodelistSource, CodingSystem, ConflictPolicy, DerivedCodelist, SourceEntry,
};

/// Ethnicity with 16-group categories
pub const ETHNICITY: &str = "ethnicity_codes";
pub const ETHNICITY_OTHER: &str = "ethnicity_other_codes";
pub const ETHNICITY_NOT_GIVEN: &str = "ethnicity_not_given_codes";
pub const ETHNICITY_NOT_STATED: &str = "ethnicity_not_stated_codes";
pub const ETHNICITY_NO_RECORD: &str = "ethnicity_no_record_codes";
/// Smoking status with `S`/`E`/`N` categories
pub const CLEAR_SMOKING: &str = "clear_smoking_codes";
/// Current or ex smoker subset of [`CLEAR_SMOKING`]
pub const EVER_SMOKED: &str = "ever_smoked_codes";
pub const BMI: &str = "bmi_codes";
pub const BMI_STAGE: &str = "bmi_stage_codes";
pub const SEV_OBESITY: &str = "sev_obesity_codes";
pub const CHRONIC_HEART_DISEASE: &str = "chronic_heart_disease_codes";
pub const DIABETES: &str = "diabetes_codes";
pub const CKD_DIAGNOSTIC: &str = "chronic_kidney_disease_diagnostic_codes";
pub const CKD_ALL_STAGES: &str = "chronic_kidney_disease_codes_all_stages";
pub const CKD_STAGES_3_5: &str = "chronic_kidney_disease_codes_all_stages_3_5";
pub const SEV_MENTAL_ILLNESS: &str = "sev_mental_ill_codes";
pub const LEARNING_DISABILITY: &str = "learning_disability_codes";
pub const CHRONIC_NEURO: &str = "chronic_neuro_dis_inc_sig_learn_dis_codes";
pub const STROKE: &str = "stroke_codes";
pub const ASPLENIA: &str = "asplenia_codes";
pub const CHRONIC_LIVER_DISEASE: &str = "chronic_liver_disease_codes";
pub const CHRONIC_RESPIRATORY_DISEASE: &str = "chronic_respiratory_disease_codes";
pub const IMMUNOSUPPRESSION_DIAGNOSIS: &str = "immunosuppression_diagnosis_codes";
pub const IMMUNOSUPPRESSION_MEDICATION: &str = "immunosuppression_medication_codes";
pub const FLU_MEDICATION: &str = "flu_med_codes";
pub const FLU_CLINICAL_GIVEN: &str = "flu_clinical_given_codes";
pub const FLU_CLINICAL_NOT_GIVEN: &str = "flu_clinical_not_given_codes";
pub const COVID_SECONDARY_CARE: &str = "covid_codes";
pub const COVID_PRIMARY_CARE_CODE: &str = "covid_primary_care_code";
pub const COVID_PRIMARY_CARE_POSITIVE_TEST: &str = "covid_primary_care_positive_test";
pub const COVID_PRIMARY_CARE_SEQUELAE: &str = "covid_primary_care_sequelae";
/// Union of the three primary care COVID lists
pub const PRIOR_COVID: &str = "prior_covid_codes";
pub const SHIELDING: &str = "shielding_codes";
pub const NON_SHIELDING: &str = "nonshield_codes";
pub const HIGH_RISK: &str = "high_risk_codes";
pub const NOT_HIGH_RISK: &str = "not_high_risk_codes";
/// Any shielding risk level
pub const ANY_RISK: &str = "any_risk_codes";
pub const HOUSEHOLD_IMMUNODEFICIENT: &str = "hhld_imdef_codes";
pub const CARE_HOME: &str = "nursing_residential_care_codes";
pub const COVID_VACCINE_PRODUCTS: &str = "covid_vaccine_products";

fn source(name: &str, path: &str, system: CodingSystem, column: &str) -> SourceEntry {
    SourceEntry {
        name: name.to_string(),
        source: CodelistSource::new(path, system, column),
    }
}

fn snomed(name: &str, path: &str) -> SourceEntry {
    source(name, path, CodingSystem::Snomed, "code")
}

fn ctv3(name: &str, path: &str, column: &str) -> SourceEntry {
    source(name, path, CodingSystem::Ctv3, column)
}

fn categorised(mut entry: SourceEntry, column: &str) -> SourceEntry {
    entry.source = entry.source.with_category_column(column);
    entry
}

/// Manifest of every codelist the study reads
pub fn study_manifest() -> CodelistManifest {
    let sources = vec![
        categorised(
            snomed(ETHNICITY, "primis-covid19-vacc-uptake-eth2001.csv"),
            "grouping_16_id",
        ),
        snomed(ETHNICITY_OTHER, "primis-covid19-vacc-uptake-non_eth2001.csv"),
        snomed(ETHNICITY_NOT_GIVEN, "primis-covid19-vacc-uptake-eth_notgiptref.csv"),
        snomed(ETHNICITY_NOT_STATED, "primis-covid19-vacc-uptake-eth_notstated.csv"),
        snomed(ETHNICITY_NO_RECORD, "primis-covid19-vacc-uptake-eth_norecord.csv"),
        categorised(
            ctv3(CLEAR_SMOKING, "opensafely-smoking-clear.csv", "CTV3Code"),
            "Category",
        ),
        snomed(BMI, "primis-covid19-vacc-uptake-bmi.csv"),
        snomed(BMI_STAGE, "primis-covid19-vacc-uptake-bmi_stage.csv"),
        snomed(SEV_OBESITY, "primis-covid19-vacc-uptake-sev_obesity.csv"),
        snomed(CHRONIC_HEART_DISEASE, "primis-covid19-vacc-uptake-chd_cov.csv"),
        snomed(DIABETES, "primis-covid19-vacc-uptake-diab.csv"),
        snomed(CKD_DIAGNOSTIC, "primis-covid19-vacc-uptake-ckd_cov.csv"),
        snomed(CKD_ALL_STAGES, "primis-covid19-vacc-uptake-ckd15.csv"),
        snomed(CKD_STAGES_3_5, "primis-covid19-vacc-uptake-ckd35.csv"),
        snomed(SEV_MENTAL_ILLNESS, "primis-covid19-vacc-uptake-sev_mental.csv"),
        snomed(LEARNING_DISABILITY, "primis-covid19-vacc-uptake-learndis.csv"),
        snomed(CHRONIC_NEURO, "primis-covid19-vacc-uptake-cns_cov.csv"),
        ctv3(STROKE, "opensafely-stroke-updated.csv", "CTV3ID"),
        snomed(ASPLENIA, "primis-covid19-vacc-uptake-spln_cov.csv"),
        snomed(CHRONIC_LIVER_DISEASE, "primis-covid19-vacc-uptake-cld.csv"),
        snomed(CHRONIC_RESPIRATORY_DISEASE, "primis-covid19-vacc-uptake-resp_cov.csv"),
        snomed(IMMUNOSUPPRESSION_DIAGNOSIS, "primis-covid19-vacc-uptake-immdx_cov.csv"),
        snomed(IMMUNOSUPPRESSION_MEDICATION, "primis-covid19-vacc-uptake-immrx.csv"),
        source(
            FLU_MEDICATION,
            "opensafely-influenza-vaccination.csv",
            CodingSystem::Snomed,
            "snomed_id",
        ),
        ctv3(
            FLU_CLINICAL_GIVEN,
            "opensafely-influenza-vaccination-clinical-codes-given.csv",
            "CTV3ID",
        ),
        ctv3(
            FLU_CLINICAL_NOT_GIVEN,
            "opensafely-influenza-vaccination-clinical-codes-not-given.csv",
            "CTV3ID",
        ),
        source(
            COVID_SECONDARY_CARE,
            "opensafely-covid-identification.csv",
            CodingSystem::Icd10,
            "icd10_code",
        ),
        ctv3(
            COVID_PRIMARY_CARE_CODE,
            "opensafely-covid-identification-in-primary-care-probable-covid-clinical-code.csv",
            "CTV3ID",
        ),
        ctv3(
            COVID_PRIMARY_CARE_POSITIVE_TEST,
            "opensafely-covid-identification-in-primary-care-probable-covid-positive-test.csv",
            "CTV3ID",
        ),
        ctv3(
            COVID_PRIMARY_CARE_SEQUELAE,
            "opensafely-covid-identification-in-primary-care-probable-covid-sequelae.csv",
            "CTV3ID",
        ),
        snomed(SHIELDING, "primis-covid19-vacc-uptake-shield.csv"),
        snomed(NON_SHIELDING, "primis-covid19-vacc-uptake-nonshield.csv"),
        snomed(HOUSEHOLD_IMMUNODEFICIENT, "primis-covid19-vacc-uptake-hhld_imdef.csv"),
        snomed(CARE_HOME, "primis-covid19-vacc-uptake-longres.csv"),
        source(
            COVID_VACCINE_PRODUCTS,
            "opensafely-covid-19-vaccine-products.csv",
            CodingSystem::Dmd,
            "dmd_id",
        ),
    ];

    let derived = vec![
        DerivedCodelist::Filter {
            name: EVER_SMOKED.to_string(),
            from: CLEAR_SMOKING.to_string(),
            categories: vec!["S".to_string(), "E".to_string()],
        },
        DerivedCodelist::Combine {
            name: PRIOR_COVID.to_string(),
            from: vec![
                COVID_PRIMARY_CARE_CODE.to_string(),
                COVID_PRIMARY_CARE_POSITIVE_TEST.to_string(),
                COVID_PRIMARY_CARE_SEQUELAE.to_string(),
            ],
            on_conflict: ConflictPolicy::Reject,
        },
        DerivedCodelist::Alias {
            name: HIGH_RISK.to_string(),
            of: SHIELDING.to_string(),
        },
        DerivedCodelist::Alias {
            name: NOT_HIGH_RISK.to_string(),
            of: NON_SHIELDING.to_string(),
        },
        DerivedCodelist::Combine {
            name: ANY_RISK.to_string(),
            from: vec![HIGH_RISK.to_string(), NOT_HIGH_RISK.to_string()],
            on_conflict: ConflictPolicy::Reject,
        },
    ];

    CodelistManifest { sources, derived }
}
