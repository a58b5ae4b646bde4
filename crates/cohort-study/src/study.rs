//! The vaccine uptake study definition
//!
//! [`VaccineUptakeStudy`] builds the [`StudyDefinition`] for either variant
//! from a handful of parameters:
//!
//! - [`StudyVariant::Main`]: adults aged `min_age` and over who were alive,
//!   registered for at least a year and not in a care home on the start
//!   date; vaccination outcome, censoring dates, demographics, clinical risk
//!   groups, geography and shielding status.
//! - [`StudyVariant::FlowChart`]: every patient, with only the variables
//!   needed to count each inclusion and exclusion step.
//!
//! The study start date is the index date. Nullable variables in the
//! population are guarded with `IS NULL` so that inclusion is never unknown.

use crate::codelists::{
    ANY_RISK, ASPLENIA, BMI, BMI_STAGE, CARE_HOME, CHRONIC_HEART_DISEASE, CHRONIC_LIVER_DISEASE,
    CHRONIC_NEURO, CHRONIC_RESPIRATORY_DISEASE, CKD_ALL_STAGES, CKD_DIAGNOSTIC, CKD_STAGES_3_5,
    CLEAR_SMOKING, COVID_VACCINE_PRODUCTS, DIABETES, ETHNICITY, ETHNICITY_NO_RECORD,
    ETHNICITY_NOT_GIVEN, ETHNICITY_NOT_STATED, ETHNICITY_OTHER, EVER_SMOKED, FLU_CLINICAL_GIVEN,
    FLU_CLINICAL_NOT_GIVEN, FLU_MEDICATION, HIGH_RISK, IMMUNOSUPPRESSION_DIAGNOSIS,
    IMMUNOSUPPRESSION_MEDICATION, LEARNING_DISABILITY, NOT_HIGH_RISK, PRIOR_COVID, SEV_MENTAL_ILLNESS,
    SEV_OBESITY,
};
use chrono::NaiveDate;
use cohort_eval::{
    AddressAttribute, CategorisationRule, DateWindow, EventQuery, PracticeAttribute, Returning,
    StudyDefinition, VaccinationQuery, VariableKind, VariableSpec,
};
use cohort_expr::{DateExpr, Expr, and, lit, not, or, var};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid study date"),
    }
}

pub const DEFAULT_START_DATE: NaiveDate = ymd(2020, 12, 7);
pub const DEFAULT_END_DATE: NaiveDate = ymd(2021, 3, 17);
pub const DEFAULT_AGE_REFERENCE_DATE: NaiveDate = ymd(2020, 3, 31);
pub const DEFAULT_MIN_AGE: i64 = 70;

const IMMUNOSUPPRESSION_LOOKBACK_START: NaiveDate = ymd(2020, 7, 1);
const FLU_SEASONS_START: NaiveDate = ymd(2015, 4, 1);
const FLU_SEASONS_END: NaiveDate = ymd(2020, 3, 31);
const SHIELDING_EXPANDED: NaiveDate = ymd(2021, 2, 15);
const BEFORE_SHIELDING_EXPANDED: NaiveDate = ymd(2021, 2, 14);

/// Highest index of multiple deprivation rank
const IMD_MAX_RANK: i64 = 32_844;

const COVID_TARGET_DISEASE: &str = "SARS-2 CORONAVIRUS";
const FLU_TARGET_DISEASE: &str = "INFLUENZA";

/// Which extract to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyVariant {
    #[default]
    Main,
    FlowChart,
}

impl fmt::Display for StudyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Main => "main",
            Self::FlowChart => "flow_chart",
        })
    }
}

/// Parameters of the vaccine uptake study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccineUptakeStudy {
    pub variant: StudyVariant,
    /// Index date of the study
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub min_age: i64,
    /// Date age is measured on
    pub age_reference_date: NaiveDate,
}

impl Default for VaccineUptakeStudy {
    fn default() -> Self {
        Self::new(StudyVariant::Main)
    }
}

impl VaccineUptakeStudy {
    pub fn new(variant: StudyVariant) -> Self {
        Self {
            variant,
            start_date: DEFAULT_START_DATE,
            end_date: DEFAULT_END_DATE,
            min_age: DEFAULT_MIN_AGE,
            age_reference_date: DEFAULT_AGE_REFERENCE_DATE,
        }
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = date;
        self
    }

    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = date;
        self
    }

    pub fn with_min_age(mut self, min_age: i64) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn with_age_reference_date(mut self, date: NaiveDate) -> Self {
        self.age_reference_date = date;
        self
    }

    /// Build the study definition for the configured variant
    pub fn definition(&self) -> StudyDefinition {
        match self.variant {
            StudyVariant::Main => self.main(),
            StudyVariant::FlowChart => self.flow_chart(),
        }
    }

    fn main(&self) -> StudyDefinition {
        let mut study = StudyDefinition::new(self.start_date, self.end_date).with_population(and([
            not(var("has_died")),
            var("registered"),
            known("age").and(var("age").ge(self.min_age)),
            var("has_follow_up_previous_year"),
            not(var("nursing_residential_care")),
            known("sex").and(var("sex").eq("M").or(var("sex").eq("F"))),
            var("imd").gt(0),
            known("region"),
            known("rural_urban").and(var("rural_urban").gt(0)),
            known("stp"),
        ]));

        for variable in self.inclusion_variables() {
            study.add_variable(variable.hidden());
        }
        study.add_variable(covid_vaccination());
        study.add_variable(death_date());
        study.add_variable(dereg_date());
        study.add_variable(self.age());
        study.add_variable(VariableSpec::new("sex", VariableKind::Sex));
        for variable in ethnicity()
            .into_iter()
            .chain(clinical_risk_groups())
            .chain(self.geography())
            .chain(smoking_status())
            .chain(flu_vaccine())
            .chain([prior_covid()])
            .chain(shielding())
        {
            study.add_variable(variable);
        }
        study
    }

    fn flow_chart(&self) -> StudyDefinition {
        let mut study = StudyDefinition::new(self.start_date, self.end_date).with_population(lit(true));
        study.add_variable(covid_vaccination());
        let [has_died, registered_at_start, registered, follow_up, care_home] = self.inclusion_variables();
        study
            .add_variable(has_died)
            .add_variable(registered_at_start.hidden())
            .add_variable(registered)
            .add_variable(self.age())
            .add_variable(follow_up)
            .add_variable(care_home)
            .add_variable(VariableSpec::new("sex", VariableKind::Sex))
            .add_variable(imd_rank().hidden())
            .add_variable(imd())
            .add_variable(death_date());
        study
    }

    /// Variables the main population is defined on
    fn inclusion_variables(&self) -> [VariableSpec; 5] {
        [
            VariableSpec::new(
                "has_died",
                VariableKind::DiedFromAnyCause {
                    window: DateWindow::on_or_before(DateExpr::index_date()),
                    returning: Returning::BinaryFlag,
                },
            ),
            VariableSpec::new(
                "registered_at_start",
                VariableKind::RegisteredAsOf {
                    date: DateExpr::literal(self.start_date),
                },
            ),
            VariableSpec::new(
                "registered",
                VariableKind::Satisfying {
                    predicate: var("registered_at_start"),
                },
            ),
            VariableSpec::new(
                "has_follow_up_previous_year",
                VariableKind::RegisteredWithOnePracticeBetween {
                    start: DateExpr::index_date().minus_years(1),
                    end: DateExpr::index_date(),
                },
            ),
            VariableSpec::new(
                "nursing_residential_care",
                EventQuery::clinical(CARE_HOME)
                    .on_or_before(DateExpr::index_date())
                    .find_last_match_in_period(),
            ),
        ]
    }

    fn age(&self) -> VariableSpec {
        VariableSpec::new(
            "age",
            VariableKind::AgeAsOf {
                date: DateExpr::literal(self.age_reference_date),
            },
        )
    }

    fn geography(&self) -> Vec<VariableSpec> {
        let practice_as_of = |name: &str, date: DateExpr, attribute| {
            VariableSpec::new(name, VariableKind::PracticeAsOf { date, attribute })
        };
        vec![
            practice_as_of(
                "practice_id_at_start",
                DateExpr::literal(self.start_date),
                PracticeAttribute::PseudoId,
            ),
            practice_as_of(
                "practice_id_at_end",
                DateExpr::literal(self.end_date),
                PracticeAttribute::PseudoId,
            ),
            practice_as_of(
                "practice_id_at_death",
                DateExpr::variable("death_date"),
                PracticeAttribute::PseudoId,
            ),
            practice_as_of(
                "practice_id_at_dereg",
                DateExpr::variable("dereg_date"),
                PracticeAttribute::PseudoId,
            ),
            imd_rank().hidden(),
            imd(),
            practice_as_of("region", DateExpr::index_date(), PracticeAttribute::Nuts1RegionName),
            practice_as_of("stp", DateExpr::index_date(), PracticeAttribute::StpCode),
            VariableSpec::new(
                "rural_urban",
                VariableKind::AddressAsOf {
                    date: DateExpr::index_date(),
                    attribute: AddressAttribute::RuralUrbanClassification,
                    round_to_nearest: None,
                },
            ),
        ]
    }
}

/// True when the variable has a value
fn known(name: &str) -> Expr {
    not(var(name).is_null())
}

/// Event query on or before the index date
fn before_index(codelist: &str) -> EventQuery {
    EventQuery::clinical(codelist).on_or_before(DateExpr::index_date())
}

fn covid_vaccination() -> VariableSpec {
    VariableSpec::new(
        "covid_vax_1_date",
        VaccinationQuery::new()
            .target_disease(COVID_TARGET_DISEASE)
            .product_codes(COVID_VACCINE_PRODUCTS)
            .window(DateWindow::on_or_after(DateExpr::index_date().plus_days(1)))
            .find_first_match_in_period()
            .returning(Returning::Date),
    )
}

fn death_date() -> VariableSpec {
    VariableSpec::new(
        "death_date",
        VariableKind::DiedFromAnyCause {
            window: DateWindow::on_or_after(DateExpr::index_date().plus_days(1)),
            returning: Returning::Date,
        },
    )
}

fn dereg_date() -> VariableSpec {
    VariableSpec::new(
        "dereg_date",
        VariableKind::DateDeregistered {
            window: DateWindow::on_or_after(DateExpr::index_date().plus_days(1)),
        },
    )
}

fn ethnicity() -> Vec<VariableSpec> {
    let last_date = |name: &str, codelist: &str| {
        VariableSpec::new(
            name,
            before_index(codelist)
                .find_last_match_in_period()
                .returning(Returning::Date),
        )
    };
    vec![
        VariableSpec::new(
            "ethnicity",
            before_index(ETHNICITY)
                .find_last_match_in_period()
                .returning(Returning::Category),
        ),
        last_date("ethnicity_other", ETHNICITY_OTHER),
        last_date("ethnicity_not_given", ETHNICITY_NOT_GIVEN),
        last_date("ethnicity_not_stated", ETHNICITY_NOT_STATED),
        last_date("ethnicity_no_record", ETHNICITY_NO_RECORD),
    ]
}

fn clinical_risk_groups() -> Vec<VariableSpec> {
    let flag = |name: &str, codelist: &str| VariableSpec::new(name, before_index(codelist));
    let first_date = |name: &str, codelist: &str| {
        VariableSpec::new(
            name,
            before_index(codelist)
                .find_first_match_in_period()
                .returning(Returning::Date),
        )
    };
    let last_date = |name: &str, codelist: &str| {
        VariableSpec::new(
            name,
            before_index(codelist)
                .find_last_match_in_period()
                .returning(Returning::Date),
        )
    };

    vec![
        VariableSpec::new(
            "bmi",
            before_index(BMI)
                .ignore_missing_values()
                .find_last_match_in_period()
                .returning(Returning::NumericValue),
        ),
        last_date("bmi_stage_date", BMI_STAGE),
        VariableSpec::new(
            "sev_obesity",
            EventQuery::clinical(SEV_OBESITY)
                .between(DateExpr::variable("bmi_stage_date"), DateExpr::index_date())
                .ignore_missing_values()
                .find_last_match_in_period()
                .returning(Returning::Date),
        ),
        flag("chronic_heart_disease", CHRONIC_HEART_DISEASE),
        VariableSpec::new("diabetes", before_index(DIABETES).find_last_match_in_period()),
        flag("chronic_kidney_disease_diagnostic", CKD_DIAGNOSTIC),
        flag("chronic_kidney_disease_all_stages", CKD_ALL_STAGES),
        flag("chronic_kidney_disease_all_stages_1_5", CKD_STAGES_3_5),
        last_date("sev_mental_ill", SEV_MENTAL_ILLNESS),
        last_date("learning_disability", LEARNING_DISABILITY),
        first_date("chronic_neuro_dis_inc_sig_learn_dis", CHRONIC_NEURO),
        flag("asplenia", ASPLENIA),
        flag("chronic_liver_disease", CHRONIC_LIVER_DISEASE),
        first_date("chronis_respiratory_disease", CHRONIC_RESPIRATORY_DISEASE),
        last_date("immunosuppression_diagnosis", IMMUNOSUPPRESSION_DIAGNOSIS),
        VariableSpec::new(
            "immunosuppression_medication",
            EventQuery::medications(IMMUNOSUPPRESSION_MEDICATION)
                .between(IMMUNOSUPPRESSION_LOOKBACK_START, DateExpr::index_date())
                .find_last_match_in_period()
                .returning(Returning::Date),
        ),
    ]
}

fn imd_rank() -> VariableSpec {
    VariableSpec::new(
        "index_of_multiple_deprivation",
        VariableKind::AddressAsOf {
            date: DateExpr::index_date(),
            attribute: AddressAttribute::IndexOfMultipleDeprivation,
            round_to_nearest: Some(100),
        },
    )
}

/// Deprivation quintile, 1 (most deprived) to 5; 0 when unknown
fn imd() -> VariableSpec {
    let rank = || var("index_of_multiple_deprivation");
    let fifth = |k: i64| Decimal::from(IMD_MAX_RANK * k) / Decimal::from(5);
    let mut rule = CategorisationRule::new().when(1, rank().ge(1).and(rank().lt(fifth(1))));
    for quintile in 2..=4 {
        rule = rule.when(
            quintile,
            rank().ge(fifth(quintile - 1)).and(rank().lt(fifth(quintile))),
        );
    }
    VariableSpec::new("imd", rule.when(5, rank().ge(fifth(4))).otherwise(0))
}

/// Smoking status from the most recent clear smoking code
///
/// A never-smoker code after any current or ex smoker code counts as ex.
fn smoking_status() -> Vec<VariableSpec> {
    let recent = || var("most_recent_smoking_code");
    vec![
        VariableSpec::new(
            "most_recent_smoking_code",
            before_index(CLEAR_SMOKING)
                .find_last_match_in_period()
                .returning(Returning::Category),
        )
        .hidden(),
        VariableSpec::new("ever_smoked", before_index(EVER_SMOKED)).hidden(),
        VariableSpec::new(
            "smoking_status",
            CategorisationRule::new()
                .when("S", recent().eq("S"))
                .when("E", or([recent().eq("E"), recent().eq("N").and(var("ever_smoked"))]))
                .when("N", recent().eq("N").and(not(var("ever_smoked"))))
                .otherwise("M"),
        ),
    ]
}

/// Any flu vaccination in the five seasons before the pandemic
fn flu_vaccine() -> Vec<VariableSpec> {
    let seasons = DateWindow::between(FLU_SEASONS_START, FLU_SEASONS_END);
    vec![
        VariableSpec::new(
            "flu_vaccine_tpp_table",
            VaccinationQuery::new()
                .target_disease(FLU_TARGET_DISEASE)
                .window(seasons.clone()),
        )
        .hidden(),
        VariableSpec::new(
            "flu_vaccine_med",
            EventQuery::medications(FLU_MEDICATION).window(seasons.clone()),
        )
        .hidden(),
        VariableSpec::new(
            "flu_vaccine_clinical",
            EventQuery::clinical(FLU_CLINICAL_GIVEN)
                .window(seasons)
                .ignore_days_where_these_codes_occur(FLU_CLINICAL_NOT_GIVEN),
        )
        .hidden(),
        VariableSpec::new(
            "flu_vaccine",
            VariableKind::Satisfying {
                predicate: or([
                    var("flu_vaccine_tpp_table").gt(0),
                    var("flu_vaccine_med").gt(0),
                    var("flu_vaccine_clinical").gt(0),
                ]),
            },
        ),
    ]
}

fn prior_covid() -> VariableSpec {
    VariableSpec::new(
        "prior_covid_date",
        before_index(PRIOR_COVID)
            .find_first_match_in_period()
            .returning(Returning::Date),
    )
}

/// Shielding flags
///
/// A patient is shielded when their latest high risk code is not followed by
/// a lower risk code. The expanded group since 15 February 2021 excludes
/// anyone flagged at any level before then.
fn shielding() -> Vec<VariableSpec> {
    vec![
        VariableSpec::new(
            "severely_clinically_vulnerable",
            EventQuery::clinical(HIGH_RISK).find_last_match_in_period(),
        )
        .hidden(),
        VariableSpec::new(
            "date_severely_clinically_vulnerable",
            VariableKind::DateOf {
                variable: "severely_clinically_vulnerable".to_string(),
            },
        )
        .hidden(),
        VariableSpec::new(
            "less_vulnerable",
            EventQuery::clinical(NOT_HIGH_RISK)
                .on_or_after(DateExpr::variable("date_severely_clinically_vulnerable")),
        )
        .hidden(),
        VariableSpec::new(
            "shielded",
            VariableKind::Satisfying {
                predicate: var("severely_clinically_vulnerable").and(not(var("less_vulnerable"))),
            },
        ),
        VariableSpec::new(
            "severely_clinically_vulnerable_since_feb_15",
            EventQuery::clinical(HIGH_RISK)
                .on_or_after(SHIELDING_EXPANDED)
                .find_last_match_in_period(),
        )
        .hidden(),
        VariableSpec::new(
            "date_vulnerable_since_feb_15",
            VariableKind::DateOf {
                variable: "severely_clinically_vulnerable_since_feb_15".to_string(),
            },
        )
        .hidden(),
        VariableSpec::new(
            "new_shielding_status_reduced",
            EventQuery::clinical(NOT_HIGH_RISK)
                .on_or_after(DateExpr::variable("date_vulnerable_since_feb_15")),
        )
        .hidden(),
        VariableSpec::new(
            "previous_flag",
            EventQuery::clinical(ANY_RISK).on_or_before(BEFORE_SHIELDING_EXPANDED),
        )
        .hidden(),
        VariableSpec::new(
            "shielded_since_feb_15",
            VariableKind::Satisfying {
                predicate: and([
                    var("severely_clinically_vulnerable_since_feb_15"),
                    not(var("new_shielding_status_reduced")),
                    not(var("previous_flag")),
                ]),
            },
        ),
    ]
}
