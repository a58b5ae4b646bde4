//! Coded events in a patient's history

use crate::lenient;
use chrono::NaiveDate;
use cohort_codelist::{Code, CodingSystem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A coded clinical event or medication issue
///
/// Every field is read leniently so that incomplete rows survive loading.
/// An event without a valid date, code or coding system is malformed and
/// never matches a variable. An unreadable value is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedEvent {
    #[serde(default = "lenient::unknown_system", deserialize_with = "lenient::system")]
    pub system: CodingSystem,
    #[serde(default, deserialize_with = "lenient::code")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    /// Recorded numeric value (e.g. a BMI measurement)
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Decimal>,
}

impl CodedEvent {
    pub fn new(system: CodingSystem, code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            system,
            code: code.into().trim().to_string(),
            date: Some(date),
            value: None,
        }
    }

    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = Some(value);
        self
    }

    /// The (system, code) identity used for codelist membership
    pub fn to_code(&self) -> Code {
        Code::new(self.system.clone(), self.code.clone())
    }

    pub fn is_malformed(&self) -> bool {
        self.date.is_none() || self.code.is_empty() || self.system.as_str().is_empty()
    }
}

/// A vaccination administered to the patient
///
/// Either the target disease or the product code may be recorded,
/// depending on the collaborator system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    #[serde(default, deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_disease: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::product",
        skip_serializing_if = "Option::is_none"
    )]
    pub product: Option<Code>,
}

impl VaccinationRecord {
    pub fn for_disease(target_disease: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            target_disease: Some(target_disease.into()),
            product: None,
        }
    }

    pub fn for_product(product: Code, date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            target_disease: None,
            product: Some(product),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.date.is_none() || (self.target_disease.is_none() && self.product.is_none())
    }
}
