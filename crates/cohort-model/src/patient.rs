//! Patient records and point-in-time queries

use crate::event::{CodedEvent, VaccinationRecord};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudonymised patient identifier
pub type PatientId = u64;

/// Recorded sex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "I")]
    Intersex,
    #[serde(rename = "U")]
    Unknown,
}

impl Sex {
    /// Output label
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Intersex => "I",
            Self::Unknown => "U",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A period of registration with one general practice
///
/// The period is `[start_date, end_date)`; an open registration has no end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub practice_pseudo_id: i64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub nuts1_region_name: Option<String>,
    #[serde(default)]
    pub stp_code: Option<String>,
}

impl Registration {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end| end > date)
    }

    /// True if this registration alone covers `[start, end]`
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= start && self.end_date.is_none_or(|e| e > end)
    }
}

/// A period at one residential address
///
/// The period is `[start_date, end_date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Index of multiple deprivation rank of the address area
    #[serde(default)]
    pub imd_rank: Option<i64>,
    /// Rural/urban classification (1-8)
    #[serde(default)]
    pub rural_urban: Option<i64>,
}

impl Address {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end| end > date)
    }
}

/// Everything known about one patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: PatientId,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub date_of_death: Option<NaiveDate>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub clinical_events: Vec<CodedEvent>,
    #[serde(default)]
    pub medications: Vec<CodedEvent>,
    #[serde(default)]
    pub vaccinations: Vec<VaccinationRecord>,
}

impl PatientRecord {
    /// An empty record
    pub fn new(patient_id: PatientId) -> Self {
        Self {
            patient_id,
            date_of_birth: None,
            sex: None,
            date_of_death: None,
            registrations: Vec::new(),
            addresses: Vec::new(),
            clinical_events: Vec::new(),
            medications: Vec::new(),
            vaccinations: Vec::new(),
        }
    }

    pub fn born(mut self, date_of_birth: NaiveDate) -> Self {
        self.date_of_birth = Some(date_of_birth);
        self
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    pub fn died(mut self, date_of_death: NaiveDate) -> Self {
        self.date_of_death = Some(date_of_death);
        self
    }

    pub fn with_registration(mut self, registration: Registration) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_clinical_event(mut self, event: CodedEvent) -> Self {
        self.clinical_events.push(event);
        self
    }

    pub fn with_medication(mut self, event: CodedEvent) -> Self {
        self.medications.push(event);
        self
    }

    pub fn with_vaccination(mut self, vaccination: VaccinationRecord) -> Self {
        self.vaccinations.push(vaccination);
        self
    }

    /// Age in whole years on `date`; `None` without a birth date or before birth
    pub fn age_on(&self, date: NaiveDate) -> Option<i64> {
        let dob = self.date_of_birth?;
        if date < dob {
            return None;
        }
        let mut age = i64::from(date.year() - dob.year());
        if (date.month(), date.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        Some(age)
    }

    pub fn is_registered_on(&self, date: NaiveDate) -> bool {
        self.registrations.iter().any(|r| r.is_active_on(date))
    }

    /// True if one registration spans the whole interval
    pub fn is_continuously_registered(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.registrations.iter().any(|r| r.covers(start, end))
    }

    /// The registration in force on `date`
    ///
    /// With overlapping registrations the most recently started one wins;
    /// equal start dates resolve to the last listed.
    pub fn registration_on(&self, date: NaiveDate) -> Option<&Registration> {
        self.registrations
            .iter()
            .filter(|r| r.is_active_on(date))
            .max_by_key(|r| r.start_date)
    }

    /// The address in force on `date`, chosen like [`Self::registration_on`]
    pub fn address_on(&self, date: NaiveDate) -> Option<&Address> {
        self.addresses
            .iter()
            .filter(|a| a.is_active_on(date))
            .max_by_key(|a| a.start_date)
    }

    /// End of the last registration, if every registration has ended
    pub fn date_deregistered(&self) -> Option<NaiveDate> {
        if self.registrations.iter().any(|r| r.end_date.is_none()) {
            return None;
        }
        self.registrations.iter().filter_map(|r| r.end_date).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn registration(id: i64, start: NaiveDate, end: Option<NaiveDate>) -> Registration {
        Registration {
            practice_pseudo_id: id,
            start_date: start,
            end_date: end,
            nuts1_region_name: Some("London".to_string()),
            stp_code: Some("E54000027".to_string()),
        }
    }

    #[rstest]
    #[case(ymd(1950, 3, 31), ymd(2020, 3, 31), Some(70))]
    #[case(ymd(1950, 4, 1), ymd(2020, 3, 31), Some(69))]
    #[case(ymd(1952, 2, 29), ymd(2021, 2, 28), Some(68))]
    #[case(ymd(2021, 1, 1), ymd(2020, 3, 31), None)]
    fn test_age_on(#[case] dob: NaiveDate, #[case] on: NaiveDate, #[case] expected: Option<i64>) {
        let patient = PatientRecord::new(1).born(dob);
        assert_eq!(patient.age_on(on), expected);
    }

    #[test]
    fn test_registration_end_is_exclusive() {
        let patient = PatientRecord::new(1).with_registration(registration(
            10,
            ymd(2015, 1, 1),
            Some(ymd(2020, 12, 7)),
        ));
        assert!(patient.is_registered_on(ymd(2020, 12, 6)));
        assert!(!patient.is_registered_on(ymd(2020, 12, 7)));
    }

    #[test]
    fn test_continuous_registration_needs_a_single_practice() {
        let patient = PatientRecord::new(1)
            .with_registration(registration(10, ymd(2015, 1, 1), Some(ymd(2020, 6, 1))))
            .with_registration(registration(11, ymd(2020, 6, 1), None));

        assert!(patient.is_registered_on(ymd(2020, 12, 7)));
        assert!(!patient.is_continuously_registered(ymd(2019, 12, 7), ymd(2020, 12, 7)));
        assert!(patient.is_continuously_registered(ymd(2020, 7, 1), ymd(2020, 12, 7)));
    }

    #[test]
    fn test_latest_started_registration_wins() {
        let patient = PatientRecord::new(1)
            .with_registration(registration(10, ymd(2010, 1, 1), None))
            .with_registration(registration(11, ymd(2018, 1, 1), None));
        let practice = patient.registration_on(ymd(2020, 12, 7)).unwrap();
        assert_eq!(practice.practice_pseudo_id, 11);
    }

    #[test]
    fn test_date_deregistered() {
        let ended = PatientRecord::new(1)
            .with_registration(registration(10, ymd(2010, 1, 1), Some(ymd(2019, 5, 1))))
            .with_registration(registration(11, ymd(2019, 5, 1), Some(ymd(2021, 1, 20))));
        assert_eq!(ended.date_deregistered(), Some(ymd(2021, 1, 20)));

        let open = ended.with_registration(registration(12, ymd(2021, 2, 1), None));
        assert_eq!(open.date_deregistered(), None);
        assert_eq!(PatientRecord::new(2).date_deregistered(), None);
    }
}
