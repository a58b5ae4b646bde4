//! Extraction benchmarks using divan
//!
//! Compiles both study variants and evaluates batches of synthetic patients
//! against in-memory codelists.

use chrono::{Days, NaiveDate};
use cohort_codelist::{Code, Codelist, CodelistRegistry, CodingSystem};
use cohort_eval::{CohortEngine, compile};
use cohort_model::{Address, CodedEvent, PatientRecord, Registration, Sex, VaccinationRecord};
use cohort_study::codelists::{CLEAR_SMOKING, ETHNICITY, SHIELDING};
use cohort_study::{StudyVariant, VaccineUptakeStudy, study_manifest};

fn main() {
    divan::main();
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Every manifest list with a few synthetic codes each
fn registry() -> CodelistRegistry {
    let manifest = study_manifest();
    let mut builder = CodelistRegistry::builder();
    for (index, entry) in manifest.sources.iter().enumerate() {
        let system = entry.source.system.clone();
        let codelist = match entry.name.as_str() {
            ETHNICITY => Codelist::from_entries(
                ETHNICITY,
                (1..=16).map(|group| (Code::new(system.clone(), format!("eth{group}")), Some(group.to_string()))),
            ),
            CLEAR_SMOKING => Codelist::from_entries(
                CLEAR_SMOKING,
                ["S", "E", "N"]
                    .into_iter()
                    .map(|category| (Code::new(system.clone(), format!("smk{category}")), Some(category.to_string()))),
            ),
            name => Codelist::from_codes(name, system, (0..5).map(|n| format!("L{index}C{n}"))),
        };
        builder.insert(codelist.unwrap()).unwrap();
    }
    for derived in &manifest.derived {
        derived.apply(&mut builder).unwrap();
    }
    builder.build()
}

/// Deterministic patient histories touching most lists
fn patients(count: u64) -> Vec<PatientRecord> {
    let sources = study_manifest().sources;
    (0..count)
        .map(|id| {
            let born = ymd(1925 + (id % 70) as i32, 1 + (id % 12) as u32, 1 + (id % 28) as u32);
            let mut patient = PatientRecord::new(id)
                .born(born)
                .with_sex(if id % 2 == 0 { Sex::Female } else { Sex::Male })
                .with_registration(Registration {
                    practice_pseudo_id: (id % 50) as i64,
                    start_date: ymd(1995 + (id % 27) as i32, 1, 1),
                    end_date: None,
                    nuts1_region_name: Some("London".to_string()),
                    stp_code: Some("E54000027".to_string()),
                })
                .with_address(Address {
                    start_date: ymd(2005, 1, 1),
                    end_date: None,
                    imd_rank: Some((id as i64 * 7919) % 32_844),
                    rural_urban: Some(1 + (id % 8) as i64),
                });

            for n in 0..20u64 {
                let index = ((id + n * 13) % sources.len() as u64) as usize;
                let entry = &sources[index];
                let date = ymd(2012, 1, 1) + Days::new((id * 37 + n * 101) % 3400);
                let code = match entry.name.as_str() {
                    ETHNICITY => format!("eth{}", 1 + (id + n) % 16),
                    CLEAR_SMOKING => format!("smk{}", ["S", "E", "N"][((id + n) % 3) as usize]),
                    _ => format!("L{index}C{}", n % 5),
                };
                let event = CodedEvent::new(entry.source.system.clone(), code, date);
                patient = if n % 4 == 0 {
                    patient.with_medication(event)
                } else {
                    patient.with_clinical_event(event)
                };
            }
            if id % 3 == 0 {
                patient = patient.with_clinical_event(CodedEvent::new(
                    CodingSystem::Snomed,
                    format!("L{}C0", sources.iter().position(|s| s.name == SHIELDING).unwrap_or(0)),
                    ymd(2021, 2, 20),
                ));
            }
            if id % 5 != 0 {
                patient = patient.with_vaccination(VaccinationRecord::for_disease(
                    "SARS-2 CORONAVIRUS",
                    ymd(2020, 12, 8) + Days::new(id % 90),
                ));
            }
            patient
        })
        .collect()
}

mod compile_study {
    use super::*;

    #[divan::bench]
    fn main_study(bencher: divan::Bencher) {
        let registry = registry();
        let definition = VaccineUptakeStudy::new(StudyVariant::Main).definition();
        bencher.bench_local(|| compile(&definition, &registry).unwrap());
    }

    #[divan::bench]
    fn flow_chart(bencher: divan::Bencher) {
        let registry = registry();
        let definition = VaccineUptakeStudy::new(StudyVariant::FlowChart).definition();
        bencher.bench_local(|| compile(&definition, &registry).unwrap());
    }
}

mod evaluate {
    use super::*;

    fn engine(variant: StudyVariant) -> CohortEngine {
        let definition = VaccineUptakeStudy::new(variant).definition();
        CohortEngine::new(compile(&definition, &registry()).unwrap())
    }

    #[divan::bench]
    fn single_patient(bencher: divan::Bencher) {
        let engine = engine(StudyVariant::Main);
        let patient = patients(1).remove(0);
        bencher.bench_local(|| engine.evaluate_patient(&patient).unwrap().included);
    }

    #[divan::bench(args = [100, 1_000, 10_000])]
    fn main_batch(bencher: divan::Bencher, count: u64) {
        let engine = engine(StudyVariant::Main);
        let patients = patients(count);
        bencher.bench_local(|| engine.evaluate_batch(&patients).summary);
    }

    #[divan::bench(args = [1, 4])]
    fn main_batch_threads(bencher: divan::Bencher, threads: usize) {
        let engine = engine(StudyVariant::Main);
        let patients = patients(5_000);
        bencher.bench_local(|| engine.evaluate_batch_with_threads(&patients, threads).unwrap().summary);
    }

    #[divan::bench]
    fn flow_chart_batch(bencher: divan::Bencher) {
        let engine = engine(StudyVariant::FlowChart);
        let patients = patients(1_000);
        bencher.bench_local(|| engine.evaluate_batch(&patients).summary);
    }
}
