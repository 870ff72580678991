mod common;

use common::{setup, store_from};
use cptac_analytics::AnalyticsError;
use cptac_analytics::engine::{AgeGroupCount, Engine};
use serde_json::json;

#[test]
fn donors_count_by_cancer_site_two_donors() {
    let store = store_from(json!({
        "Donor": [
            { "donor_id": 1, "gender": "Male", "age": 40 },
            { "donor_id": 2, "gender": "Female", "age": 60 }
        ],
        "Diagnosis": [
            { "donor_id": 1, "disease": { "cancerSite": "Breast" } },
            { "donor_id": 2, "disease": { "cancerSite": "Breast" } }
        ]
    }));
    let engine = Engine::new(&store);
    let breast = engine.donors_count_by_cancer_site("Breast").expect("breast donors");
    assert_eq!(breast.total_donors, 2);
    assert_eq!(breast.male_donors, 1);
    assert_eq!(breast.female_donors, 1);
    assert_eq!(breast.average_age, Some(50.0));
    // no diagnosis at the site is an empty result, not a failure
    assert!(engine.donors_count_by_cancer_site("Lung").is_none());
}

#[test]
fn donors_count_by_cancer_site_matches_numeric_and_text_ids() {
    let store = setup();
    let engine = Engine::new(&store);
    // donor 3 is keyed by a JSON number, its diagnosis by a string
    let lung = engine.donors_count_by_cancer_site("Lung").expect("lung donors");
    assert_eq!(lung.total_donors, 1);
    assert_eq!(lung.female_donors, 1);
    assert_eq!(lung.male_donors, 0);
    assert_eq!(lung.average_age, Some(35.0));
    assert!(engine.donors_count_by_cancer_site("Pancreas").is_none());
}

#[test]
fn diabetes_counts() {
    let store = setup();
    let counts = Engine::new(&store).donors_with_diabetes_count();
    assert_eq!(counts.total_donors, 4);
    assert_eq!(counts.obese_donors_count, 1);
    assert_eq!(counts.overweight_donors_count, 1);
    assert_eq!(counts.diabetes_donors_count, 2);
    assert_eq!(counts.prediabetes_donors_count, 1);
}

#[test]
fn donor_projection_has_every_field() {
    let store = setup();
    let engine = Engine::new(&store);
    let profile = serde_json::to_value(engine.donor_by_id("1").expect("donor 1")).unwrap();
    assert_eq!(profile["donor_id"], json!("1"));
    assert_eq!(profile["gender"], json!("Male"));
    assert_eq!(profile["bmi"], json!(25.0));
    // false is kept, absent fields are explicit nulls
    assert_eq!(profile["obesityClassIII"], json!(false));
    assert!(profile.as_object().unwrap().contains_key("height"));
    assert_eq!(profile["height"], json!(null));
    assert_eq!(profile["maritalStatus"], json!(null));
    assert_eq!(profile.as_object().unwrap().len(), 35);
}

#[test]
fn unknown_donor_is_not_found() {
    let store = setup();
    let err = Engine::new(&store).donor_by_id("99").unwrap_err();
    assert!(matches!(err, AnalyticsError::NotFound { entity: "Donor", .. }));
    assert!(err.to_string().contains("99"));
}

#[test]
fn donors_with_condition_and_exposure() {
    let store = setup();
    let engine = Engine::new(&store);
    let breast: Vec<String> = engine
        .donors_with_condition("Breast Cancer")
        .iter()
        .map(|d| d.donor_id.to_string())
        .collect();
    assert_eq!(breast, ["1", "2"]);

    let smokers = engine.donors_with_exposure("smoking");
    let ids: Vec<String> = smokers.iter().map(|d| d.donor.donor_id.to_string()).collect();
    assert_eq!(ids, ["1", "3"]);
    assert!(smokers.iter().all(|d| d.exposure_type == "smoking"));
    // flags beyond the well-known ones are looked up as found in the record
    let sun = engine.donors_with_exposure("sunExposure");
    assert_eq!(sun.len(), 1);
    assert_eq!(sun[0].donor.donor_id.as_str(), "2");
    assert!(engine.donors_with_exposure("gardening").is_empty());

    let annotated = serde_json::to_value(&smokers[0]).unwrap();
    assert_eq!(annotated["exposureType"], json!("smoking"));
    assert_eq!(annotated["donor_id"], json!("1"));
}

#[test]
fn demographics_count_missing_numbers_as_zero() {
    let store = setup();
    let demographics = Engine::new(&store).donor_demographics();
    assert_eq!(demographics.total_donors, 4);
    assert_eq!(demographics.male_donors, 2);
    assert_eq!(demographics.female_donors, 2);
    assert_eq!(demographics.average_age, Some(33.75));
    assert_eq!(demographics.average_bmi, Some(19.25));

    let empty = store_from(json!({}));
    let demographics = Engine::new(&empty).donor_demographics();
    assert_eq!(demographics.total_donors, 0);
    assert_eq!(demographics.average_age, None);
    assert_eq!(demographics.average_bmi, None);
}

#[test]
fn demographics_leave_unstated_gender_out_of_both_counts() {
    let store = store_from(json!({
        "Donor": [
            { "donor_id": "1", "gender": "Male", "age": 50 },
            { "donor_id": "2", "gender": "Female", "age": 30 },
            { "donor_id": "3", "age": 40 },
            { "donor_id": "4", "gender": "Unknown" }
        ]
    }));
    let demographics = Engine::new(&store).donor_demographics();
    assert_eq!(demographics.total_donors, 4);
    assert_eq!(demographics.male_donors, 1);
    assert_eq!(demographics.female_donors, 1);
    assert_eq!(demographics.average_age, Some(30.0));
}

#[test]
fn age_distribution_in_first_seen_order() {
    let store = setup();
    let distribution = Engine::new(&store).age_distribution_of_diagnosed_donors();
    let expected = [("40-49", 1), ("60-69", 1), ("30-39", 1)];
    assert_eq!(distribution.len(), expected.len());
    for (AgeGroupCount { age_group, total_diagnosed_donors }, (group, count)) in distribution.iter().zip(expected) {
        assert_eq!(age_group, group);
        assert_eq!(*total_diagnosed_donors, count);
    }
}

#[test]
fn ethnicity_and_disease_prevalence() {
    let store = setup();
    let engine = Engine::new(&store);
    let asian = engine.ethnicity_and_disease_prevalence("Asian");
    assert_eq!(asian.total_donors, 2);
    assert_eq!(asian.disease_prevalence, 0.5);
    assert_eq!(asian.average_age, Some(50.0));
    // an empty disease text does not count
    let white = engine.ethnicity_and_disease_prevalence("White");
    assert_eq!(white.disease_prevalence, 0.0);
    assert_eq!(white.average_age, Some(17.5));
    let none = engine.ethnicity_and_disease_prevalence("Martian");
    assert_eq!(none.total_donors, 0);
    assert_eq!(none.disease_prevalence, 0.0);
    assert_eq!(none.average_age, None);
}

#[test]
fn gender_based_exposure_uses_first_exposure() {
    let store = setup();
    let engine = Engine::new(&store);
    let female = engine.gender_based_exposure_analysis("Female");
    assert_eq!(female.total_donors, 2);
    assert_eq!(female.smoking_percentage, 50.0);
    assert_eq!(female.drinking_percentage, 100.0);
    assert_eq!(female.average_bmi, 26.0);
    // donor 4 has no exposure record and counts as neither
    let male = engine.gender_based_exposure_analysis("Male");
    assert_eq!(male.smoking_percentage, 50.0);
    assert_eq!(male.drinking_percentage, 0.0);
    assert_eq!(male.average_bmi, 12.5);
    let other = engine.gender_based_exposure_analysis("Other");
    assert_eq!(other.total_donors, 0);
    assert_eq!(other.smoking_percentage, 0.0);
    assert_eq!(other.average_bmi, 0.0);
}

#[test]
fn diagnosis_by_ethnicity() {
    let store = setup();
    let engine = Engine::new(&store);
    let white = engine.diagnosis_by_ethnicity("White").expect("white diagnoses");
    assert_eq!(white.total_diagnoses, 2);
    assert_eq!(white.male_diagnoses, 1);
    assert_eq!(white.female_diagnoses, 1);
    assert_eq!(white.average_age_at_diagnosis, Some(17.5));
    assert!(engine.diagnosis_by_ethnicity("Martian").is_none());
}

#[test]
fn disease_distribution_by_gender() {
    let store = setup();
    let rows = Engine::new(&store).disease_distribution_by_gender();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].gender, "Male");
    assert_eq!(rows[0].total_cases, 2);
    assert_eq!(rows[0].common_cancer_sites, ["Breast", "Colon"]);
    // donor 4 has no clinical history and contributes 0
    assert_eq!(rows[0].average_age_at_diagnosis, 19.0);
    assert_eq!(rows[1].gender, "Female");
    assert_eq!(rows[1].common_cancer_sites, ["Breast", "Lung"]);
    assert_eq!(rows[1].average_age_at_diagnosis, 45.0);
}

#[test]
fn exposure_and_lifestyle_over_all_donors() {
    let store = setup();
    let lifestyle = Engine::new(&store).exposure_and_lifestyle();
    assert_eq!(lifestyle.smoking_percentage, 50.0);
    assert_eq!(lifestyle.drinking_percentage, 50.0);
    assert_eq!(lifestyle.obesity_percentage, 50.0);
    assert_eq!(lifestyle.average_physical_activity, 1.25);

    let empty = store_from(json!({}));
    let lifestyle = Engine::new(&empty).exposure_and_lifestyle();
    assert_eq!(lifestyle.smoking_percentage, 0.0);
    assert_eq!(lifestyle.average_physical_activity, 0.0);
}

#[test]
fn patient_distribution_by_stage_gender_and_age() {
    let store = setup();
    let stages = Engine::new(&store).patient_distribution();
    let names: Vec<&str> = stages.iter().map(|s| s.tumor_stage.as_str()).collect();
    assert_eq!(names, ["Stage II", "Stage I", "none"]);

    // oldest age at diagnosis is 57, so brackets run 0-9 to 50-59
    let stage_two = &stages[0];
    assert_eq!(stage_two.distributions.len(), 2);
    let male = &stage_two.distributions[0];
    assert_eq!(male.gender.as_deref(), Some("Male"));
    let ranges: Vec<&str> = male.age_groups.iter().map(|b| b.range.as_str()).collect();
    assert_eq!(ranges, ["0-9", "10-19", "20-29", "30-39", "40-49", "50-59"]);
    let counts: Vec<usize> = male.age_groups.iter().map(|b| b.count).collect();
    assert_eq!(counts, [0, 0, 0, 1, 0, 0]);

    let stage_one_counts: Vec<usize> = stages[1].distributions[0].age_groups.iter().map(|b| b.count).collect();
    assert_eq!(stage_one_counts, [0, 0, 0, 0, 0, 1]);
    // donor 4 has no age at diagnosis: listed, never counted
    assert!(stages[2].distributions[0].age_groups.iter().all(|b| b.count == 0));
}

#[test]
fn implausible_ages_are_treated_as_missing() {
    let store = store_from(json!({
        "Donor": [
            { "donor_id": "1", "patientId": "P1", "gender": "Male", "age": 1e11 },
            { "donor_id": "2", "patientId": "P2", "gender": "Female", "age": 42 }
        ],
        "Diagnosis": [
            { "patientId": "P1", "disease": { "tumorStage": "Stage I" } },
            { "patientId": "P2", "disease": { "tumorStage": "Stage I" } }
        ],
        "ClinicalHistory": [
            { "patientId": "P1", "ageAtDiagnosis": 1e9 },
            { "patientId": "P2", "ageAtDiagnosis": 41 }
        ]
    }));
    let engine = Engine::new(&store);
    let distribution = engine.age_distribution_of_diagnosed_donors();
    assert_eq!(distribution.len(), 1);
    assert_eq!(distribution[0].age_group, "40-49");

    let stages = engine.patient_distribution();
    assert_eq!(stages.len(), 1);
    let male = &stages[0].distributions[0];
    assert_eq!(male.gender.as_deref(), Some("Male"));
    // brackets stop at the oldest plausible age on record
    assert_eq!(male.age_groups.len(), 5);
    assert!(male.age_groups.iter().all(|b| b.count == 0));
    assert_eq!(stages[0].distributions[1].age_groups[4].count, 1);
}
