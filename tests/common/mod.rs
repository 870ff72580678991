#![allow(dead_code)]

use cptac_analytics::persist;
use cptac_analytics::store::Store;
use serde_json::{Value, json};

pub fn store_from(value: Value) -> Store {
    persist::from_str(&value.to_string()).expect("fixture loads")
}

pub fn setup() -> Store {
    store_from(cohort())
}

fn chemotherapy(regimen: &str, cycles: u32, events: &[&str], medication: &str) -> Value {
    json!({ "eventtype": { "treatmenteventtype": { "chemotherapy": { "chemotherapydetails": {
        "selectedRegimen": regimen,
        "numberOfCycles": cycles,
        "adverseEventList": events,
        "adverseEventMedication": medication
    }}}}})
}

fn surgery(name: &str, events: &[&str], medication: &str) -> Value {
    json!({ "eventtype": { "treatmenteventtype": { "surgery": { "surgerydetails": {
        "name": name,
        "adverseEventList": events,
        "adverseEventMedication": medication
    }}}}})
}

fn performance_status(recist: &str, disease_free: Value, progression_free: Value) -> Value {
    json!({ "eventtype": { "treatmenteventtype": { "performancestatus": { "performancestatusdetails": {
        "recistCriteria": recist,
        "diseaseFreeSurvival": disease_free,
        "progressionFreeSurvival": progression_free
    }}}}})
}

fn points(values: &[(&str, f64)]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|(sample, value)| json!({ "sampleId": sample, "expression_value": value }))
            .collect(),
    )
}

/// Four donors with one diagnosis each, three exposures, four family records,
/// three clinical histories, four samples and two assay types.
pub fn cohort() -> Value {
    json!({
        "Donor": [
            { "donor_id": "1", "patientId": "P1", "gender": "Male", "age": 40, "bmi": 25.0,
              "ethnicity": "Asian", "indication": "Breast Cancer", "disease": "Breast Cancer",
              "overweight": true, "diabetes": true, "obesityClassIII": false },
            { "donor_id": "2", "patientId": "P2", "gender": "Female", "age": 60, "bmi": 30.0,
              "ethnicity": "Asian", "indication": "Breast Cancer", "obesityClassI": true,
              "prediabetes": true },
            { "donor_id": 3, "patientId": "P3", "gender": "Female", "age": 35, "bmi": 22.0,
              "ethnicity": "White", "indication": "Lung Cancer", "disease": "",
              "obesityClassIII": true, "diabetes": true },
            { "donor_id": "4", "patientId": "P4", "gender": "Male", "ethnicity": "White",
              "indication": "Colon Cancer" }
        ],
        "Diagnosis": [
            { "donor_id": "1", "patientId": "P1",
              "disease": { "cancerSite": "Breast", "morphology": "Ductal", "tumorStage": "Stage II" },
              "diagnostictests": chemotherapy("AC-T", 4, &["Nausea", "Fatigue"], "Ondansetron") },
            { "donor_id": "2", "patientId": "P2",
              "disease": { "cancerSite": "Breast", "morphology": "Lobular", "tumorStage": "Stage I" },
              "diagnostictests": chemotherapy("AC-T", 6, &["Fatigue", "Nausea", "Neuropathy"], "Dexamethasone") },
            { "donor_id": "3", "patientId": "P3",
              "disease": { "cancerSite": "Lung", "morphology": "Adenocarcinoma", "tumorStage": "Stage II" },
              "diagnostictests": surgery("Lobectomy", &["Infection", "Bleeding"], "Cefazolin") },
            { "donor_id": "4", "patientId": "P4",
              "disease": { "cancerSite": "Colon", "morphology": "Adenocarcinoma", "tumorStage": "none" },
              "diagnostictests": performance_status("Partial Response", json!("24 months"), json!(18)) }
        ],
        "Exposure": [
            { "donor_id": "1", "sample_id": "S1", "smoking": true, "drinking": false, "exercise": "Moderate" },
            { "donor_id": "2", "sample_id": "S2", "smoking": false, "drinking": true,
              "exercise": "High Intensity", "sunExposure": true },
            { "donor_id": "3", "sample_id": "S3", "smoking": true, "drinking": true, "exercise": "None" }
        ],
        "Family": [
            { "cancerSiteName": "Breast", "ageOfDiagnosis": 50, "patientRelation": "Mother", "herediatries": "BRCA1" },
            { "cancerSiteName": "Breast", "ageOfDiagnosis": null, "patientRelation": "Mother", "herediatries": "None" },
            { "cancerSiteName": "Breast", "ageOfDiagnosis": 40, "patientRelation": "Sister", "herediatries": "BRCA2" },
            { "cancerSiteName": "Lung", "ageOfDiagnosis": 70, "patientRelation": "Father", "herediatries": null }
        ],
        "ClinicalHistory": [
            { "donor_id": "1", "patientId": "P1", "ageAtDiagnosis": 38 },
            { "donor_id": "2", "patientId": "P2", "ageAtDiagnosis": 57 },
            { "donor_id": "3", "patientId": "P3", "ageAtDiagnosis": 33 }
        ],
        "Sample": [
            { "sampleId": "S1", "patientId": "P1" },
            { "sampleId": "S2", "patientId": "P2" },
            { "sampleId": "S3", "patientId": "P3" },
            { "sampleId": "S4", "patientId": "P4" }
        ],
        "Assay": { "assayType": {
            "transcriptomics": {
                "rawCountData": [
                    { "geneSymbol": "TP53", "expressionData": points(&[("S1", 10.0), ("S2", 20.0), ("S3", 30.0)]) },
                    { "geneSymbol": "BRCA1", "expressionData": points(&[("S1", 5.0)]) }
                ],
                "normalisedData": [
                    { "geneSymbol": "TP53", "expressionData": points(&[("S1", 1.0), ("S2", 2.0), ("S3", 3.0)]) },
                    { "geneSymbol": "BRCA1", "expressionData": points(&[("S1", 4.0), ("S2", 0.5), ("S3", 2.0)]) },
                    { "geneSymbol": "EGFR", "expressionData": points(&[("S1", 2.0), ("S3", 5.0), ("S4", 9.0)]) }
                ]
            },
            "proteomics": {
                "rawCountData": [],
                "normalisedData": [
                    { "geneSymbol": "TP53", "expressionData": points(&[("S3", 6.0), ("S2", 4.0), ("S1", 2.0), ("S9", 100.0)]) },
                    { "geneSymbol": "BRCA1", "expressionData": points(&[("S1", 1.0), ("S2", 1.0), ("S3", 1.0)]) },
                    { "geneSymbol": "EGFR", "expressionData": points(&[("S1", 3.0)]) }
                ]
            }
        }},
        "Publications": [{ "title": "Proteogenomic pilot", "year": 2021 }],
        "Dataset": [{ "name": "cohort A" }]
    })
}
