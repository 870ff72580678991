//! The records that make up a dataset snapshot.
//!
//! Field names follow the source dataset (`donor_id`, `patientId`,
//! `cancerSiteName`, ...) so that a snapshot deserializes without a
//! translation layer. Every optional field is an `Option`, and absent
//! optional sub-structures are represented as `None` rather than as empty
//! placeholders, which keeps "no data" checkable.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::datatype::{DonorId, PatientId, SampleId};
use crate::error::AnalyticsError;

/// Anything kept in a [`crate::store::Collection`].
///
/// The key accessors default to `None`; a record type overrides the ones it
/// carries, which is what the join resolver indexes on.
pub trait Record {
    const ENTITY: &'static str;
    fn donor_id(&self) -> Option<&DonorId> {
        None
    }
    fn patient_id(&self) -> Option<&PatientId> {
        None
    }
    fn sample_id(&self) -> Option<&SampleId> {
        None
    }
}

// ------------- Donor -------------
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    #[serde(rename = "donor_id")]
    pub donor_id: DonorId,
    pub patient_id: Option<PatientId>,
    pub patient_uuid: Option<String>,
    pub bmi: Option<f64>,
    pub pre_menopause_cycle_type: Option<String>,
    pub pre_menopause_cycle_duration: Option<f64>,
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub menstruation: Option<String>,
    pub occupation: Option<String>,
    pub ethnicity: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub diet: Option<String>,
    pub marital_status: Option<String>,
    pub number_of_children: Option<u32>,
    pub waist_circumference: Option<f64>,
    pub baseline_hba1c: Option<f64>,
    pub baseline_fpg: Option<f64>,
    pub race: Option<String>,
    pub ethnicity_hispanic: Option<bool>,
    pub asian_majority: Option<bool>,
    pub disease_duration: Option<f64>,
    pub indication: Option<String>,
    pub disease_entry_criteria: Option<String>,
    /// Free-form; only its presence is ever looked at.
    pub disease: Option<Value>,
    pub overweight: Option<bool>,
    #[serde(rename = "obesityClassI")]
    pub obesity_class_1: Option<bool>,
    #[serde(rename = "obesityClassII")]
    pub obesity_class_2: Option<bool>,
    #[serde(rename = "obesityClassIII")]
    pub obesity_class_3: Option<bool>,
    pub diabetes: Option<bool>,
    pub prediabetes: Option<bool>,
    pub dyslipidemia: Option<bool>,
    pub hypertension: Option<bool>,
    pub depression: Option<bool>,
    pub pcos: Option<bool>,
}
impl Donor {
    pub fn new(donor_id: impl Into<DonorId>) -> Self {
        Self {
            donor_id: donor_id.into(),
            ..Self::default()
        }
    }
    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }
    /// Whether a disease is recorded. Empty text and `false` count as none.
    pub fn has_disease(&self) -> bool {
        match &self.disease {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(text)) => !text.is_empty(),
            Some(_) => true,
        }
    }
    pub fn is_obese(&self) -> bool {
        [self.obesity_class_1, self.obesity_class_2, self.obesity_class_3]
            .iter()
            .any(|class| *class == Some(true))
    }
}
impl Record for Donor {
    const ENTITY: &'static str = "Donor";
    fn donor_id(&self) -> Option<&DonorId> {
        Some(&self.donor_id)
    }
    fn patient_id(&self) -> Option<&PatientId> {
        self.patient_id.as_ref()
    }
}

// ------------- Diagnosis -------------
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disease {
    pub cancer_site: Option<String>,
    pub morphology: Option<String>,
    pub tumor_stage: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemotherapyDetails {
    pub selected_regimen: Option<String>,
    pub number_of_cycles: Option<u32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub adverse_event_list: Vec<String>,
    pub adverse_event_medication: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurgeryDetails {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub adverse_event_list: Vec<String>,
    pub adverse_event_medication: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStatusDetails {
    pub recist_criteria: Option<String>,
    #[serde(default, deserialize_with = "leading_integer")]
    pub disease_free_survival: Option<i64>,
    #[serde(default, deserialize_with = "leading_integer")]
    pub progression_free_survival: Option<i64>,
}

/// The treatment event attached to a diagnosis. Exactly one case is active.
#[derive(Clone, Debug, PartialEq)]
pub enum TreatmentEvent {
    Chemotherapy(ChemotherapyDetails),
    Surgery(SurgeryDetails),
    PerformanceStatus(PerformanceStatusDetails),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDiagnosis", into = "RawDiagnosis")]
pub struct Diagnosis {
    pub donor_id: Option<DonorId>,
    pub patient_id: Option<PatientId>,
    pub disease: Disease,
    pub treatment: Option<TreatmentEvent>,
}
impl Diagnosis {
    pub fn cancer_site(&self) -> Option<&str> {
        self.disease.cancer_site.as_deref()
    }
    pub fn morphology(&self) -> Option<&str> {
        self.disease.morphology.as_deref()
    }
    pub fn tumor_stage(&self) -> Option<&str> {
        self.disease.tumor_stage.as_deref()
    }
    pub fn chemotherapy(&self) -> Option<&ChemotherapyDetails> {
        match &self.treatment {
            Some(TreatmentEvent::Chemotherapy(details)) => Some(details),
            _ => None,
        }
    }
    pub fn surgery(&self) -> Option<&SurgeryDetails> {
        match &self.treatment {
            Some(TreatmentEvent::Surgery(details)) => Some(details),
            _ => None,
        }
    }
    pub fn performance_status(&self) -> Option<&PerformanceStatusDetails> {
        match &self.treatment {
            Some(TreatmentEvent::PerformanceStatus(details)) => Some(details),
            _ => None,
        }
    }
}
impl Record for Diagnosis {
    const ENTITY: &'static str = "Diagnosis";
    fn donor_id(&self) -> Option<&DonorId> {
        self.donor_id.as_ref()
    }
    fn patient_id(&self) -> Option<&PatientId> {
        self.patient_id.as_ref()
    }
}

// The dataset nests the treatment event four levels deep, with one optional
// member per kind of event. These mirror that layout on the way in and out.
#[derive(Clone, Default, Serialize, Deserialize)]
struct RawDiagnosis {
    donor_id: Option<DonorId>,
    #[serde(rename = "patientId")]
    patient_id: Option<PatientId>,
    #[serde(default, deserialize_with = "null_as_default")]
    disease: Disease,
    diagnostictests: Option<RawDiagnosticTests>,
}
#[derive(Clone, Default, Serialize, Deserialize)]
struct RawDiagnosticTests {
    eventtype: Option<RawEventType>,
}
#[derive(Clone, Default, Serialize, Deserialize)]
struct RawEventType {
    treatmenteventtype: Option<RawTreatmentEventType>,
}
#[derive(Clone, Default, Serialize, Deserialize)]
struct RawTreatmentEventType {
    chemotherapy: Option<RawChemotherapy>,
    surgery: Option<RawSurgery>,
    performancestatus: Option<RawPerformanceStatus>,
}
#[derive(Clone, Serialize, Deserialize)]
struct RawChemotherapy {
    chemotherapydetails: Option<ChemotherapyDetails>,
}
#[derive(Clone, Serialize, Deserialize)]
struct RawSurgery {
    surgerydetails: Option<SurgeryDetails>,
}
#[derive(Clone, Serialize, Deserialize)]
struct RawPerformanceStatus {
    performancestatusdetails: Option<PerformanceStatusDetails>,
}

impl TryFrom<RawDiagnosis> for Diagnosis {
    type Error = AnalyticsError;

    fn try_from(raw: RawDiagnosis) -> Result<Self, Self::Error> {
        let events = raw
            .diagnostictests
            .and_then(|tests| tests.eventtype)
            .and_then(|event| event.treatmenteventtype)
            .unwrap_or_default();
        // an event kind without its details block carries nothing to aggregate
        let mut populated = Vec::with_capacity(1);
        if let Some(details) = events.chemotherapy.and_then(|c| c.chemotherapydetails) {
            populated.push(TreatmentEvent::Chemotherapy(details));
        }
        if let Some(details) = events.surgery.and_then(|s| s.surgerydetails) {
            populated.push(TreatmentEvent::Surgery(details));
        }
        if let Some(details) = events.performancestatus.and_then(|p| p.performancestatusdetails) {
            populated.push(TreatmentEvent::PerformanceStatus(details));
        }
        if populated.len() > 1 {
            let owner = raw
                .donor_id
                .as_ref()
                .map(|id| id.to_string())
                .or_else(|| raw.patient_id.as_ref().map(|id| id.to_string()))
                .unwrap_or_else(|| String::from("<unkeyed>"));
            return Err(AnalyticsError::DataIntegrity(format!(
                "diagnosis of {} carries {} treatment events, at most one is allowed",
                owner,
                populated.len()
            )));
        }
        Ok(Self {
            donor_id: raw.donor_id,
            patient_id: raw.patient_id,
            disease: raw.disease,
            treatment: populated.pop(),
        })
    }
}

impl From<Diagnosis> for RawDiagnosis {
    fn from(diagnosis: Diagnosis) -> Self {
        let mut events = RawTreatmentEventType::default();
        match diagnosis.treatment {
            Some(TreatmentEvent::Chemotherapy(details)) => {
                events.chemotherapy = Some(RawChemotherapy { chemotherapydetails: Some(details) })
            }
            Some(TreatmentEvent::Surgery(details)) => {
                events.surgery = Some(RawSurgery { surgerydetails: Some(details) })
            }
            Some(TreatmentEvent::PerformanceStatus(details)) => {
                events.performancestatus = Some(RawPerformanceStatus {
                    performancestatusdetails: Some(details),
                })
            }
            None => (),
        }
        Self {
            donor_id: diagnosis.donor_id,
            patient_id: diagnosis.patient_id,
            disease: diagnosis.disease,
            diagnostictests: Some(RawDiagnosticTests {
                eventtype: Some(RawEventType {
                    treatmenteventtype: Some(events),
                }),
            }),
        }
    }
}

// ------------- Exposure -------------
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub donor_id: Option<DonorId>,
    pub sample_id: Option<SampleId>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub smoking: Option<bool>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub drinking: Option<bool>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub exercise: Option<String>,
    /// Lifestyle fields beyond the ones above, kept as found.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}
impl Exposure {
    /// Whether the named lifestyle flag is set to `true`.
    pub fn flag(&self, name: &str) -> bool {
        match name {
            "smoking" => self.smoking == Some(true),
            "drinking" => self.drinking == Some(true),
            _ => self.other.get(name).and_then(Value::as_bool) == Some(true),
        }
    }
    /// Physical activity score: moderate exercise counts 2, high intensity 3.
    pub fn activity_score(&self) -> u32 {
        match self.exercise.as_deref() {
            Some("Moderate") => 2,
            Some("High Intensity") => 3,
            _ => 0,
        }
    }
}
impl Record for Exposure {
    const ENTITY: &'static str = "Exposure";
    fn donor_id(&self) -> Option<&DonorId> {
        self.donor_id.as_ref()
    }
    fn sample_id(&self) -> Option<&SampleId> {
        self.sample_id.as_ref()
    }
}

// ------------- Family -------------
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub cancer_site_name: Option<String>,
    pub age_of_diagnosis: Option<f64>,
    pub patient_relation: Option<String>,
    pub herediatries: Option<String>,
}
impl Family {
    /// A hereditary factor is recorded when present and not literally "None".
    pub fn hereditary_factor(&self) -> Option<&str> {
        self.herediatries.as_deref().filter(|h| *h != "None")
    }
}
impl Record for Family {
    const ENTITY: &'static str = "Family";
}

// ------------- ClinicalHistory -------------
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalHistory {
    #[serde(rename = "donor_id")]
    pub donor_id: Option<DonorId>,
    pub patient_id: Option<PatientId>,
    pub age_at_diagnosis: Option<f64>,
}
impl Record for ClinicalHistory {
    const ENTITY: &'static str = "ClinicalHistory";
    fn donor_id(&self) -> Option<&DonorId> {
        self.donor_id.as_ref()
    }
    fn patient_id(&self) -> Option<&PatientId> {
        self.patient_id.as_ref()
    }
}

// ------------- Sample -------------
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub sample_id: SampleId,
    pub patient_id: Option<PatientId>,
}
impl Record for Sample {
    const ENTITY: &'static str = "Sample";
    fn patient_id(&self) -> Option<&PatientId> {
        self.patient_id.as_ref()
    }
    fn sample_id(&self) -> Option<&SampleId> {
        Some(&self.sample_id)
    }
}

// ------------- Gene expression -------------
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressionPoint {
    #[serde(rename = "sampleId", alias = "sample_id")]
    pub sample_id: SampleId,
    #[serde(default)]
    pub expression_value: f64,
}
impl Record for ExpressionPoint {
    const ENTITY: &'static str = "ExpressionPoint";
    fn sample_id(&self) -> Option<&SampleId> {
        Some(&self.sample_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneExpression {
    pub gene_symbol: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expression_data: Vec<ExpressionPoint>,
}

/// Raw and normalised expression matrices of one assay type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssayMatrix {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub raw_count_data: Vec<GeneExpression>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub normalised_data: Vec<GeneExpression>,
}

// ------------- Publication / Dataset -------------
// These are only ever listed, so their attributes are kept as found.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Publication {
    pub attributes: Map<String, Value>,
}
impl Record for Publication {
    const ENTITY: &'static str = "Publication";
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    pub attributes: Map<String, Value>,
}
impl Record for Dataset {
    const ENTITY: &'static str = "Dataset";
}

// ------------- Lenient field readers -------------
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Lifestyle fields are booleans in most exports but categorical text
// ("Former", "Occasional") in some. Only a literal `true` sets a flag.
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| value.as_bool()))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Integer(i64),
    Float(f64),
    Text(String),
}

// Survival figures arrive as numbers or as text such as "24 months"; only the
// leading integer is kept.
fn leading_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawNumber>::deserialize(deserializer)? {
        Some(RawNumber::Integer(i)) => Some(i),
        Some(RawNumber::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
        Some(RawNumber::Float(_)) => None,
        Some(RawNumber::Text(text)) => parse_leading_integer(&text),
        None => None,
    })
}

pub(crate) fn parse_leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
