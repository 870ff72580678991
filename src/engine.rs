//! The named analytic operations.
//!
//! An [`Engine`] borrows a [`Store`] and answers one fixed computation per
//! method. Every method is a pure read of the store, so any number of engines
//! may run over the same store at the same time.
//!
//! Operations whose filter may legitimately match nothing return
//! `Option`; `None` is the empty result and is not an error. Operations
//! given an identifier that must exist fail with `NotFound` instead.

use serde::Serialize;
use tracing::debug;

use crate::aggregate::{
    self, Tally, mean_or_null, mean_or_zero, mode, percentage, ratio_or_zero, round_to,
};
use crate::construct::{
    ChemotherapyDetails, ClinicalHistory, Dataset, Diagnosis, Donor, Exposure, Family,
    Publication, SurgeryDetails,
};
use crate::datatype::{AgeGroup, DonorId, PatientId};
use crate::error::{AnalyticsError, Result};
use crate::expression::{
    self, Assay, DEFAULT_ASSAY_TYPE, ExpressionCorrelation, GeneExpressionProfile,
    RegimenExpression, StageExpression, StageSamples, StageTopGenes,
};
use crate::filter::{DonorProfile, DonorWithExposure, matches};
use crate::store::Store;

const MALE: &str = "Male";
const FEMALE: &str = "Female";

// ------------- Result shapes -------------
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancerSiteDonors {
    pub cancer_site: String,
    pub total_donors: usize,
    pub male_donors: usize,
    pub female_donors: usize,
    pub average_age: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiabetesCounts {
    pub total_donors: usize,
    pub obese_donors_count: usize,
    pub overweight_donors_count: usize,
    pub diabetes_donors_count: usize,
    pub prediabetes_donors_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub total_donors: usize,
    pub average_age: Option<f64>,
    pub male_donors: usize,
    pub female_donors: usize,
    #[serde(rename = "averageBMI")]
    pub average_bmi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeGroupCount {
    pub age_group: String,
    pub total_diagnosed_donors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthnicityPrevalence {
    pub ethnicity: String,
    pub total_donors: usize,
    pub disease_prevalence: f64,
    pub average_age: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderExposure {
    pub gender: String,
    pub total_donors: usize,
    pub smoking_percentage: f64,
    pub drinking_percentage: f64,
    #[serde(rename = "averageBMI")]
    pub average_bmi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthnicityDiagnoses {
    pub ethnicity: String,
    pub total_diagnoses: usize,
    pub male_diagnoses: usize,
    pub female_diagnoses: usize,
    pub average_age_at_diagnosis: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderDiseaseDistribution {
    pub gender: String,
    pub total_cases: usize,
    pub common_cancer_sites: Vec<String>,
    pub average_age_at_diagnosis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifestyle {
    pub smoking_percentage: f64,
    pub drinking_percentage: f64,
    pub obesity_percentage: f64,
    pub average_physical_activity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBucket {
    pub range: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderDistribution {
    pub gender: Option<String>,
    pub age_groups: Vec<AgeBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDistribution {
    pub tumor_stage: String,
    pub distributions: Vec<GenderDistribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyHistory {
    pub cancer_site: String,
    pub total_families: usize,
    pub affected_families: usize,
    pub average_age_of_diagnosis: f64,
    pub most_common_relation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HereditaryFactors {
    pub total_families: usize,
    pub hereditary_factors: Vec<String>,
    pub average_age_of_diagnosis: f64,
    pub most_common_cancer_site: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancerSiteFamilyHistory {
    pub cancer_site: String,
    pub total_families: usize,
    pub affected_families: usize,
    pub average_age_of_diagnosis: Option<f64>,
    pub most_common_relation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemotherapyStatistics {
    pub total_cycles: u64,
    pub average_number_of_cycles: f64,
    pub most_common_adverse_event: Option<String>,
    pub most_common_medication: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemotherapyAnalysis {
    pub selected_regimen: String,
    #[serde(flatten)]
    pub statistics: ChemotherapyStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurgeryAnalysis {
    pub surgery_name: String,
    pub total_surgeries: usize,
    pub most_common_adverse_event: Option<String>,
    pub most_common_medication: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimenCount {
    pub regimen: String,
    pub total_donors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OncologySummary {
    pub cancer_site: String,
    pub total_diagnosed_cases: usize,
    pub most_common_morphology: Option<String>,
    pub average_age_at_diagnosis: f64,
    pub common_treatment_regimens: Vec<RegimenCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalAnalysis {
    pub disease: String,
    pub average_disease_free_survival: f64,
    pub average_progression_free_survival: f64,
    pub common_recist_criteria: String,
}

// ------------- Engine -------------
pub struct Engine<'st> {
    store: &'st Store,
    assay_type: String,
}

impl<'st> Engine<'st> {
    pub fn new(store: &'st Store) -> Self {
        Self {
            store,
            assay_type: DEFAULT_ASSAY_TYPE.to_owned(),
        }
    }
    /// Sets the assay the single-assay expression operations read from.
    pub fn with_assay_type(mut self, assay_type: impl Into<String>) -> Self {
        self.assay_type = assay_type.into();
        self
    }
    pub fn store(&self) -> &'st Store {
        self.store
    }
    pub fn assay_type(&self) -> &str {
        &self.assay_type
    }
    fn assay(&self) -> Result<&'st Assay> {
        self.store
            .assay(&self.assay_type)
            .ok_or_else(|| AnalyticsError::not_found("Assay", self.assay_type.as_str()))
    }

    // ------------- Listings -------------
    pub fn appname(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
    pub fn all_donors(&self) -> &'st [Donor] {
        self.store.donors().records()
    }
    pub fn all_exposures(&self) -> &'st [Exposure] {
        self.store.exposures().records()
    }
    pub fn all_families(&self) -> &'st [Family] {
        self.store.families().records()
    }
    pub fn all_clinical_histories(&self) -> &'st [ClinicalHistory] {
        self.store.clinical_histories().records()
    }
    pub fn all_diagnoses(&self) -> &'st [Diagnosis] {
        self.store.diagnoses().records()
    }
    pub fn all_publications(&self) -> &'st [Publication] {
        self.store.publications().records()
    }
    pub fn all_datasets(&self) -> &'st [Dataset] {
        self.store.datasets().records()
    }

    // ------------- Donor-centric -------------
    /// Donors diagnosed at a cancer site, each donor counted once.
    pub fn donors_count_by_cancer_site(&self, cancer_site: &str) -> Option<CancerSiteDonors> {
        let diagnoses = self.store.diagnoses();
        let matching = diagnoses.select(|d| matches(d.cancer_site(), cancer_site));
        if matching.is_empty() {
            debug!(cancer_site, "no diagnoses at cancer site");
            return None;
        }
        let donors = self.store.donors();
        let selected = donors.select_related::<DonorId, _, _>(matching.records(diagnoses));
        let selected: Vec<&Donor> = selected.records(donors).collect();
        Some(CancerSiteDonors {
            cancer_site: cancer_site.to_owned(),
            total_donors: selected.len(),
            male_donors: count_gender(&selected, MALE),
            female_donors: count_gender(&selected, FEMALE),
            average_age: mean_or_null(selected.iter().map(|d| d.age.unwrap_or(0.0))),
        })
    }

    pub fn donors_with_diabetes_count(&self) -> DiabetesCounts {
        let donors = self.store.donors();
        let flagged = |flag: fn(&Donor) -> Option<bool>| {
            donors.filter(move |d| flag(d) == Some(true)).count()
        };
        DiabetesCounts {
            total_donors: donors.len(),
            obese_donors_count: flagged(|d| d.obesity_class_3),
            overweight_donors_count: flagged(|d| d.overweight),
            diabetes_donors_count: flagged(|d| d.diabetes),
            prediabetes_donors_count: flagged(|d| d.prediabetes),
        }
    }

    pub fn donor_by_id(&self, donor_id: &str) -> Result<DonorProfile> {
        self.store
            .donors()
            .related(&DonorId::from(donor_id))
            .map(DonorProfile::from)
            .ok_or_else(|| AnalyticsError::not_found("Donor", donor_id))
    }

    pub fn donors_with_condition(&self, indication: &str) -> Vec<Donor> {
        self.store
            .donors()
            .filter(|d| matches(d.indication.as_deref(), indication))
            .cloned()
            .collect()
    }

    /// Donors with an exposure record that has the named flag set.
    pub fn donors_with_exposure(&self, exposure_type: &str) -> Vec<DonorWithExposure> {
        let exposures = self.store.exposures();
        let exposed = exposures.select(|e| e.flag(exposure_type));
        let donors = self.store.donors();
        donors
            .select_related::<DonorId, _, _>(exposed.records(exposures))
            .records(donors)
            .map(|donor| DonorWithExposure {
                donor: donor.clone(),
                exposure_type: exposure_type.to_owned(),
            })
            .collect()
    }

    pub fn donor_demographics(&self) -> Demographics {
        let donors: Vec<&Donor> = self.store.donors().iter().collect();
        Demographics {
            total_donors: donors.len(),
            average_age: mean_or_null(donors.iter().map(|d| d.age.unwrap_or(0.0))),
            male_donors: count_gender(&donors, MALE),
            female_donors: count_gender(&donors, FEMALE),
            average_bmi: mean_or_null(donors.iter().map(|d| d.bmi.unwrap_or(0.0))),
        }
    }

    /// Donor counts per ten year age group, groups in first-seen order.
    pub fn age_distribution_of_diagnosed_donors(&self) -> Vec<AgeGroupCount> {
        self.store
            .donors()
            .iter()
            .filter_map(|d| d.age.and_then(AgeGroup::of))
            .collect::<Tally<AgeGroup>>()
            .into_iter()
            .map(|(group, count)| AgeGroupCount {
                age_group: group.to_string(),
                total_diagnosed_donors: count,
            })
            .collect()
    }

    pub fn ethnicity_and_disease_prevalence(&self, ethnicity: &str) -> EthnicityPrevalence {
        let donors: Vec<&Donor> = self
            .store
            .donors()
            .filter(|d| matches(d.ethnicity.as_deref(), ethnicity))
            .collect();
        let with_disease = donors.iter().filter(|d| d.has_disease()).count();
        EthnicityPrevalence {
            ethnicity: ethnicity.to_owned(),
            total_donors: donors.len(),
            disease_prevalence: ratio_or_zero(with_disease as f64, donors.len()),
            average_age: mean_or_null(donors.iter().map(|d| d.age.unwrap_or(0.0))),
        }
    }

    /// Lifestyle shares among donors of one gender, each donor judged by its
    /// first exposure record.
    pub fn gender_based_exposure_analysis(&self, gender: &str) -> GenderExposure {
        let exposures = self.store.exposures();
        let donors: Vec<&Donor> = self
            .store
            .donors()
            .filter(|d| matches(d.gender(), gender))
            .collect();
        let exposed = |flag: &str| {
            donors
                .iter()
                .filter(|d| {
                    exposures
                        .related_of::<DonorId, _>(**d)
                        .is_some_and(|e| e.flag(flag))
                })
                .count()
        };
        GenderExposure {
            gender: gender.to_owned(),
            total_donors: donors.len(),
            smoking_percentage: percentage(exposed("smoking"), donors.len()),
            drinking_percentage: percentage(exposed("drinking"), donors.len()),
            average_bmi: mean_or_zero(donors.iter().map(|d| d.bmi.unwrap_or(0.0))),
        }
    }

    pub fn diagnosis_by_ethnicity(&self, ethnicity: &str) -> Option<EthnicityDiagnoses> {
        let diagnoses = self.store.diagnoses();
        let matching = diagnoses.select(|d| {
            matches(
                self.store.donor_of(d).and_then(|donor| donor.ethnicity.as_deref()),
                ethnicity,
            )
        });
        if matching.is_empty() {
            return None;
        }
        let of_gender = |gender: &str| {
            matching
                .records(diagnoses)
                .filter(|d| matches(self.store.donor_of(*d).and_then(Donor::gender), gender))
                .count()
        };
        let donors = self.store.donors();
        let ages = donors
            .select_related::<DonorId, _, _>(matching.records(diagnoses))
            .records(donors)
            .map(|d| d.age.unwrap_or(0.0))
            .collect::<Vec<_>>();
        Some(EthnicityDiagnoses {
            ethnicity: ethnicity.to_owned(),
            total_diagnoses: matching.len(),
            male_diagnoses: of_gender(MALE),
            female_diagnoses: of_gender(FEMALE),
            average_age_at_diagnosis: mean_or_null(ages),
        })
    }

    /// Diagnoses per donor gender. A diagnosis whose donor has no clinical
    /// history contributes an age of 0.
    pub fn disease_distribution_by_gender(&self) -> Vec<GenderDiseaseDistribution> {
        let genders = aggregate::distinct(self.store.donors().iter().filter_map(Donor::gender));
        genders
            .into_iter()
            .map(|gender| {
                let cases: Vec<&Diagnosis> = self
                    .store
                    .diagnoses()
                    .filter(|d| matches(self.store.donor_of(d).and_then(Donor::gender), gender))
                    .collect();
                let total_age: f64 = cases
                    .iter()
                    .map(|d| {
                        self.store
                            .clinical_histories()
                            .related_of::<DonorId, _>(*d)
                            .and_then(|history| history.age_at_diagnosis)
                            .unwrap_or(0.0)
                    })
                    .sum();
                GenderDiseaseDistribution {
                    gender: gender.to_owned(),
                    total_cases: cases.len(),
                    common_cancer_sites: aggregate::distinct(
                        cases.iter().filter_map(|d| d.cancer_site()),
                    )
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
                    average_age_at_diagnosis: ratio_or_zero(total_age, cases.len()),
                }
            })
            .collect()
    }

    /// Lifestyle shares over the whole donor population, each donor judged by
    /// its first exposure record.
    pub fn exposure_and_lifestyle(&self) -> Lifestyle {
        let donors = self.store.donors();
        let exposures = self.store.exposures();
        let first_exposures: Vec<Option<&Exposure>> = donors
            .iter()
            .map(|d| exposures.related_of::<DonorId, _>(d))
            .collect();
        let exposed = |flag: &str| {
            first_exposures
                .iter()
                .filter(|e| e.is_some_and(|e| e.flag(flag)))
                .count()
        };
        let activity: u32 = first_exposures
            .iter()
            .map(|e| e.map_or(0, Exposure::activity_score))
            .sum();
        Lifestyle {
            smoking_percentage: percentage(exposed("smoking"), donors.len()),
            drinking_percentage: percentage(exposed("drinking"), donors.len()),
            obesity_percentage: percentage(donors.filter(|d| d.is_obese()).count(), donors.len()),
            average_physical_activity: round_to(ratio_or_zero(activity as f64, donors.len()), 2),
        }
    }

    /// Donor counts per tumor stage, gender and age-at-diagnosis bracket.
    ///
    /// The brackets run from `0-9` up to the one holding the oldest age at
    /// diagnosis on record. Ages past [`AgeGroup::OLDEST`] count as missing. Donors are tied to their diagnosis and clinical
    /// history through the patient key; donors without a staged diagnosis
    /// are left out, and donors without an age are listed but not counted.
    pub fn patient_distribution(&self) -> Vec<PatientDistribution> {
        let histories = self.store.clinical_histories();
        let brackets = histories
            .iter()
            .filter_map(|h| h.age_at_diagnosis.and_then(AgeGroup::of))
            .max()
            .map_or(0, |oldest| oldest.index() + 1);
        let staged = self.store.donors().iter().filter_map(|donor| {
            let diagnosis = self.store.diagnoses().related_of::<PatientId, _>(donor)?;
            let stage = diagnosis.tumor_stage()?;
            let age = histories
                .related_of::<PatientId, _>(donor)
                .and_then(|h| h.age_at_diagnosis);
            Some((stage, donor.gender.clone(), age))
        });
        aggregate::group_by(staged, |(stage, _, _)| Some(stage.to_string()))
            .into_iter()
            .map(|(tumor_stage, members)| {
                let distributions = aggregate::group_by(members, |(_, gender, _)| Some(gender.clone()))
                    .into_iter()
                    .map(|(gender, members)| {
                        let mut counts = vec![0usize; brackets];
                        for (_, _, age) in members {
                            if let Some(slot) = age
                                .and_then(AgeGroup::of)
                                .and_then(|group| counts.get_mut(group.index()))
                            {
                                *slot += 1;
                            }
                        }
                        GenderDistribution {
                            gender,
                            age_groups: counts
                                .into_iter()
                                .enumerate()
                                .filter_map(|(index, count)| {
                                    AgeGroup::from_index(index).map(|group| AgeBucket {
                                        range: group.to_string(),
                                        count,
                                    })
                                })
                                .collect(),
                        }
                    })
                    .collect();
                PatientDistribution {
                    tumor_stage,
                    distributions,
                }
            })
            .collect()
    }

    // ------------- Family history -------------
    pub fn family_history_analysis(&self, cancer_site: &str) -> FamilyHistory {
        let families = self.families_at(cancer_site);
        FamilyHistory {
            cancer_site: cancer_site.to_owned(),
            total_families: families.len(),
            affected_families: families.iter().filter(|f| f.age_of_diagnosis.is_some()).count(),
            average_age_of_diagnosis: mean_or_zero(
                families.iter().map(|f| f.age_of_diagnosis.unwrap_or(0.0)),
            ),
            most_common_relation: mode(families.iter().filter_map(|f| f.patient_relation.clone())),
        }
    }

    pub fn family_history_and_hereditary_factors(&self) -> HereditaryFactors {
        let families = self.store.families();
        let total_age: f64 = families.iter().filter_map(|f| f.age_of_diagnosis).sum();
        HereditaryFactors {
            total_families: families.len(),
            hereditary_factors: families
                .iter()
                .filter_map(Family::hereditary_factor)
                .map(str::to_owned)
                .collect(),
            average_age_of_diagnosis: ratio_or_zero(total_age, families.len()),
            most_common_cancer_site: mode(families.iter().filter_map(|f| f.cancer_site_name.clone())),
        }
    }

    /// Family history at a cancer site, restricted to families with a
    /// hereditary factor on record.
    pub fn cancer_site_and_family_history_analysis(&self, cancer_site: &str) -> CancerSiteFamilyHistory {
        let families = self.families_at(cancer_site);
        let affected: Vec<&Family> = families
            .iter()
            .copied()
            .filter(|f| f.hereditary_factor().is_some())
            .collect();
        CancerSiteFamilyHistory {
            cancer_site: cancer_site.to_owned(),
            total_families: families.len(),
            affected_families: affected.len(),
            average_age_of_diagnosis: mean_or_null(affected.iter().filter_map(|f| f.age_of_diagnosis)),
            most_common_relation: mode(affected.iter().filter_map(|f| f.patient_relation.clone())),
        }
    }

    fn families_at(&self, cancer_site: &str) -> Vec<&'st Family> {
        self.store
            .families()
            .iter()
            .filter(|f| matches(f.cancer_site_name.as_deref(), cancer_site))
            .collect()
    }

    // ------------- Treatment events -------------
    /// Cycle and adverse-event statistics for one regimen. Unlike the
    /// cohort-wide summary, the medication reported is the one recorded on the
    /// first matching diagnosis, not the most common one.
    pub fn chemotherapy_adverse_events_analysis(&self, selected_regimen: &str) -> ChemotherapyAnalysis {
        let events: Vec<&ChemotherapyDetails> = self
            .store
            .diagnoses()
            .iter()
            .filter_map(Diagnosis::chemotherapy)
            .filter(|c| matches(c.selected_regimen.as_deref(), selected_regimen))
            .collect();
        let mut statistics = chemotherapy_statistics(&events);
        statistics.most_common_medication = events
            .first()
            .and_then(|c| c.adverse_event_medication.clone())
            .filter(|medication| !medication.is_empty());
        ChemotherapyAnalysis {
            selected_regimen: selected_regimen.to_owned(),
            statistics,
        }
    }

    pub fn chemotherapy_adverse_events_summary(&self) -> ChemotherapyStatistics {
        let events: Vec<&ChemotherapyDetails> = self
            .store
            .diagnoses()
            .iter()
            .filter_map(Diagnosis::chemotherapy)
            .collect();
        chemotherapy_statistics(&events)
    }

    /// Adverse events of one kind of surgery. The medication reported is the
    /// most common one among surgeries that list the most common event.
    pub fn surgery_adverse_events_analysis(&self, surgery_name: &str) -> SurgeryAnalysis {
        let surgeries: Vec<&SurgeryDetails> = self
            .store
            .diagnoses()
            .iter()
            .filter_map(Diagnosis::surgery)
            .filter(|s| matches(s.name.as_deref(), surgery_name))
            .collect();
        let most_common_adverse_event =
            mode(surgeries.iter().flat_map(|s| s.adverse_event_list.iter().cloned()));
        let most_common_medication = most_common_adverse_event.as_ref().and_then(|event| {
            mode(
                surgeries
                    .iter()
                    .filter(|s| s.adverse_event_list.contains(event))
                    .filter_map(|s| s.adverse_event_medication.clone()),
            )
        });
        SurgeryAnalysis {
            surgery_name: surgery_name.to_owned(),
            total_surgeries: surgeries.len(),
            most_common_adverse_event,
            most_common_medication,
        }
    }

    pub fn oncology_summary(&self, cancer_site: &str) -> Option<OncologySummary> {
        let cases: Vec<&Diagnosis> = self
            .store
            .diagnoses()
            .filter(|d| matches(d.cancer_site(), cancer_site))
            .collect();
        if cases.is_empty() {
            return None;
        }
        let total_age: f64 = cases
            .iter()
            .map(|d| self.store.donor_of(*d).and_then(|donor| donor.age).unwrap_or(0.0))
            .sum();
        let regimens: Tally<&str> = cases
            .iter()
            .filter_map(|d| d.chemotherapy())
            .filter_map(|c| c.selected_regimen.as_deref())
            .collect();
        Some(OncologySummary {
            cancer_site: cancer_site.to_owned(),
            total_diagnosed_cases: cases.len(),
            most_common_morphology: mode(cases.iter().filter_map(|d| d.morphology()))
                .map(str::to_owned),
            average_age_at_diagnosis: ratio_or_zero(total_age, cases.len()),
            common_treatment_regimens: regimens
                .into_iter()
                .map(|(regimen, total_donors)| RegimenCount {
                    regimen: regimen.to_owned(),
                    total_donors,
                })
                .collect(),
        })
    }

    /// Survival figures over the diagnoses of donors with the given
    /// indication. Missing figures count as 0. The RECIST criteria come out
    /// as the one value shared by every diagnosis that has one, `Mixed` when
    /// they differ, or `Not Available` when none has one.
    pub fn performance_status_and_survival_analysis(&self, disease: &str) -> Option<SurvivalAnalysis> {
        let donors = self.store.donors();
        let relevant = donors.select(|d| matches(d.indication.as_deref(), disease));
        if relevant.is_empty() {
            return None;
        }
        let diagnoses = self.store.diagnoses();
        let diagnoses: Vec<&Diagnosis> = diagnoses
            .select_related::<DonorId, _, _>(relevant.records(donors))
            .records(diagnoses)
            .collect();
        let survival = |figure: fn(&Diagnosis) -> Option<i64>| {
            let total: i64 = diagnoses.iter().filter_map(|d| figure(d)).sum();
            ratio_or_zero(total as f64, diagnoses.len())
        };
        let criteria = aggregate::distinct(
            diagnoses
                .iter()
                .filter_map(|d| d.performance_status())
                .filter_map(|p| p.recist_criteria.as_deref()),
        );
        let common_recist_criteria = match criteria.as_slice() {
            [] => "Not Available".to_owned(),
            [single] => (*single).to_owned(),
            _ => "Mixed".to_owned(),
        };
        Some(SurvivalAnalysis {
            disease: disease.to_owned(),
            average_disease_free_survival: survival(|d| {
                d.performance_status().and_then(|p| p.disease_free_survival)
            }),
            average_progression_free_survival: survival(|d| {
                d.performance_status().and_then(|p| p.progression_free_survival)
            }),
            common_recist_criteria,
        })
    }

    // ------------- Expression -------------
    pub fn expression_by_gene_id(&self, gene_symbol: &str) -> Result<GeneExpressionProfile> {
        expression::gene_profile(self.assay()?, gene_symbol)
    }
    pub fn expression_by_regimen(&self, regimen: &str) -> Result<RegimenExpression> {
        Ok(expression::expression_by_regimen(self.store, self.assay()?, regimen))
    }
    pub fn top_genes_by_tumor_stage(&self, n: usize) -> Result<Vec<StageTopGenes>> {
        Ok(expression::top_genes_by_tumor_stage(self.store, self.assay()?, n))
    }
    pub fn sample_ids_by_tumor_stage(&self) -> Vec<StageSamples> {
        expression::sample_ids_by_tumor_stage(self.store)
    }
    pub fn gene_expression_by_tumor_stage(&self) -> Result<Vec<StageExpression>> {
        Ok(expression::gene_expression_by_tumor_stage(self.store, self.assay()?))
    }
    pub fn expression_correlation_for_gene<S: AsRef<str>>(
        &self,
        assay_types: &[S],
        gene_symbol: &str,
    ) -> Result<ExpressionCorrelation> {
        expression::correlation(self.store, assay_types, gene_symbol)
    }
}

fn count_gender(donors: &[&Donor], gender: &str) -> usize {
    donors.iter().filter(|d| matches(d.gender(), gender)).count()
}

fn chemotherapy_statistics(events: &[&ChemotherapyDetails]) -> ChemotherapyStatistics {
    let total_cycles: u64 = events
        .iter()
        .map(|c| u64::from(c.number_of_cycles.unwrap_or(0)))
        .sum();
    ChemotherapyStatistics {
        total_cycles,
        average_number_of_cycles: total_cycles as f64 / events.len().max(1) as f64,
        most_common_adverse_event: mode(events.iter().flat_map(|c| c.adverse_event_list.iter().cloned())),
        most_common_medication: mode(events.iter().filter_map(|c| c.adverse_event_medication.clone())),
    }
}
