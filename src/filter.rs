//! Filtering and projection over collections.
//!
//! Filters are plain predicates (`Fn(&R) -> bool`). Predicates that walk into
//! optional sub-structures are written with `Option` combinators, so an absent
//! path evaluates to `false` and the record is excluded instead of failing.
//!
//! A [`Selection`] is the set of matching positions within one collection.
//! Since positions are kept in a bitmap, iterating a selection yields records
//! in collection order and without duplicates, which is what the "derived id
//! set" membership tests need (for example "donors that have a diagnosis at
//! this cancer site").

use roaring::RoaringBitmap;
use serde::Serialize;
use tracing::debug;

use crate::construct::{Donor, Record};
use crate::datatype::{DonorId, JoinKey, PatientId};
use crate::store::Collection;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    positions: RoaringBitmap,
}
impl Selection {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, position: u32) {
        self.positions.insert(position);
    }
    pub fn contains(&self, position: u32) -> bool {
        self.positions.contains(position)
    }
    pub fn len(&self) -> usize {
        self.positions.len() as usize
    }
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
    pub fn intersect_with(&mut self, other: &Selection) {
        self.positions &= &other.positions;
    }
    pub fn union_with(&mut self, other: &Selection) {
        self.positions |= &other.positions;
    }
    /// The selected records, in collection order.
    pub fn records<'s, 'c, R: Record>(
        &'s self,
        collection: &'c Collection<R>,
    ) -> impl Iterator<Item = &'c R> + use<'s, 'c, R> {
        self.positions.iter().filter_map(move |p| collection.get(p))
    }
}
impl FromIterator<u32> for Selection {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

impl<R: Record> Collection<R> {
    /// Matching records, lazily and in collection order.
    pub fn filter<'c, P>(&'c self, predicate: P) -> impl Iterator<Item = &'c R> + use<'c, R, P>
    where
        P: Fn(&R) -> bool + 'c,
    {
        self.iter().filter(move |record| predicate(record))
    }
    pub fn select<P: Fn(&R) -> bool>(&self, predicate: P) -> Selection {
        self.iter()
            .enumerate()
            .filter(|(_, record)| predicate(record))
            .map(|(position, _)| position as u32)
            .collect()
    }
    /// Records whose `K` key is one of `keys`. Unknown keys select nothing.
    pub fn select_keyed<'k, K, I>(&self, keys: I) -> Selection
    where
        K: JoinKey + 'k,
        I: IntoIterator<Item = &'k K>,
    {
        keys.into_iter()
            .flat_map(|key| self.positions(key).iter().copied())
            .collect()
    }
    /// Records related through `K` to any of the `sources`.
    pub fn select_related<'s, K, S, I>(&self, sources: I) -> Selection
    where
        K: JoinKey,
        S: Record + 's,
        I: IntoIterator<Item = &'s S>,
    {
        let selection = self.select_keyed(sources.into_iter().filter_map(|source| K::of(source)));
        debug!(
            entity = R::ENTITY,
            key = K::FIELD,
            selected = selection.len(),
            "related records selected"
        );
        selection
    }
}

/// Equality against an optional field; absence never matches.
pub fn matches(field: Option<&str>, expected: &str) -> bool {
    field == Some(expected)
}

// ------------- Projection -------------
/// The fixed-shape view of a donor. Fields the donor does not carry come out
/// as explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfile {
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

impl From<&Donor> for DonorProfile {
    fn from(donor: &Donor) -> Self {
        Self {
            donor_id: donor.donor_id.clone(),
            patient_id: donor.patient_id.clone(),
            patient_uuid: donor.patient_uuid.clone(),
            bmi: donor.bmi,
            pre_menopause_cycle_type: donor.pre_menopause_cycle_type.clone(),
            pre_menopause_cycle_duration: donor.pre_menopause_cycle_duration,
            age: donor.age,
            gender: donor.gender.clone(),
            menstruation: donor.menstruation.clone(),
            occupation: donor.occupation.clone(),
            ethnicity: donor.ethnicity.clone(),
            height: donor.height,
            weight: donor.weight,
            diet: donor.diet.clone(),
            marital_status: donor.marital_status.clone(),
            number_of_children: donor.number_of_children,
            waist_circumference: donor.waist_circumference,
            baseline_hba1c: donor.baseline_hba1c,
            baseline_fpg: donor.baseline_fpg,
            race: donor.race.clone(),
            ethnicity_hispanic: donor.ethnicity_hispanic,
            asian_majority: donor.asian_majority,
            disease_duration: donor.disease_duration,
            indication: donor.indication.clone(),
            disease_entry_criteria: donor.disease_entry_criteria.clone(),
            overweight: donor.overweight,
            obesity_class_1: donor.obesity_class_1,
            obesity_class_2: donor.obesity_class_2,
            obesity_class_3: donor.obesity_class_3,
            diabetes: donor.diabetes,
            prediabetes: donor.prediabetes,
            dyslipidemia: donor.dyslipidemia,
            hypertension: donor.hypertension,
            depression: donor.depression,
            pcos: donor.pcos,
        }
    }
}

/// A donor annotated with the exposure it was selected by.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorWithExposure {
    #[serde(flatten)]
    pub donor: Donor,
    pub exposure_type: String,
}
