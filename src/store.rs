//! The read-only record store and the join resolver.
//!
//! A [`Store`] owns one [`Collection`] per entity type. Each collection keeps
//! its records in their original order together with lookups (similar to
//! database indexes) from every join key the records carry to their
//! positions. Lookups are built once when the store is put together and never
//! change afterwards, so a store can be shared freely between threads.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use chrono::{DateTime, Utc};
use seahash::SeaHasher;
use tracing::debug;

use crate::construct::{
    AssayMatrix, ClinicalHistory, Dataset, Diagnosis, Donor, Exposure, Family, Publication, Record,
    Sample,
};
use crate::datatype::{DonorId, JoinKey, PatientId, SampleId};
use crate::expression::Assay;

pub type KeyHasher = BuildHasherDefault<SeaHasher>;

// ------------- Lookups -------------
#[derive(Debug)]
pub struct Lookup<K, V, H = KeyHasher> {
    index: HashMap<K, Vec<V>, H>,
}
impl<K: Eq + Hash, V, H: BuildHasher + Default> Lookup<K, V, H> {
    pub fn new() -> Self {
        Self {
            index: HashMap::<K, Vec<V>, H>::default(),
        }
    }
    pub fn insert(&mut self, key: K, value: V) {
        self.index.entry(key).or_default().push(value);
    }
    /// Everything kept under the key, in insertion order. Empty when unknown.
    pub fn lookup(&self, key: &K) -> &[V] {
        self.index.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
    pub fn first(&self, key: &K) -> Option<&V> {
        self.lookup(key).first()
    }
    pub fn len(&self) -> usize {
        self.index.len()
    }
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
impl<K: Eq + Hash, V, H: BuildHasher + Default> Default for Lookup<K, V, H> {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Collection -------------
#[derive(Debug)]
pub struct Collection<R> {
    records: Vec<R>,
    pub(crate) by_donor: Lookup<DonorId, u32>,
    pub(crate) by_patient: Lookup<PatientId, u32>,
    pub(crate) by_sample: Lookup<SampleId, u32>,
}
impl<R: Record> Collection<R> {
    pub fn new(records: Vec<R>) -> Self {
        let mut by_donor = Lookup::new();
        let mut by_patient = Lookup::new();
        let mut by_sample = Lookup::new();
        for (position, record) in records.iter().enumerate() {
            let position = position as u32;
            if let Some(key) = record.donor_id() {
                by_donor.insert(key.clone(), position);
            }
            if let Some(key) = record.patient_id() {
                by_patient.insert(key.clone(), position);
            }
            if let Some(key) = record.sample_id() {
                by_sample.insert(key.clone(), position);
            }
        }
        debug!(
            entity = R::ENTITY,
            records = records.len(),
            donor_keys = by_donor.len(),
            patient_keys = by_patient.len(),
            sample_keys = by_sample.len(),
            "collection indexed"
        );
        Self {
            records,
            by_donor,
            by_patient,
            by_sample,
        }
    }
    pub fn records(&self) -> &[R] {
        &self.records
    }
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }
    pub fn get(&self, position: u32) -> Option<&R> {
        self.records.get(position as usize)
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    /// Positions of the records carrying the key, in collection order.
    pub fn positions<K: JoinKey>(&self, key: &K) -> &[u32] {
        K::index(self).lookup(key)
    }
    /// The first record whose key field equals `key`.
    pub fn related<K: JoinKey>(&self, key: &K) -> Option<&R> {
        K::index(self).first(key).and_then(|p| self.get(*p))
    }
    /// Every record whose key field equals `key`, in collection order.
    pub fn related_all<'c, K: JoinKey>(&'c self, key: &K) -> impl Iterator<Item = &'c R> + use<'c, R, K> {
        self.positions(key).iter().filter_map(move |p| self.get(*p))
    }
    /// The first record sharing the `K` key of `source`. A source without the
    /// key has no related record.
    pub fn related_of<K: JoinKey, S: Record>(&self, source: &S) -> Option<&R> {
        K::of(source).and_then(|key| self.related(key))
    }
}
impl<'c, R> IntoIterator for &'c Collection<R> {
    type Item = &'c R;
    type IntoIter = std::slice::Iter<'c, R>;
    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ------------- Store -------------
/// Everything a snapshot is made of, prior to indexing.
#[derive(Debug, Default)]
pub struct Records {
    pub donors: Vec<Donor>,
    pub diagnoses: Vec<Diagnosis>,
    pub exposures: Vec<Exposure>,
    pub families: Vec<Family>,
    pub clinical_histories: Vec<ClinicalHistory>,
    pub samples: Vec<Sample>,
    pub publications: Vec<Publication>,
    pub datasets: Vec<Dataset>,
    pub assays: BTreeMap<String, AssayMatrix>,
}

/// An immutable, indexed snapshot of the dataset.
#[derive(Debug)]
pub struct Store {
    donors: Collection<Donor>,
    diagnoses: Collection<Diagnosis>,
    exposures: Collection<Exposure>,
    families: Collection<Family>,
    clinical_histories: Collection<ClinicalHistory>,
    samples: Collection<Sample>,
    publications: Collection<Publication>,
    datasets: Collection<Dataset>,
    assays: BTreeMap<String, Assay>,
    digest: Option<String>,
    created_at: DateTime<Utc>,
}

impl Store {
    pub fn new(records: Records) -> Self {
        let assays = records
            .assays
            .into_iter()
            .map(|(name, matrix)| {
                let assay = Assay::new(name.clone(), matrix);
                (name, assay)
            })
            .collect();
        Self {
            donors: Collection::new(records.donors),
            diagnoses: Collection::new(records.diagnoses),
            exposures: Collection::new(records.exposures),
            families: Collection::new(records.families),
            clinical_histories: Collection::new(records.clinical_histories),
            samples: Collection::new(records.samples),
            publications: Collection::new(records.publications),
            datasets: Collection::new(records.datasets),
            assays,
            digest: None,
            created_at: Utc::now(),
        }
    }
    pub fn empty() -> Self {
        Self::new(Records::default())
    }
    pub fn with_digest(mut self, digest: String) -> Self {
        self.digest = Some(digest);
        self
    }
    // functions to access the owned collections
    pub fn donors(&self) -> &Collection<Donor> {
        &self.donors
    }
    pub fn diagnoses(&self) -> &Collection<Diagnosis> {
        &self.diagnoses
    }
    pub fn exposures(&self) -> &Collection<Exposure> {
        &self.exposures
    }
    pub fn families(&self) -> &Collection<Family> {
        &self.families
    }
    pub fn clinical_histories(&self) -> &Collection<ClinicalHistory> {
        &self.clinical_histories
    }
    pub fn samples(&self) -> &Collection<Sample> {
        &self.samples
    }
    pub fn publications(&self) -> &Collection<Publication> {
        &self.publications
    }
    pub fn datasets(&self) -> &Collection<Dataset> {
        &self.datasets
    }
    pub fn assay(&self, name: &str) -> Option<&Assay> {
        self.assays.get(name)
    }
    pub fn assay_names(&self) -> impl Iterator<Item = &str> {
        self.assays.keys().map(String::as_str)
    }
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // joins that more than one operation walks through
    /// Sample → diagnosis of the sample's patient.
    pub fn diagnosis_of_sample(&self, sample_id: &SampleId) -> Option<&Diagnosis> {
        let sample = self.samples.related(sample_id)?;
        self.diagnoses.related_of::<PatientId, _>(sample)
    }
    /// The tumor stage a sample was taken at, through its patient's diagnosis.
    pub fn tumor_stage_of_sample(&self, sample_id: &SampleId) -> Option<&str> {
        self.diagnosis_of_sample(sample_id)?.tumor_stage()
    }
    /// The donor a record points at through its `donor_id`.
    pub fn donor_of<S: Record>(&self, source: &S) -> Option<&Donor> {
        self.donors.related_of::<DonorId, _>(source)
    }
}
