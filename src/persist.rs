//! Loading a dataset snapshot into a [`Store`].
//!
//! A snapshot is one JSON document with a top-level array per entity:
//!
//! ```json
//! {
//!   "Donor": [...], "Diagnosis": [...], "Exposure": [...], "Family": [...],
//!   "ClinicalHistory": [...], "Sample": [...], "Publications": [...],
//!   "Dataset": [...],
//!   "Assay": { "assayType": { "transcriptomics": {
//!       "rawCountData": [...], "normalisedData": [...] } } }
//! }
//! ```
//!
//! Absent or null sections load as empty collections. The store is stamped
//! with a blake3 digest of the source bytes so that snapshots can be told
//! apart in logs and status output.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::construct::{
    AssayMatrix, ClinicalHistory, Dataset, Diagnosis, Donor, Exposure, Family, Publication,
    Sample, null_as_empty,
};
use crate::error::{AnalyticsError, Result};
use crate::store::{Records, Store};

#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "Donor", default, deserialize_with = "null_as_empty")]
    pub donors: Vec<Donor>,
    #[serde(rename = "Diagnosis", default, deserialize_with = "null_as_empty")]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(rename = "Exposure", default, deserialize_with = "null_as_empty")]
    pub exposures: Vec<Exposure>,
    #[serde(rename = "Family", default, deserialize_with = "null_as_empty")]
    pub families: Vec<Family>,
    #[serde(rename = "ClinicalHistory", default, deserialize_with = "null_as_empty")]
    pub clinical_histories: Vec<ClinicalHistory>,
    #[serde(rename = "Sample", default, deserialize_with = "null_as_empty")]
    pub samples: Vec<Sample>,
    #[serde(rename = "Publications", alias = "Publication", default, deserialize_with = "null_as_empty")]
    pub publications: Vec<Publication>,
    #[serde(rename = "Dataset", default, deserialize_with = "null_as_empty")]
    pub datasets: Vec<Dataset>,
    #[serde(rename = "Assay", alias = "geneExpression", default)]
    pub assay: Option<AssaySection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssaySection {
    #[serde(rename = "assayType", default)]
    pub assay_type: Option<BTreeMap<String, AssayMatrix>>,
}

impl Snapshot {
    pub fn into_records(self) -> Records {
        Records {
            donors: self.donors,
            diagnoses: self.diagnoses,
            exposures: self.exposures,
            families: self.families,
            clinical_histories: self.clinical_histories,
            samples: self.samples,
            publications: self.publications,
            datasets: self.datasets,
            assays: self.assay.and_then(|a| a.assay_type).unwrap_or_default(),
        }
    }
}

pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Parses a snapshot and builds the indexed store from it.
pub fn from_slice(bytes: &[u8]) -> Result<Store> {
    let snapshot: Snapshot = serde_json::from_slice(bytes)?;
    let digest = digest(bytes);
    let store = Store::new(snapshot.into_records()).with_digest(digest);
    info!(
        digest = store.digest().unwrap_or("-"),
        donors = store.donors().len(),
        diagnoses = store.diagnoses().len(),
        exposures = store.exposures().len(),
        families = store.families().len(),
        clinical_histories = store.clinical_histories().len(),
        samples = store.samples().len(),
        assays = store.assay_names().count(),
        "snapshot loaded"
    );
    Ok(store)
}

pub fn from_str(text: &str) -> Result<Store> {
    from_slice(text.as_bytes())
}

pub fn load(path: impl AsRef<Path>) -> Result<Store> {
    let path = path.as_ref();
    info!(path = %path.display(), "reading snapshot");
    let bytes = fs::read(path)
        .map_err(|e| AnalyticsError::Load(format!("{}: {}", path.display(), e)))?;
    from_slice(&bytes)
}
