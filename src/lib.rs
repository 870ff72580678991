//! cptac-analytics – join-and-aggregate analytics over a clinical trial dataset.
//!
//! The dataset describes trial donors together with their diagnoses,
//! treatment events, family history, lifestyle exposures and gene-expression
//! assays. It is loaded once into an immutable, indexed [`store::Store`] and
//! then queried through a fixed set of named operations, each of which joins
//! a few collections by a shared identifier, filters them, and reduces the
//! result to summary statistics.
//!
//! ## Modules
//! * [`datatype`] – Identifier newtypes (`DonorId`, `PatientId`, `SampleId`)
//!   and the [`datatype::JoinKey`] trait the join resolver is generic over.
//! * [`construct`] – The records themselves, including the treatment event
//!   tagged union attached to a diagnosis.
//! * [`store`] – Collections with per-key lookups, the join resolver, and the
//!   snapshot that owns them.
//! * [`filter`] – Predicate filtering, bitmap selections and the donor
//!   projection.
//! * [`aggregate`] – Percentages, guarded means, modes and grouping.
//! * [`expression`] – Tumor-stage grouping, top-N ranking and correlation
//!   over the assay matrices.
//! * [`engine`] – One method per named operation.
//! * [`interface`] – Operation dispatch by name plus atomic snapshot swap.
//! * [`persist`] – JSON snapshot loading.
//! * [`settings`] – Layered configuration.
//! * [`server`] – A thin HTTP surface over the interface.
//!
//! ## Empty results and failures
//! An operation whose filter matches nothing answers with `None` (JSON
//! `null`) where that is a meaningful answer. Identifiers that must exist,
//! such as a gene symbol or a donor id, fail with
//! [`error::AnalyticsError::NotFound`], and statistics that cannot be
//! computed from the data at hand fail with
//! [`error::AnalyticsError::InvalidArgument`].
//!
//! ## Quick Start
//! ```
//! use cptac_analytics::{engine::Engine, persist};
//! let store = persist::from_str(r#"{
//!     "Donor": [{ "donor_id": "1", "gender": "Male", "age": 40 }],
//!     "Diagnosis": [{ "donor_id": "1", "disease": { "cancerSite": "Breast" } }]
//! }"#).unwrap();
//! let engine = Engine::new(&store);
//! let breast = engine.donors_count_by_cancer_site("Breast").unwrap();
//! assert_eq!(breast.total_donors, 1);
//! assert!(engine.donors_count_by_cancer_site("Lung").is_none());
//! ```

pub mod aggregate;
pub mod construct;
pub mod datatype;
pub mod engine;
pub mod error;
pub mod expression;
pub mod filter;
pub mod interface;
pub mod persist;
pub mod server;
pub mod settings;
pub mod store;

pub use error::{AnalyticsError, Result};
