//! Named-operation interface over the current snapshot.
//!
//! Callers hand in an operation name and a JSON object of arguments and get a
//! JSON value back. The interface owns the current [`Store`] behind an
//! `Arc`; every query clones the `Arc` once and runs against that snapshot
//! from start to end, so a concurrent [`QueryInterface::swap`] never shows a
//! query half of one dataset and half of another.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::{AnalyticsError, Result};
use crate::expression::DEFAULT_ASSAY_TYPE;
use crate::store::Store;

// ------------- Operations -------------
macro_rules! operations {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Every operation the interface answers, by its public name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $($variant),*
        }
        impl Operation {
            pub const ALL: &'static [Operation] = &[$(Operation::$variant),*];
            pub fn name(&self) -> &'static str {
                match self {
                    $(Operation::$variant => $name),*
                }
            }
        }
        impl FromStr for Operation {
            type Err = AnalyticsError;
            fn from_str(name: &str) -> Result<Self> {
                match name {
                    $($name => Ok(Operation::$variant),)*
                    _ => Err(AnalyticsError::UnknownOperation(name.to_owned())),
                }
            }
        }
    };
}

operations! {
    Appname => "appname",
    GetAllDonors => "getAllDonors",
    GetAllExposures => "getAllExposures",
    GetAllFamily => "getAllFamily",
    GetAllClinicalHistory => "getAllClinicalHistory",
    GetAllDiagnosis => "getAllDiagnosis",
    GetAllPublication => "getAllPublication",
    GetAllDatasets => "getAllDatasets",
    DonorsCountByCancerSite => "donorsCountByCancerSite",
    DonorsWithDiabetesCount => "donorsWithDiabetesCount",
    GetDonorById => "getDonorById",
    GetDonorsWithCondition => "getDonorsWithCondition",
    GetDonorsWithExposure => "getDonorsWithExposure",
    DonorDemographics => "donorDemographics",
    AgeDistributionOfDiagnosedDonors => "ageDistributionOfDiagnosedDonors",
    EthnicityAndDiseasePrevalence => "ethnicityAndDiseasePrevalence",
    GenderBasedExposureAnalysis => "genderBasedExposureAnalysis",
    DiagnosisByEthnicity => "diagnosisByEthnicity",
    DiseaseDistributionByGender => "diseaseDistributionByGender",
    ExposureAndLifestyle => "exposureAndLifestyle",
    GetPatientDistribution => "getPatientDistribution",
    FamilyHistoryAnalysis => "familyHistoryAnalysis",
    FamilyHistoryAndHereditaryFactors => "familyHistoryAndHereditaryFactors",
    CancerSiteAndFamilyHistoryAnalysis => "cancerSiteAndFamilyHistoryAnalysis",
    ChemotherapyAdverseEventsAnalysis => "chemotherapyAdverseEventsAnalysis",
    ChemotherapyAdverseEventsSummary => "chemotherapyAdverseEventsSummary",
    SurgeryAdverseEventsAnalysis => "surgeryAdverseEventsAnalysis",
    OncologySummary => "oncologySummary",
    PerformanceStatusAndSurvivalAnalysis => "performanceStatusAndSurvivalAnalysis",
    ExpressionByGeneId => "expressionByGeneId",
    ExpressionByRegimen => "expressionByRegimen",
    TopNGenesByTumorStage => "topNGenesByTumorStage",
    GetSampleIdsByTumorStage => "getSampleIdsByTumorStage",
    GetGeneExpressionByTumorStage => "getGeneExpressionByTumorStage",
    GetExpressionCorrelationForGene => "getExpressionCorrelationForGene",
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ------------- Arguments -------------
/// Named arguments of one call. Getters check presence and JSON type.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Map<String, Value>,
}
impl Arguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }
    /// Accepts a JSON object, or null for "no arguments".
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(values) => Ok(Self::new(values.clone())),
            other => Err(AnalyticsError::InvalidArgument(format!(
                "arguments must be an object, got {}",
                other
            ))),
        }
    }
    fn get(&self, name: &str) -> Result<&Value> {
        match self.values.get(name) {
            None | Some(Value::Null) => Err(AnalyticsError::InvalidArgument(format!(
                "missing argument '{}'",
                name
            ))),
            Some(value) => Ok(value),
        }
    }
    fn mistyped(name: &str, expected: &str, value: &Value) -> AnalyticsError {
        AnalyticsError::InvalidArgument(format!(
            "argument '{}' must be {}, got {}",
            name, expected, value
        ))
    }
    pub fn text(&self, name: &str) -> Result<&str> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| Self::mistyped(name, "a string", value))
    }
    /// A string, or an integer rendered in decimal.
    pub fn identifier(&self, name: &str) -> Result<String> {
        match self.get(name)? {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) if number.is_i64() || number.is_u64() => Ok(number.to_string()),
            other => Err(Self::mistyped(name, "a string or an integer", other)),
        }
    }
    pub fn count(&self, name: &str) -> Result<usize> {
        let value = self.get(name)?;
        value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Self::mistyped(name, "a non-negative integer", value))
    }
    pub fn texts(&self, name: &str) -> Result<Vec<&str>> {
        let value = self.get(name)?;
        let items = value
            .as_array()
            .ok_or_else(|| Self::mistyped(name, "a list of strings", value))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| Self::mistyped(name, "a list of strings", value))
            })
            .collect()
    }
}

// ------------- Status -------------
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub name: String,
    pub digest: Option<String>,
    pub loaded_at: String,
    pub donors: usize,
    pub diagnoses: usize,
    pub exposures: usize,
    pub families: usize,
    pub clinical_histories: usize,
    pub samples: usize,
    pub assays: Vec<String>,
}

// ------------- Interface -------------
/// Opaque query identifier, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(u64);
impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

pub struct QueryInterface {
    store: RwLock<Arc<Store>>,
    assay_type: String,
    next_id: AtomicU64,
}

impl QueryInterface {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store: RwLock::new(store),
            assay_type: DEFAULT_ASSAY_TYPE.to_owned(),
            next_id: AtomicU64::new(0),
        }
    }
    pub fn with_assay_type(mut self, assay_type: impl Into<String>) -> Self {
        self.assay_type = assay_type.into();
        self
    }
    fn allocate_id(&self) -> QueryId {
        QueryId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// The snapshot queries currently run against.
    pub fn snapshot(&self) -> Arc<Store> {
        // the guarded value is a single Arc, which cannot be left half written
        let guard = self.store.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replaces the whole snapshot and hands back the previous one. Queries
    /// already running finish on the snapshot they started with.
    pub fn swap(&self, store: Arc<Store>) -> Arc<Store> {
        let mut guard = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, store);
        info!(
            previous = previous.digest().unwrap_or("-"),
            current = guard.digest().unwrap_or("-"),
            donors = guard.donors().len(),
            "snapshot swapped"
        );
        previous
    }

    pub fn status(&self) -> Status {
        let store = self.snapshot();
        Status {
            name: Engine::new(&store).appname(),
            digest: store.digest().map(str::to_owned),
            loaded_at: store.created_at().to_rfc3339(),
            donors: store.donors().len(),
            diagnoses: store.diagnoses().len(),
            exposures: store.exposures().len(),
            families: store.families().len(),
            clinical_histories: store.clinical_histories().len(),
            samples: store.samples().len(),
            assays: store.assay_names().map(str::to_owned).collect(),
        }
    }

    /// Runs one named operation against the current snapshot.
    pub fn execute(&self, operation: &str, arguments: &Value) -> Result<Value> {
        let operation = operation.parse::<Operation>()?;
        let arguments = Arguments::from_value(arguments)?;
        self.run(operation, &arguments)
    }

    pub fn run(&self, operation: Operation, arguments: &Arguments) -> Result<Value> {
        let id = self.allocate_id();
        let store = self.snapshot();
        let engine = Engine::new(&store).with_assay_type(self.assay_type.as_str());
        debug!(query = %id, %operation, "query started");
        let started = Instant::now();
        let result = dispatch(&engine, operation, arguments);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(_) => info!(query = %id, %operation, elapsed_ms, "query answered"),
            Err(e) => warn!(query = %id, %operation, elapsed_ms, error = %e, "query failed"),
        }
        result
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| AnalyticsError::DataIntegrity(format!("result could not be serialized: {}", e)))
}

fn dispatch(engine: &Engine, operation: Operation, args: &Arguments) -> Result<Value> {
    use Operation::*;
    match operation {
        Appname => to_json(engine.appname()),
        GetAllDonors => to_json(engine.all_donors()),
        GetAllExposures => to_json(engine.all_exposures()),
        GetAllFamily => to_json(engine.all_families()),
        GetAllClinicalHistory => to_json(engine.all_clinical_histories()),
        GetAllDiagnosis => to_json(engine.all_diagnoses()),
        GetAllPublication => to_json(engine.all_publications()),
        GetAllDatasets => to_json(engine.all_datasets()),
        DonorsCountByCancerSite => to_json(engine.donors_count_by_cancer_site(args.text("cancerSite")?)),
        DonorsWithDiabetesCount => to_json(engine.donors_with_diabetes_count()),
        GetDonorById => to_json(engine.donor_by_id(&args.identifier("donor_id")?)?),
        GetDonorsWithCondition => to_json(engine.donors_with_condition(args.text("indication")?)),
        GetDonorsWithExposure => to_json(engine.donors_with_exposure(args.text("exposureType")?)),
        DonorDemographics => to_json(engine.donor_demographics()),
        AgeDistributionOfDiagnosedDonors => to_json(engine.age_distribution_of_diagnosed_donors()),
        EthnicityAndDiseasePrevalence => {
            to_json(engine.ethnicity_and_disease_prevalence(args.text("ethnicity")?))
        }
        GenderBasedExposureAnalysis => to_json(engine.gender_based_exposure_analysis(args.text("gender")?)),
        DiagnosisByEthnicity => to_json(engine.diagnosis_by_ethnicity(args.text("ethnicity")?)),
        DiseaseDistributionByGender => to_json(engine.disease_distribution_by_gender()),
        ExposureAndLifestyle => to_json(engine.exposure_and_lifestyle()),
        GetPatientDistribution => to_json(engine.patient_distribution()),
        FamilyHistoryAnalysis => to_json(engine.family_history_analysis(args.text("cancerSite")?)),
        FamilyHistoryAndHereditaryFactors => to_json(engine.family_history_and_hereditary_factors()),
        CancerSiteAndFamilyHistoryAnalysis => {
            to_json(engine.cancer_site_and_family_history_analysis(args.text("cancerSite")?))
        }
        ChemotherapyAdverseEventsAnalysis => {
            to_json(engine.chemotherapy_adverse_events_analysis(args.text("selectedRegimen")?))
        }
        ChemotherapyAdverseEventsSummary => to_json(engine.chemotherapy_adverse_events_summary()),
        SurgeryAdverseEventsAnalysis => {
            to_json(engine.surgery_adverse_events_analysis(args.text("surgeryName")?))
        }
        OncologySummary => to_json(engine.oncology_summary(args.text("cancerSite")?)),
        PerformanceStatusAndSurvivalAnalysis => {
            to_json(engine.performance_status_and_survival_analysis(args.text("disease")?))
        }
        ExpressionByGeneId => to_json(engine.expression_by_gene_id(args.text("geneSymbol")?)?),
        ExpressionByRegimen => to_json(engine.expression_by_regimen(args.text("regimen")?)?),
        TopNGenesByTumorStage => to_json(engine.top_genes_by_tumor_stage(args.count("n")?)?),
        GetSampleIdsByTumorStage => to_json(engine.sample_ids_by_tumor_stage()),
        GetGeneExpressionByTumorStage => to_json(engine.gene_expression_by_tumor_stage()?),
        GetExpressionCorrelationForGene => to_json(
            engine.expression_correlation_for_gene(&args.texts("assayTypes")?, args.text("geneSymbol")?)?,
        ),
    }
}
