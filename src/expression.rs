//! Gene-expression analytics over the assay matrices.
//!
//! An [`Assay`] wraps the raw and normalised matrices of one assay type and
//! keeps a bidirectional map between gene symbols and matrix rows, so genes
//! can be found by symbol and rows can be labelled without another scan.
//! Samples are tied to tumor stages through `Sample → Diagnosis` on the
//! patient key; samples that cannot be tied to a stage are left out of the
//! stage-based analyses.

use std::collections::{HashMap, HashSet};

use bimap::BiMap;
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{self, mean_or_zero};
use crate::construct::{AssayMatrix, ExpressionPoint, GeneExpression};
use crate::datatype::{DonorId, PatientId, SampleId};
use crate::error::{AnalyticsError, Result};
use crate::store::{KeyHasher, Store};

pub const DEFAULT_ASSAY_TYPE: &str = "transcriptomics";

/// Tumor stage label that marks "no staging" in the dataset.
const UNSTAGED: &str = "none";

// ------------- Assay -------------
#[derive(Debug)]
pub struct Assay {
    name: String,
    matrix: AssayMatrix,
    raw_rows: BiMap<String, u32>,
    normalised_rows: BiMap<String, u32>,
}

// A symbol maps to the first row it labels; rows repeating a symbol are
// reached through that first row.
fn rows_of(genes: &[GeneExpression]) -> BiMap<String, u32> {
    let mut rows = BiMap::new();
    for (row, gene) in genes.iter().enumerate() {
        if rows.insert_no_overwrite(gene.gene_symbol.clone(), row as u32).is_err() {
            debug!(gene = %gene.gene_symbol, row, "gene symbol repeated in matrix");
        }
    }
    rows
}

impl Assay {
    pub fn new(name: String, matrix: AssayMatrix) -> Self {
        let raw_rows = rows_of(&matrix.raw_count_data);
        let normalised_rows = rows_of(&matrix.normalised_data);
        Self {
            name,
            matrix,
            raw_rows,
            normalised_rows,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn raw_count_data(&self) -> &[GeneExpression] {
        &self.matrix.raw_count_data
    }
    pub fn normalised_data(&self) -> &[GeneExpression] {
        &self.matrix.normalised_data
    }
    pub fn raw(&self, symbol: &str) -> Option<&GeneExpression> {
        self.raw_rows
            .get_by_left(symbol)
            .and_then(|row| self.matrix.raw_count_data.get(*row as usize))
    }
    pub fn normalised(&self, symbol: &str) -> Option<&GeneExpression> {
        self.normalised_rows
            .get_by_left(symbol)
            .and_then(|row| self.matrix.normalised_data.get(*row as usize))
    }
    /// The first normalised row labelled with the symbol.
    pub fn normalised_row(&self, symbol: &str) -> Option<u32> {
        self.normalised_rows.get_by_left(symbol).copied()
    }
    /// The gene symbol labelling a normalised row.
    pub fn symbol(&self, row: u32) -> Option<&str> {
        self.normalised_rows.get_by_right(&row).map(String::as_str)
    }
    /// The normalised value of every gene measured on the sample, in matrix
    /// order. A gene measured twice on the same sample reports its first value.
    pub fn normalised_for_sample(&self, sample_id: &SampleId) -> Vec<GeneValue> {
        self.matrix
            .normalised_data
            .iter()
            .filter_map(|gene| {
                gene.expression_data
                    .iter()
                    .find(|point| &point.sample_id == sample_id)
                    .map(|point| GeneValue {
                        gene_symbol: gene.gene_symbol.clone(),
                        expression_value: point.expression_value,
                    })
            })
            .collect()
    }
}

// ------------- Result shapes -------------
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleValue {
    pub sample_id: SampleId,
    pub expression_value: f64,
}
impl From<&ExpressionPoint> for SampleValue {
    fn from(point: &ExpressionPoint) -> Self {
        Self {
            sample_id: point.sample_id.clone(),
            expression_value: point.expression_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneValue {
    pub gene_symbol: String,
    // kept in the dataset's spelling
    #[serde(rename = "expression_value")]
    pub expression_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneExpressionProfile {
    pub gene_symbol: String,
    pub assay_type: String,
    pub raw_count_data: Vec<ExpressionPoint>,
    pub normalised_data: Vec<ExpressionPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimenExpression {
    pub regimen: String,
    pub assay_type: String,
    pub sample_ids: Vec<SampleId>,
    pub raw_count_data: Vec<GeneExpression>,
    pub normalised_data: Vec<GeneExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedGene {
    pub gene_symbol: String,
    pub samples: Vec<SampleValue>,
    pub average_expression: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTopGenes {
    pub tumor_stage: String,
    pub top_genes: Vec<RankedGene>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSamples {
    pub tumor_stage: String,
    pub sample_ids: Vec<SampleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleExpression {
    pub sample_id: SampleId,
    pub normalised_data: Vec<GeneValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageExpression {
    pub tumor_stage: String,
    pub gene_expression: Vec<SampleExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssayExpression {
    #[serde(rename = "AssayType")]
    pub assay_type: String,
    #[serde(rename = "expressionData")]
    pub expression_data: Vec<SampleValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionCorrelation {
    #[serde(rename = "geneSymbol")]
    pub gene_symbol: String,
    #[serde(rename = "correlationValue")]
    pub correlation_value: f64,
    #[serde(rename = "AssayData")]
    pub assay_data: Vec<AssayExpression>,
}

// ------------- Analytics -------------
/// Both matrices of one gene. The gene has to be in at least one of them.
pub fn gene_profile(assay: &Assay, gene_symbol: &str) -> Result<GeneExpressionProfile> {
    let raw = assay.raw(gene_symbol);
    let normalised = assay.normalised(gene_symbol);
    if raw.is_none() && normalised.is_none() {
        return Err(AnalyticsError::not_found("Gene", gene_symbol));
    }
    let points = |gene: Option<&GeneExpression>| {
        gene.map(|g| g.expression_data.clone()).unwrap_or_default()
    };
    Ok(GeneExpressionProfile {
        gene_symbol: gene_symbol.to_owned(),
        assay_type: assay.name().to_owned(),
        raw_count_data: points(raw),
        normalised_data: points(normalised),
    })
}

/// Expression restricted to the samples of donors treated with `regimen`.
///
/// Diagnoses with a chemotherapy event on that regimen lead to their donors,
/// and each donor's first exposure record carries the sample that was taken.
pub fn expression_by_regimen(store: &Store, assay: &Assay, regimen: &str) -> RegimenExpression {
    let treated = store.diagnoses().filter(|diagnosis| {
        diagnosis
            .chemotherapy()
            .and_then(|details| details.selected_regimen.as_deref())
            == Some(regimen)
    });
    let sample_ids: Vec<SampleId> = aggregate::distinct(treated.filter_map(|diagnosis| {
        store
            .exposures()
            .related_of::<DonorId, _>(diagnosis)
            .and_then(|exposure| exposure.sample_id.clone())
    }));
    let restrict = |genes: &[GeneExpression]| -> Vec<GeneExpression> {
        genes
            .iter()
            .map(|gene| GeneExpression {
                gene_symbol: gene.gene_symbol.clone(),
                expression_data: gene
                    .expression_data
                    .iter()
                    .filter(|point| sample_ids.contains(&point.sample_id))
                    .cloned()
                    .collect(),
            })
            .collect()
    };
    RegimenExpression {
        regimen: regimen.to_owned(),
        assay_type: assay.name().to_owned(),
        raw_count_data: restrict(assay.raw_count_data()),
        normalised_data: restrict(assay.normalised_data()),
        sample_ids,
    }
}

/// The `n` genes with the highest mean normalised expression per tumor stage.
///
/// Points are grouped by `(gene, tumor stage)` in the order they are met;
/// matrix rows that repeat a gene symbol fall into the same group.
/// Stages come out in lexicographic order. Within a stage genes are ranked by
/// descending mean, and equal means keep their grouping order.
pub fn top_genes_by_tumor_stage(store: &Store, assay: &Assay, n: usize) -> Vec<StageTopGenes> {
    // rows sharing a symbol are grouped under the symbol's first row
    let points = assay.normalised_data().iter().flat_map(|gene| {
        let row = assay.normalised_row(&gene.gene_symbol);
        gene.expression_data.iter().map(move |point| (row, point))
    });
    let groups = aggregate::group_by(points, |(row, point)| {
        let row = (*row)?;
        store
            .tumor_stage_of_sample(&point.sample_id)
            .map(|stage| (row, stage.to_owned()))
    });

    let mut ranked: Vec<(String, RankedGene)> = groups
        .into_iter()
        .filter_map(|((row, stage), points)| {
            let gene_symbol = assay.symbol(row)?.to_owned();
            let samples: Vec<SampleValue> = points.iter().map(|(_, point)| SampleValue::from(*point)).collect();
            let average_expression = mean_or_zero(samples.iter().map(|s| s.expression_value));
            Some((
                stage,
                RankedGene {
                    gene_symbol,
                    samples,
                    average_expression,
                },
            ))
        })
        .collect();
    // sort_by is stable, which keeps grouping order among equal means
    ranked.sort_by(|(stage_a, a), (stage_b, b)| {
        stage_a
            .cmp(stage_b)
            .then_with(|| b.average_expression.total_cmp(&a.average_expression))
    });

    let mut stages: Vec<StageTopGenes> = Vec::new();
    for (stage, gene) in ranked {
        match stages.last_mut() {
            Some(last) if last.tumor_stage == stage => {
                if last.top_genes.len() < n {
                    last.top_genes.push(gene);
                }
            }
            _ => {
                let top_genes = if n > 0 { vec![gene] } else { Vec::new() };
                stages.push(StageTopGenes {
                    tumor_stage: stage,
                    top_genes,
                });
            }
        }
    }
    stages
}

// Diagnoses that have a real tumor stage, each with the first sample of its
// patient, grouped by stage in first-seen order.
fn staged_samples(store: &Store) -> Vec<(String, Vec<SampleId>)> {
    let staged = store.diagnoses().iter().filter_map(|diagnosis| {
        let stage = diagnosis.tumor_stage().filter(|stage| *stage != UNSTAGED)?;
        let sample = store.samples().related_of::<PatientId, _>(diagnosis)?;
        Some((stage.to_owned(), sample.sample_id.clone()))
    });
    aggregate::group_by(staged, |(stage, _)| Some(stage.clone()))
        .into_iter()
        .map(|(stage, members)| (stage, members.into_iter().map(|(_, sample)| sample).collect()))
        .collect()
}

pub fn sample_ids_by_tumor_stage(store: &Store) -> Vec<StageSamples> {
    staged_samples(store)
        .into_iter()
        .map(|(tumor_stage, sample_ids)| StageSamples {
            tumor_stage,
            sample_ids,
        })
        .collect()
}

pub fn gene_expression_by_tumor_stage(store: &Store, assay: &Assay) -> Vec<StageExpression> {
    staged_samples(store)
        .into_iter()
        .map(|(tumor_stage, sample_ids)| StageExpression {
            tumor_stage,
            gene_expression: sample_ids
                .into_iter()
                .map(|sample_id| SampleExpression {
                    normalised_data: assay.normalised_for_sample(&sample_id),
                    sample_id,
                })
                .collect(),
        })
        .collect()
}

/// Pearson correlation of one gene's normalised expression across two assays.
///
/// Samples are matched by id; the pairs follow the order of the first assay.
/// A gene missing from an assay contributes no points.
pub fn correlation<S: AsRef<str>>(
    store: &Store,
    assay_types: &[S],
    gene_symbol: &str,
) -> Result<ExpressionCorrelation> {
    let [first, second] = assay_types else {
        return Err(AnalyticsError::InvalidArgument(format!(
            "exactly two assay types are required for a correlation, got {}",
            assay_types.len()
        )));
    };
    let assay = |name: &str| {
        store
            .assay(name)
            .ok_or_else(|| AnalyticsError::not_found("Assay", name))
    };
    let (first, second) = (assay(first.as_ref())?, assay(second.as_ref())?);
    let points = |assay: &Assay| -> Vec<ExpressionPoint> {
        assay
            .normalised(gene_symbol)
            .map(|gene| gene.expression_data.clone())
            .unwrap_or_default()
    };
    let (left, right) = (points(first), points(second));

    let mut right_by_sample: HashMap<&SampleId, f64, KeyHasher> = HashMap::default();
    for point in &right {
        right_by_sample
            .entry(&point.sample_id)
            .or_insert(point.expression_value);
    }
    let mut paired: HashSet<&SampleId, KeyHasher> = HashSet::default();
    let mut aligned_left = Vec::new();
    let mut aligned_right = Vec::new();
    for point in &left {
        let Some(value) = right_by_sample.get(&point.sample_id) else { continue };
        if !paired.insert(&point.sample_id) {
            continue;
        }
        aligned_left.push(SampleValue::from(point));
        aligned_right.push(SampleValue {
            sample_id: point.sample_id.clone(),
            expression_value: *value,
        });
    }
    if aligned_left.len() < 2 {
        return Err(AnalyticsError::InvalidArgument(format!(
            "at least two samples measured in both {} and {} are required to correlate {}, found {}",
            first.name(),
            second.name(),
            gene_symbol,
            aligned_left.len()
        )));
    }

    let xs: Vec<f64> = aligned_left.iter().map(|s| s.expression_value).collect();
    let ys: Vec<f64> = aligned_right.iter().map(|s| s.expression_value).collect();
    let correlation_value = pearson(&xs, &ys).ok_or_else(|| {
        AnalyticsError::InvalidArgument(format!(
            "expression of {} is constant in {} or {}, correlation is undefined",
            gene_symbol,
            first.name(),
            second.name()
        ))
    })?;

    Ok(ExpressionCorrelation {
        gene_symbol: gene_symbol.to_owned(),
        correlation_value,
        assay_data: vec![
            AssayExpression {
                assay_type: first.name().to_owned(),
                expression_data: aligned_left,
            },
            AssayExpression {
                assay_type: second.name().to_owned(),
                expression_data: aligned_right,
            },
        ],
    })
}

/// Sample Pearson correlation coefficient of two equally long sequences.
///
/// `None` when there are fewer than two pairs, the lengths differ, or either
/// side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut co_moment, mut m2_x, mut m2_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        co_moment += dx * dy;
        m2_x += dx * dx;
        m2_y += dy * dy;
    }
    let div = (m2_x * m2_y).sqrt();
    if div == 0.0 || !div.is_finite() {
        return None;
    }
    Some((co_moment / div).clamp(-1.0, 1.0))
}
