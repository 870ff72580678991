mod common;

use common::{setup, store_from};
use cptac_analytics::AnalyticsError;
use cptac_analytics::engine::Engine;
use cptac_analytics::expression::pearson;
use serde_json::json;

fn symbols_and_means(genes: &[cptac_analytics::expression::RankedGene]) -> Vec<(&str, f64)> {
    genes
        .iter()
        .map(|g| (g.gene_symbol.as_str(), g.average_expression))
        .collect()
}

#[test]
fn expression_by_gene_id() {
    let store = setup();
    let engine = Engine::new(&store);
    let tp53 = engine.expression_by_gene_id("TP53").expect("TP53 is measured");
    assert_eq!(tp53.assay_type, "transcriptomics");
    assert_eq!(tp53.raw_count_data.len(), 3);
    assert_eq!(tp53.normalised_data.len(), 3);
    assert_eq!(tp53.normalised_data[2].expression_value, 3.0);

    // only normalised: raw side comes out empty
    let egfr = engine.expression_by_gene_id("EGFR").expect("EGFR is measured");
    assert!(egfr.raw_count_data.is_empty());
    assert_eq!(egfr.normalised_data.len(), 3);

    let err = engine.expression_by_gene_id("XYZ").unwrap_err();
    assert!(matches!(err, AnalyticsError::NotFound { entity: "Gene", .. }));
}

#[test]
fn expression_reads_configured_assay() {
    let store = setup();
    let proteomics = Engine::new(&store).with_assay_type("proteomics");
    let tp53 = proteomics.expression_by_gene_id("TP53").expect("TP53 in proteomics");
    assert_eq!(tp53.assay_type, "proteomics");
    assert_eq!(tp53.normalised_data.len(), 4);

    let missing = Engine::new(&store).with_assay_type("metabolomics");
    let err = missing.expression_by_gene_id("TP53").unwrap_err();
    assert!(matches!(err, AnalyticsError::NotFound { entity: "Assay", .. }));
}

#[test]
fn expression_by_regimen_restricts_to_treated_samples() {
    let store = setup();
    let act = Engine::new(&store).expression_by_regimen("AC-T").expect("assay present");
    let samples: Vec<&str> = act.sample_ids.iter().map(|s| s.as_str()).collect();
    assert_eq!(samples, ["S1", "S2"]);

    let tp53 = &act.raw_count_data[0];
    assert_eq!(tp53.gene_symbol, "TP53");
    let tp53_samples: Vec<&str> = tp53.expression_data.iter().map(|p| p.sample_id.as_str()).collect();
    assert_eq!(tp53_samples, ["S1", "S2"]);
    assert_eq!(act.raw_count_data[1].expression_data.len(), 1);

    // genes stay listed even when no treated sample was measured
    let egfr = &act.normalised_data[2];
    assert_eq!(egfr.gene_symbol, "EGFR");
    assert_eq!(egfr.expression_data.len(), 1);

    let none = Engine::new(&store).expression_by_regimen("FOLFOX").expect("assay present");
    assert!(none.sample_ids.is_empty());
    assert!(none.normalised_data.iter().all(|g| g.expression_data.is_empty()));
}

#[test]
fn top_genes_by_tumor_stage() {
    let store = setup();
    let stages = Engine::new(&store).top_genes_by_tumor_stage(2).expect("assay present");
    let names: Vec<&str> = stages.iter().map(|s| s.tumor_stage.as_str()).collect();
    assert_eq!(names, ["Stage I", "Stage II", "none"]);
    assert_eq!(symbols_and_means(&stages[0].top_genes), [("TP53", 2.0), ("BRCA1", 0.5)]);
    assert_eq!(symbols_and_means(&stages[1].top_genes), [("EGFR", 3.5), ("BRCA1", 3.0)]);
    assert_eq!(symbols_and_means(&stages[2].top_genes), [("EGFR", 9.0)]);

    let egfr_samples: Vec<&str> = stages[1].top_genes[0]
        .samples
        .iter()
        .map(|s| s.sample_id.as_str())
        .collect();
    assert_eq!(egfr_samples, ["S1", "S3"]);
}

#[test]
fn top_genes_with_zero_n_keeps_stages() {
    let store = setup();
    let stages = Engine::new(&store).top_genes_by_tumor_stage(0).expect("assay present");
    assert_eq!(stages.len(), 3);
    assert!(stages.iter().all(|s| s.top_genes.is_empty()));
}

#[test]
fn top_genes_ties_keep_grouping_order() {
    let store = store_from(json!({
        "Diagnosis": [{ "patientId": "P1", "disease": { "tumorStage": "Stage III" } }],
        "Sample": [{ "sampleId": "S1", "patientId": "P1" }],
        "Assay": { "assayType": { "transcriptomics": { "normalisedData": [
            { "geneSymbol": "GENE_B", "expressionData": [{ "sampleId": "S1", "expression_value": 1.0 }] },
            { "geneSymbol": "GENE_A", "expressionData": [{ "sampleId": "S1", "expression_value": 1.0 }] },
            { "geneSymbol": "GENE_C", "expressionData": [{ "sampleId": "S1", "expression_value": 1.0 }] }
        ]}}}
    }));
    let stages = Engine::new(&store).top_genes_by_tumor_stage(2).expect("assay present");
    assert_eq!(stages.len(), 1);
    assert_eq!(symbols_and_means(&stages[0].top_genes), [("GENE_B", 1.0), ("GENE_A", 1.0)]);
}

#[test]
fn sample_ids_by_tumor_stage_skips_unstaged() {
    let store = setup();
    let stages = Engine::new(&store).sample_ids_by_tumor_stage();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].tumor_stage, "Stage II");
    let ids: Vec<&str> = stages[0].sample_ids.iter().map(|s| s.as_str()).collect();
    assert_eq!(ids, ["S1", "S3"]);
    assert_eq!(stages[1].tumor_stage, "Stage I");
    assert_eq!(stages[1].sample_ids.len(), 1);
}

#[test]
fn gene_expression_by_tumor_stage() {
    let store = setup();
    let stages = Engine::new(&store).gene_expression_by_tumor_stage().expect("assay present");
    assert_eq!(stages.len(), 2);
    let s1 = &stages[0].gene_expression[0];
    assert_eq!(s1.sample_id.as_str(), "S1");
    let values: Vec<(&str, f64)> = s1
        .normalised_data
        .iter()
        .map(|g| (g.gene_symbol.as_str(), g.expression_value))
        .collect();
    assert_eq!(values, [("TP53", 1.0), ("BRCA1", 4.0), ("EGFR", 2.0)]);

    let s2 = &stages[1].gene_expression[0];
    assert_eq!(s2.sample_id.as_str(), "S2");
    assert_eq!(s2.normalised_data.len(), 2);

    let value = serde_json::to_value(s2).unwrap();
    assert_eq!(value["normalisedData"][1], json!({ "geneSymbol": "BRCA1", "expression_value": 0.5 }));
}

#[test]
fn correlation_across_assays() {
    let store = setup();
    let engine = Engine::new(&store);
    let tp53 = engine
        .expression_correlation_for_gene(&["transcriptomics", "proteomics"], "TP53")
        .expect("correlation defined");
    assert_eq!(tp53.correlation_value, 1.0);
    assert_eq!(tp53.assay_data.len(), 2);
    assert_eq!(tp53.assay_data[0].assay_type, "transcriptomics");
    // S9 is only in proteomics and is not paired
    assert_eq!(tp53.assay_data[1].expression_data.len(), 3);

    let reversed = engine
        .expression_correlation_for_gene(&["proteomics", "transcriptomics"], "TP53")
        .expect("correlation defined");
    assert_eq!(reversed.correlation_value, 1.0);
    assert_eq!(reversed.assay_data[0].assay_type, "proteomics");
    let order: Vec<&str> = reversed.assay_data[0]
        .expression_data
        .iter()
        .map(|s| s.sample_id.as_str())
        .collect();
    assert_eq!(order, ["S3", "S2", "S1"]);

    let value = serde_json::to_value(&tp53).unwrap();
    assert!(value.get("correlationValue").is_some());
    assert_eq!(value["AssayData"][0]["AssayType"], json!("transcriptomics"));
}

#[test]
fn correlation_failures() {
    let store = setup();
    let engine = Engine::new(&store);
    let both = ["transcriptomics", "proteomics"];

    // constant in proteomics
    let constant = engine.expression_correlation_for_gene(&both, "BRCA1").unwrap_err();
    assert!(matches!(constant, AnalyticsError::InvalidArgument(_)));
    // one shared sample only
    let sparse = engine.expression_correlation_for_gene(&both, "EGFR").unwrap_err();
    assert!(matches!(sparse, AnalyticsError::InvalidArgument(_)));
    let unknown_gene = engine.expression_correlation_for_gene(&both, "XYZ").unwrap_err();
    assert!(matches!(unknown_gene, AnalyticsError::InvalidArgument(_)));

    let single = engine
        .expression_correlation_for_gene(&["transcriptomics"], "TP53")
        .unwrap_err();
    assert!(matches!(single, AnalyticsError::InvalidArgument(_)));
    let unknown_assay = engine
        .expression_correlation_for_gene(&["transcriptomics", "metabolomics"], "TP53")
        .unwrap_err();
    assert!(matches!(unknown_assay, AnalyticsError::NotFound { entity: "Assay", .. }));
}

#[test]
fn pearson_coefficient() {
    assert_eq!(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), Some(-1.0));
    assert_eq!(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), Some(1.0));
    let r = pearson(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0]).unwrap();
    assert!((r - 0.8).abs() < 1e-12);
    assert_eq!(pearson(&[1.0], &[1.0]), None);
    assert_eq!(pearson(&[1.0, 2.0], &[5.0, 5.0]), None);
    assert_eq!(pearson(&[1.0, 2.0], &[1.0]), None);
}

#[test]
fn top_genes_merge_rows_sharing_a_symbol() {
    let store = store_from(json!({
        "Diagnosis": [
            { "patientId": "P1", "disease": { "tumorStage": "Stage II" } },
            { "patientId": "P2", "disease": { "tumorStage": "Stage II" } }
        ],
        "Sample": [
            { "sampleId": "S1", "patientId": "P1" },
            { "sampleId": "S2", "patientId": "P2" }
        ],
        "Assay": { "assayType": { "transcriptomics": { "normalisedData": [
            { "geneSymbol": "TP53", "expressionData": [{ "sampleId": "S1", "expression_value": 1.0 }] },
            { "geneSymbol": "EGFR", "expressionData": [{ "sampleId": "S1", "expression_value": 10.0 }] },
            { "geneSymbol": "TP53", "expressionData": [{ "sampleId": "S2", "expression_value": 99.0 }] }
        ]}}}
    }));
    let stages = Engine::new(&store).top_genes_by_tumor_stage(5).expect("assay present");
    assert_eq!(stages.len(), 1);
    assert_eq!(symbols_and_means(&stages[0].top_genes), [("TP53", 50.0), ("EGFR", 10.0)]);
    let samples: Vec<&str> = stages[0].top_genes[0]
        .samples
        .iter()
        .map(|s| s.sample_id.as_str())
        .collect();
    assert_eq!(samples, ["S1", "S2"]);
}
