//! Report Aggregator
//!
//! Folds per-record verdicts into the [`AnalysisReport`] returned to the
//! caller. Scores are normalized so that higher always means more anomalous,
//! and every number in the report must be finite.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants;
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::{FeatureSet, ImputeStats};
use crate::logic::model::ShapeAdjustment;
use crate::logic::scoring::{Label, StrategyExtras, StrategyOutput};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// What went into the matrix and what was done to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMetadata {
    /// Allow-listed features absent from the upload
    pub missing_features: Vec<String>,
    /// CRC32 of the selected names, hex
    pub layout_hash: String,
    pub filled_cells: usize,
    pub infinite_replaced: usize,
    /// Columns with no present value at all
    pub degenerate_columns: Vec<String>,
    /// Columns with zero spread, scaled to 0
    pub constant_columns: Vec<String>,
    /// Features past the classifier's input width
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub truncated_features: Vec<String>,
    #[serde(default)]
    pub padded_columns: usize,
    /// Non-numeric columns in the upload, never scored
    #[serde(default)]
    pub ignored_text_columns: Vec<String>,
}

impl FeatureMetadata {
    pub fn new(
        features: &FeatureSet,
        impute: ImputeStats,
        constant_columns: Vec<String>,
        adjustment: ShapeAdjustment,
    ) -> Self {
        let names = features.names();
        let kept = names.len().saturating_sub(adjustment.truncated);

        Self {
            missing_features: features.missing().to_vec(),
            layout_hash: format!("{:08x}", features.layout_hash()),
            filled_cells: impute.filled_cells,
            infinite_replaced: impute.infinite_replaced,
            degenerate_columns: impute.degenerate_columns,
            constant_columns,
            truncated_features: names[kept..].to_vec(),
            padded_columns: adjustment.padded,
            ignored_text_columns: Vec::new(),
        }
    }

    pub fn with_text_columns(mut self, columns: Vec<String>) -> Self {
        self.ignored_text_columns = columns;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Batch severity by anomaly rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    /// `rate` is a percentage; both bounds are exclusive
    pub fn from_rate(rate: f64) -> Self {
        if rate > constants::THREAT_HIGH_RATE {
            ThreatLevel::High
        } else if rate > constants::THREAT_MEDIUM_RATE {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }
}

/// Attack category name for a classifier class
pub fn class_label(class: usize) -> String {
    constants::CLASS_LABELS
        .get(class)
        .map(|label| label.to_string())
        .unwrap_or_else(|| class_key(class))
}

fn class_key(class: usize) -> String {
    format!("class_{}", class)
}

/// One attack category seen in the batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackCategory {
    pub class: String,
    pub label: String,
    pub count: usize,
    /// Percentage of all anomalies
    pub share_of_threats: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub scan_id: Uuid,
    pub strategy: String,
    pub total_records: usize,
    pub anomalies_detected: usize,
    pub normal_records: usize,
    /// Percentage, 0..=100
    pub anomaly_rate: f64,
    pub threat_level: ThreatLevel,
    /// Per record, higher = more anomalous
    pub anomaly_scores: Vec<f64>,
    pub labels: Vec<Label>,
    /// Features that reached the scorer, in input order
    pub features_used: Vec<String>,
    pub feature_metadata: FeatureMetadata,
    pub score_summary: ScoreSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<Vec<FeatureImportance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_distribution: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_labels: Option<BTreeMap<String, String>>,
    /// Non-normal classes with at least one record, largest first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_breakdown: Option<Vec<AttackCategory>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_classes: Option<Vec<usize>>,
    /// Seconds
    pub processing_time: f64,
    pub analyzed_at: DateTime<Utc>,
}

// ============================================================================
// AGGREGATION
// ============================================================================

pub fn aggregate(
    strategy: &str,
    output: StrategyOutput,
    features: &FeatureSet,
    feature_metadata: FeatureMetadata,
    started: Instant,
) -> PipelineResult<AnalysisReport> {
    let total_records = output.records.len();
    if total_records == 0 {
        return Err(PipelineError::EmptyBatch);
    }

    let anomalies_detected = output.records.iter().filter(|r| r.label.is_anomaly()).count();
    let normal_records = total_records - anomalies_detected;
    let anomaly_rate = anomalies_detected as f64 / total_records as f64 * 100.0;

    let anomaly_scores: Vec<f64> = output
        .records
        .iter()
        .map(|r| output.orientation.normalize(r.raw_score))
        .collect();
    for (i, score) in anomaly_scores.iter().enumerate() {
        ensure_finite(&format!("anomaly_scores[{}]", i), *score)?;
    }

    let score_summary = summarize(&anomaly_scores);
    ensure_finite("score_summary.min", score_summary.min)?;
    ensure_finite("score_summary.max", score_summary.max)?;
    ensure_finite("score_summary.avg", score_summary.avg)?;
    ensure_finite("anomaly_rate", anomaly_rate)?;

    let labels = output.records.iter().map(|r| r.label).collect();

    let mut class_labels = None;
    let mut attack_breakdown = None;
    let (feature_importance, class_distribution, predicted_classes) = match output.extras {
        StrategyExtras::FeatureImportance(weights) => {
            if weights.len() != features.len() {
                return Err(PipelineError::shape(
                    format!("{} importance weights", features.len()),
                    weights.len(),
                ));
            }
            let importance = features
                .names()
                .iter()
                .zip(weights)
                .map(|(name, importance)| {
                    ensure_finite(&format!("feature_importance.{}", name), importance)?;
                    Ok(FeatureImportance {
                        feature: name.clone(),
                        importance,
                    })
                })
                .collect::<PipelineResult<Vec<_>>>()?;
            (Some(importance), None, None)
        }
        StrategyExtras::ClassDistribution(counts) => {
            let distribution = counts
                .iter()
                .enumerate()
                .map(|(class, count)| (class_key(class), *count))
                .collect();
            class_labels = Some((0..counts.len()).map(|c| (class_key(c), class_label(c))).collect());
            attack_breakdown = Some(breakdown(&counts, anomalies_detected)?);
            let predicted = output
                .records
                .iter()
                .map(|r| r.predicted_class)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| PipelineError::shape("a predicted class per record", "missing predictions"))?;
            (None, Some(distribution), Some(predicted))
        }
    };

    let kept = features.len().saturating_sub(feature_metadata.truncated_features.len());
    let threat_level = ThreatLevel::from_rate(anomaly_rate);
    let processing_time = started.elapsed().as_secs_f64();

    log::info!(
        "{}: {} records, {} anomalies ({:.2}%) in {:.3}s",
        strategy,
        total_records,
        anomalies_detected,
        anomaly_rate,
        processing_time
    );

    Ok(AnalysisReport {
        scan_id: Uuid::new_v4(),
        strategy: strategy.to_string(),
        total_records,
        anomalies_detected,
        normal_records,
        anomaly_rate,
        threat_level,
        anomaly_scores,
        labels,
        features_used: features.names()[..kept].to_vec(),
        feature_metadata,
        score_summary,
        feature_importance,
        class_distribution,
        class_labels,
        attack_breakdown,
        predicted_classes,
        processing_time,
        analyzed_at: Utc::now(),
    })
}

fn breakdown(counts: &[usize], anomalies: usize) -> PipelineResult<Vec<AttackCategory>> {
    let mut categories = counts
        .iter()
        .enumerate()
        .filter(|&(class, &count)| class != constants::NORMAL_CLASS && count > 0)
        .map(|(class, &count)| {
            let share_of_threats = count as f64 / anomalies as f64 * 100.0;
            ensure_finite(&format!("attack_breakdown.{}", class_key(class)), share_of_threats)?;
            Ok(AttackCategory {
                class: class_key(class),
                label: class_label(class),
                count,
                share_of_threats,
            })
        })
        .collect::<PipelineResult<Vec<_>>>()?;
    categories.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(categories)
}

fn summarize(scores: &[f64]) -> ScoreSummary {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
    ScoreSummary { min, max, avg }
}

fn ensure_finite(field: &str, value: f64) -> PipelineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PipelineError::NonFiniteResult {
            field: field.to_string(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::dataset::load_csv;
    use crate::logic::features::FeatureSelection;
    use crate::logic::scoring::{ScoreOrientation, ScoredRecord};

    fn features() -> FeatureSet {
        let table = load_csv(b"a,b\n1,2\n").unwrap();
        FeatureSelection::AllNumeric.select(&table).unwrap()
    }

    fn metadata(features: &FeatureSet) -> FeatureMetadata {
        FeatureMetadata::new(features, ImputeStats::default(), Vec::new(), ShapeAdjustment::default())
    }

    fn outlier_output(scores: &[(f64, Label)]) -> StrategyOutput {
        StrategyOutput {
            records: scores.iter().map(|&(s, l)| ScoredRecord::outlier(s, l)).collect(),
            orientation: ScoreOrientation::LowerIsAnomalous,
            extras: StrategyExtras::FeatureImportance(vec![0.25, 0.75]),
        }
    }

    #[test]
    fn test_counts_and_rate() {
        let fs = features();
        let output = outlier_output(&[
            (-0.4, Label::Normal),
            (-0.8, Label::Anomaly),
            (-0.45, Label::Normal),
            (-0.5, Label::Normal),
        ]);

        let report = aggregate("isolation_forest", output, &fs, metadata(&fs), Instant::now()).unwrap();

        assert_eq!(report.total_records, 4);
        assert_eq!(report.anomalies_detected, 1);
        assert_eq!(report.normal_records + report.anomalies_detected, report.total_records);
        assert_eq!(report.anomaly_rate, 25.0);
        assert_eq!(report.features_used, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(report.threat_level, ThreatLevel::High);
    }

    #[test]
    fn test_scores_normalized_higher_is_anomalous() {
        let fs = features();
        let output = outlier_output(&[(-0.4, Label::Normal), (-0.8, Label::Anomaly)]);

        let report = aggregate("isolation_forest", output, &fs, metadata(&fs), Instant::now()).unwrap();

        assert_eq!(report.anomaly_scores, vec![0.4, 0.8]);
        assert_eq!(report.score_summary.min, 0.4);
        assert_eq!(report.score_summary.max, 0.8);
        assert!((report.score_summary.avg - 0.6).abs() < 1e-12);

        let importance = report.feature_importance.unwrap();
        assert_eq!(importance[1].feature, "b");
        assert_eq!(importance[1].importance, 0.75);
        assert!(report.class_distribution.is_none());
    }

    #[test]
    fn test_empty_batch() {
        let fs = features();
        let output = outlier_output(&[]);

        let result = aggregate("isolation_forest", output, &fs, metadata(&fs), Instant::now());
        assert!(matches!(result, Err(PipelineError::EmptyBatch)));
    }

    #[test]
    fn test_non_finite_score_is_reported() {
        let fs = features();
        let output = outlier_output(&[(-0.4, Label::Normal), (f64::NAN, Label::Normal)]);

        match aggregate("isolation_forest", output, &fs, metadata(&fs), Instant::now()) {
            Err(PipelineError::NonFiniteResult { field }) => assert_eq!(field, "anomaly_scores[1]"),
            other => panic!("expected NonFiniteResult, got {:?}", other.map(|r| r.total_records)),
        }
    }

    #[test]
    fn test_class_distribution_keys_every_class() {
        let fs = features();
        let records = [0usize, 3, 3]
            .iter()
            .map(|&c| ScoredRecord {
                label: if c == 0 { Label::Normal } else { Label::Anomaly },
                raw_score: if c == 0 { 0.1 } else { 0.9 },
                predicted_class: Some(c),
                probabilities: None,
            })
            .collect();
        let output = StrategyOutput {
            records,
            orientation: ScoreOrientation::HigherIsAnomalous,
            extras: StrategyExtras::ClassDistribution(vec![1, 0, 0, 2, 0, 0, 0]),
        };

        let report = aggregate("sequence_classifier", output, &fs, metadata(&fs), Instant::now()).unwrap();

        let distribution = report.class_distribution.unwrap();
        assert_eq!(distribution.len(), 7);
        assert_eq!(distribution["class_0"], 1);
        assert_eq!(distribution["class_3"], 2);
        assert_eq!(distribution["class_6"], 0);
        assert_eq!(report.predicted_classes, Some(vec![0, 3, 3]));
        assert_eq!(report.anomalies_detected, 2);
        assert!(report.feature_importance.is_none());
    }

    #[test]
    fn test_metadata_lists_truncated_features() {
        let table = load_csv(b"a,b,c\n1,2,3\n").unwrap();
        let fs = FeatureSelection::AllNumeric.select(&table).unwrap();
        let adjustment = ShapeAdjustment { truncated: 1, padded: 0 };

        let meta = FeatureMetadata::new(&fs, ImputeStats::default(), Vec::new(), adjustment);
        assert_eq!(meta.truncated_features, vec!["c".to_string()]);
        assert_eq!(meta.layout_hash.len(), 8);
    }

    #[test]
    fn test_features_used_excludes_truncated() {
        let table = load_csv(b"a,b,c\n1,2,3\n").unwrap();
        let fs = FeatureSelection::AllNumeric.select(&table).unwrap();
        let adjustment = ShapeAdjustment { truncated: 1, padded: 0 };
        let meta = FeatureMetadata::new(&fs, ImputeStats::default(), Vec::new(), adjustment);
        let output = StrategyOutput {
            records: vec![ScoredRecord::outlier(-0.5, Label::Normal)],
            orientation: ScoreOrientation::LowerIsAnomalous,
            extras: StrategyExtras::FeatureImportance(vec![0.2, 0.3, 0.5]),
        };

        let report = aggregate("isolation_forest", output, &fs, meta, Instant::now()).unwrap();
        assert_eq!(report.features_used, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_threat_level_bounds_are_exclusive() {
        assert_eq!(ThreatLevel::from_rate(0.0), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_rate(10.0), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_rate(10.1), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_rate(20.0), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_rate(20.1), ThreatLevel::High);
        assert_eq!(serde_json::to_value(ThreatLevel::Medium).unwrap(), "MEDIUM");
    }

    #[test]
    fn test_class_labels() {
        assert_eq!(class_label(0), "Normal Traffic");
        assert_eq!(class_label(1), "DoS/DDoS Attacks");
        assert_eq!(class_label(6), "Brute Force Attacks");
        assert_eq!(class_label(12), "class_12");
    }

    #[test]
    fn test_attack_breakdown_skips_normal_and_empty_classes() {
        let fs = features();
        let records = [0usize, 0, 1, 6, 6, 6]
            .iter()
            .map(|&c| ScoredRecord {
                label: if c == 0 { Label::Normal } else { Label::Anomaly },
                raw_score: if c == 0 { 0.1 } else { 0.9 },
                predicted_class: Some(c),
                probabilities: None,
            })
            .collect();
        let output = StrategyOutput {
            records,
            orientation: ScoreOrientation::HigherIsAnomalous,
            extras: StrategyExtras::ClassDistribution(vec![2, 1, 0, 0, 0, 0, 3]),
        };

        let report = aggregate("sequence_classifier", output, &fs, metadata(&fs), Instant::now()).unwrap();

        let breakdown = report.attack_breakdown.unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].class, "class_6");
        assert_eq!(breakdown[0].label, "Brute Force Attacks");
        assert_eq!(breakdown[0].count, 3);
        assert_eq!(breakdown[0].share_of_threats, 75.0);
        assert_eq!(breakdown[1].label, "DoS/DDoS Attacks");
        assert_eq!(breakdown[1].share_of_threats, 25.0);

        let labels = report.class_labels.unwrap();
        assert_eq!(labels.len(), 7);
        assert_eq!(labels["class_2"], "Port Scans");
        assert_eq!(report.threat_level, ThreatLevel::High);
    }
}
