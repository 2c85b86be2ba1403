//! Scoring Module - per-record verdicts
//!
//! A [`ScoringStrategy`] declares the fill policy and input shape it needs,
//! then turns the shaped batch into one [`ScoredRecord`] per row.
//!
//! - `outlier` - isolation forest fit on the batch itself
//! - `classifier` - pretrained sequence classifier

pub mod outlier;
pub mod classifier;


use serde::{Deserialize, Serialize};

use crate::logic::error::PipelineResult;
use crate::logic::features::{FeatureSelection, FeatureSet, FillPolicy};
use crate::logic::model::{InputShape, ShapedInput};

pub use outlier::OutlierStrategy;
pub use classifier::{classify_probabilities, ClassifierStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Normal,
    Anomaly,
}

impl Label {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Label::Anomaly)
    }
}

/// Sign convention of a strategy's raw score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrientation {
    HigherIsAnomalous,
    LowerIsAnomalous,
}

impl ScoreOrientation {
    /// Map a raw score onto "higher = more anomalous"
    pub fn normalize(&self, raw: f64) -> f64 {
        match self {
            ScoreOrientation::HigherIsAnomalous => raw,
            ScoreOrientation::LowerIsAnomalous => -raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub label: Label,
    pub raw_score: f64,
    pub predicted_class: Option<usize>,
    pub probabilities: Option<Vec<f32>>,
}

impl ScoredRecord {
    pub fn outlier(raw_score: f64, label: Label) -> Self {
        Self {
            label,
            raw_score,
            predicted_class: None,
            probabilities: None,
        }
    }
}

/// Strategy-specific extras carried into the report
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyExtras {
    /// One weight per feature, FeatureSet order
    FeatureImportance(Vec<f64>),
    /// Count per class index, every class present
    ClassDistribution(Vec<usize>),
}

#[derive(Debug, Clone)]
pub struct StrategyOutput {
    pub records: Vec<ScoredRecord>,
    pub orientation: ScoreOrientation,
    pub extras: StrategyExtras,
}

pub trait ScoringStrategy {
    /// Name reported in `AnalysisReport::strategy`
    fn name(&self) -> &'static str;

    /// Columns the strategy was built for
    fn feature_selection(&self) -> FeatureSelection {
        FeatureSelection::default()
    }

    fn fill_policy(&self) -> FillPolicy;

    fn input_shape(&self) -> InputShape;

    /// One record per input row, in input order
    fn score(&self, input: &ShapedInput, features: &FeatureSet) -> PipelineResult<StrategyOutput>;
}
