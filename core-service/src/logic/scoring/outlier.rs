//! Outlier Strategy - isolation forest fit and scored on the same batch

use crate::logic::config::PipelineConfig;
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::{FeatureSet, FillPolicy};
use crate::logic::model::{
    ContaminationThreshold, InputShape, IsolationConfig, IsolationForest, OutlierDetector, ShapedInput,
};
use super::{Label, ScoreOrientation, ScoredRecord, ScoringStrategy, StrategyExtras, StrategyOutput};

#[derive(Debug, Clone)]
pub struct OutlierStrategy {
    config: IsolationConfig,
}

impl OutlierStrategy {
    pub fn new(config: IsolationConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(IsolationConfig::from(config))
    }

    pub fn config(&self) -> &IsolationConfig {
        &self.config
    }
}

impl ScoringStrategy for OutlierStrategy {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn fill_policy(&self) -> FillPolicy {
        FillPolicy::Mean
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Flat
    }

    fn score(&self, input: &ShapedInput, features: &FeatureSet) -> PipelineResult<StrategyOutput> {
        let x = match input {
            ShapedInput::Flat(x) => x,
            ShapedInput::Sequence(t) => {
                return Err(PipelineError::shape("flat matrix", format!("tensor {:?}", t.shape())));
            }
        };

        if x.nrows() == 0 {
            return Err(PipelineError::EmptyBatch);
        }
        if x.ncols() != features.len() {
            return Err(PipelineError::shape(
                format!("{} feature columns", features.len()),
                format!("{} columns", x.ncols()),
            ));
        }

        let forest = IsolationForest::fit(x, &self.config);
        let scores = forest.score_samples(x);
        let threshold = ContaminationThreshold::calibrate(&scores, self.config.contamination);

        log::debug!(
            "Outlier threshold: offset {:.4} at contamination {}",
            threshold.offset,
            threshold.contamination
        );

        let records = scores
            .iter()
            .map(|&score| {
                let label = if threshold.is_anomaly(score) { Label::Anomaly } else { Label::Normal };
                ScoredRecord::outlier(score, label)
            })
            .collect();

        let importance = forest
            .feature_importance()
            .unwrap_or_else(|| vec![0.0; features.len()]);

        Ok(StrategyOutput {
            records,
            orientation: ScoreOrientation::LowerIsAnomalous,
            extras: StrategyExtras::FeatureImportance(importance),
        })
    }
}
