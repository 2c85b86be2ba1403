//! Classifier Strategy - pretrained sequence model over `(records, 10, 2)`
//!
//! Class 0 is normal traffic. A record is anomalous when any other class
//! wins, and its score is the probability mass outside class 0.

use crate::constants::NORMAL_CLASS;
use crate::logic::config::PipelineConfig;
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::{FeatureSelection, FeatureSet, FillPolicy, CICIDS_EXPORT_LIST};
use crate::logic::model::inference::classifier_handle;
use crate::logic::model::{InputShape, ModelHandle, OnnxClassifier, SequenceModel, ShapedInput};
use super::{Label, ScoreOrientation, ScoredRecord, ScoringStrategy, StrategyExtras, StrategyOutput};

pub struct ClassifierStrategy<'h, M: SequenceModel> {
    handle: &'h ModelHandle<M>,
    config: PipelineConfig,
}

impl ClassifierStrategy<'static, OnnxClassifier> {
    /// Strategy over the process-wide ONNX classifier
    pub fn onnx(config: &PipelineConfig) -> Self {
        Self::new(classifier_handle(), config.clone())
    }
}

impl<'h, M: SequenceModel> ClassifierStrategy<'h, M> {
    pub fn new(handle: &'h ModelHandle<M>, config: PipelineConfig) -> Self {
        Self { handle, config }
    }
}

impl<M: SequenceModel> ScoringStrategy for ClassifierStrategy<'_, M> {
    fn name(&self) -> &'static str {
        "sequence_classifier"
    }

    /// Export column order, as the model was trained
    fn feature_selection(&self) -> FeatureSelection {
        FeatureSelection::AllowList(&CICIDS_EXPORT_LIST)
    }

    fn fill_policy(&self) -> FillPolicy {
        FillPolicy::Zero
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Sequence(self.config.sequence_shape)
    }

    fn score(&self, input: &ShapedInput, _features: &FeatureSet) -> PipelineResult<StrategyOutput> {
        let tensor = match input {
            ShapedInput::Sequence(t) => t,
            ShapedInput::Flat(x) => {
                return Err(PipelineError::shape("sequence tensor", format!("matrix {:?}", x.shape())));
            }
        };

        let classes = self.config.class_count;
        let model = self.handle.get_or_load(&self.config)?;

        if model.class_count() != classes {
            return Err(PipelineError::shape(
                format!("{} output classes", classes),
                format!("{} output classes", model.class_count()),
            ));
        }

        let probabilities = model.predict_proba(tensor)?;
        let rows = tensor.shape()[0];
        if probabilities.dim() != (rows, classes) {
            return Err(PipelineError::shape(
                format!("{} x {} probabilities", rows, classes),
                format!("{:?}", probabilities.shape()),
            ));
        }

        let mut distribution = vec![0usize; classes];
        let records: Vec<ScoredRecord> = probabilities
            .rows()
            .into_iter()
            .map(|row| {
                let record = classify_probabilities(&row.to_vec());
                if let Some(class) = record.predicted_class {
                    distribution[class] += 1;
                }
                record
            })
            .collect();

        Ok(StrategyOutput {
            records,
            orientation: ScoreOrientation::HigherIsAnomalous,
            extras: StrategyExtras::ClassDistribution(distribution),
        })
    }
}

/// Verdict for one probability row. The first maximum wins ties.
pub fn classify_probabilities(probabilities: &[f32]) -> ScoredRecord {
    let predicted = probabilities
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &p)| match best {
            None => Some((i, p)),
            Some((_, max)) if p > max => Some((i, p)),
            _ => best,
        })
        .map(|(i, _)| i);

    let normal_p = probabilities.get(NORMAL_CLASS).copied().unwrap_or(0.0);
    let label = match predicted {
        Some(NORMAL_CLASS) | None => Label::Normal,
        Some(_) => Label::Anomaly,
    };

    ScoredRecord {
        label,
        raw_score: 1.0 - f64::from(normal_p),
        predicted_class: predicted,
        probabilities: Some(probabilities.to_vec()),
    }
}
