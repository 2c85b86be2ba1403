//! Pipeline - one uploaded batch in, one report out
//!
//! ```text
//! load ─► select ─► impute ─► scale ─► shape ─► score ─► aggregate
//! ```
//!
//! Everything except the pretrained classifier is fit on, and scoped to, the
//! request. [`Pipeline::handle`] is the request boundary: failures come back
//! as an [`ErrorPayload`] instead of escaping.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::logic::config::PipelineConfig;
use crate::logic::dataset::load_csv;
use crate::logic::error::{ErrorPayload, PipelineError, PipelineResult};
use crate::logic::features::{impute, FeatureSelection, StandardScaler};
use crate::logic::model::{adapt, OnnxClassifier};
use crate::logic::report::{aggregate, AnalysisReport, FeatureMetadata};
use crate::logic::scoring::{ClassifierStrategy, OutlierStrategy, ScoringStrategy};


/// Result of one request, serializable as-is
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisResponse {
    Success(AnalysisReport),
    Failure(ErrorPayload),
}

impl AnalysisResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResponse::Success(_))
    }
}

/// Isolation forest pipeline, as built by [`Pipeline::statistical`]
pub type StatisticalPipeline = Pipeline<OutlierStrategy>;

/// ONNX classifier pipeline, as built by [`Pipeline::sequence`]
pub type SequencePipeline = Pipeline<ClassifierStrategy<'static, OnnxClassifier>>;

pub struct Pipeline<S: ScoringStrategy> {
    selection: FeatureSelection,
    strategy: S,
}

impl StatisticalPipeline {
    /// Isolation forest over the allow-listed statistical features
    pub fn statistical(config: &PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self::new(OutlierStrategy::from_config(config)))
    }
}

impl SequencePipeline {
    /// Process-wide ONNX sequence classifier over export-ordered columns
    pub fn sequence(config: &PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self::new(ClassifierStrategy::onnx(config)))
    }
}

impl<S: ScoringStrategy> Pipeline<S> {
    /// Pipeline selecting the columns the strategy asks for
    pub fn new(strategy: S) -> Self {
        Self {
            selection: strategy.feature_selection(),
            strategy,
        }
    }

    pub fn with_selection(mut self, selection: FeatureSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn analyze(&self, bytes: &[u8]) -> PipelineResult<AnalysisReport> {
        let started = Instant::now();

        let table = load_csv(bytes)?;
        log::debug!("Loaded {} rows x {} columns", table.row_count(), table.columns().len());

        let features = self.selection.select(&table)?;
        if table.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }
        if !features.missing().is_empty() {
            log::debug!("{} allow-listed features missing from upload", features.missing().len());
        }

        let (matrix, impute_stats) = impute(&table, &features, self.strategy.fill_policy())?;

        let scaler = StandardScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix);
        let constant_columns = scaler
            .constant_columns()
            .into_iter()
            .filter_map(|j| features.names().get(j).cloned())
            .collect();

        let (shaped, adjustment) = adapt(scaled, self.strategy.input_shape())?;
        log::debug!("Model input shape {:?}", shaped.shape());
        if adjustment.truncated > 0 {
            log::warn!(
                "Input has {} features, dropping the last {} to fit the classifier",
                features.len(),
                adjustment.truncated
            );
        }

        let output = self.strategy.score(&shaped, &features)?;
        if output.records.len() != table.row_count() {
            return Err(PipelineError::shape(
                format!("{} scored records", table.row_count()),
                output.records.len(),
            ));
        }

        let metadata = FeatureMetadata::new(&features, impute_stats, constant_columns, adjustment)
            .with_text_columns(table.text_columns());
        aggregate(self.strategy.name(), output, &features, metadata, started)
    }

    /// Request boundary: never fails, failures become a payload
    pub fn handle(&self, bytes: &[u8]) -> AnalysisResponse {
        match self.analyze(bytes) {
            Ok(report) => AnalysisResponse::Success(report),
            Err(e) => {
                if e.is_client_error() {
                    log::warn!("Rejected upload: {}", e);
                } else {
                    log::error!("Analysis failed: {}", e);
                }
                AnalysisResponse::Failure(ErrorPayload::from(e))
            }
        }
    }
}
