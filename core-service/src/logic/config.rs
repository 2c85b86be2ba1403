//! Pipeline configuration
//!
//! Loaded from environment variables (see `constants.rs`), validated before use.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;
use super::error::{PipelineError, PipelineResult};
use super::model::shape::SequenceShape;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Classifier artifact (ONNX)
    pub model_path: PathBuf,

    /// Expected outlier share, in (0, 0.5]
    pub contamination: f64,

    /// Isolation trees per fit
    pub tree_count: usize,

    /// Sub-sample size per tree, capped by batch size
    pub max_samples: usize,

    /// Seed for tree construction
    pub random_seed: u64,

    /// Rows per ONNX forward pass
    pub inference_batch: usize,

    /// Classifier input layout
    pub sequence_shape: SequenceShape,

    /// Classifier output width
    pub class_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(constants::DEFAULT_MODEL_PATH),
            contamination: constants::DEFAULT_CONTAMINATION,
            tree_count: constants::DEFAULT_TREE_COUNT,
            max_samples: constants::DEFAULT_MAX_SAMPLES,
            random_seed: constants::DEFAULT_RANDOM_SEED,
            inference_batch: constants::DEFAULT_INFERENCE_BATCH,
            sequence_shape: SequenceShape::default(),
            class_count: constants::CLASS_COUNT,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            model_path: constants::get_model_path(),
            contamination: constants::get_contamination(),
            tree_count: constants::get_tree_count(),
            max_samples: constants::get_max_samples(),
            random_seed: constants::get_random_seed(),
            inference_batch: constants::get_inference_batch(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(PipelineError::InvalidConfig(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.tree_count == 0 {
            return Err(PipelineError::InvalidConfig("tree_count must be > 0".into()));
        }
        if self.max_samples == 0 {
            return Err(PipelineError::InvalidConfig("max_samples must be > 0".into()));
        }
        if self.inference_batch == 0 {
            return Err(PipelineError::InvalidConfig("inference_batch must be > 0".into()));
        }
        if self.class_count < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "class_count must be >= 2, got {}",
                self.class_count
            )));
        }
        self.sequence_shape.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.contamination, 0.1);
        assert_eq!(config.sequence_shape.width(), 20);
    }

    #[test]
    fn test_reject_bad_contamination() {
        let config = PipelineConfig {
            contamination: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));

        let config = PipelineConfig {
            contamination: 0.75,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_zero_trees() {
        let config = PipelineConfig {
            tree_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
