//! Model Module - Shape adaptation and the two scoring models
//!
//! - `shape` - fixed tensor layouts per strategy
//! - `isolation` - isolation forest, fit per request
//! - `threshold` - contamination offset for the forest
//! - `inference` - ONNX sequence classifier, loaded once per process

pub mod shape;
pub mod isolation;
pub mod threshold;
pub mod inference;

use ndarray::Array2;

// Re-export common types
pub use shape::{adapt, InputShape, SequenceShape, ShapeAdjustment, ShapedInput};
pub use isolation::{IsolationConfig, IsolationForest};
pub use threshold::ContaminationThreshold;
pub use inference::{ModelHandle, ModelStatus, OnnxClassifier, SequenceModel};

/// Unsupervised detector fit on a single batch
pub trait OutlierDetector {
    /// Raw scores, lower = more anomalous
    fn score_samples(&self, x: &Array2<f64>) -> Vec<f64>;

    /// Per-feature weight, when the model structure exposes one
    fn feature_importance(&self) -> Option<Vec<f64>> {
        None
    }
}
