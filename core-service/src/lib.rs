//! IntruScan Core - Network Flow Anomaly Analysis
//!
//! Turns a CICIDS-2017 style CSV export into an [`AnalysisReport`].
//!
//! ```text
//! bytes ─► dataset (FlowTable) ─► features::selector ─► features::impute
//!       ─► features::scaler ─► model::shape ─► scoring ─► report
//! ```
//!
//! Two scoring strategies share the pipeline:
//! - `outlier`: isolation forest fit on the request's own batch
//! - `classifier`: pretrained ONNX sequence classifier, loaded once per process

pub mod constants;
pub mod logic;

pub use logic::config::PipelineConfig;
pub use logic::error::{ErrorKind, ErrorPayload, PipelineError};
pub use logic::model::inference::{model_status, ModelStatus};
pub use logic::pipeline::{AnalysisResponse, Pipeline, SequencePipeline, StatisticalPipeline};
pub use logic::report::{AnalysisReport, ThreatLevel};
