//! Inference Engine - ONNX Runtime Integration
//!
//! The pretrained sequence classifier is process-wide: loaded lazily on first
//! use, read-only afterwards, shared by every request. Loading goes through a
//! once-guard, so concurrent first requests trigger a single load, and a
//! failed load leaves the handle empty for the next request to retry.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use once_cell::sync::OnceCell;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logic::config::PipelineConfig;
use crate::logic::error::{PipelineError, PipelineResult};

// ============================================================================
// STATE
// ============================================================================

/// Process-wide classifier handle
static CLASSIFIER: ModelHandle<OnnxClassifier> = ModelHandle::new(OnnxClassifier::load);

pub fn classifier_handle() -> &'static ModelHandle<OnnxClassifier> {
    &CLASSIFIER
}

/// Health query: is the process-wide classifier loaded?
pub fn model_status() -> ModelStatus {
    CLASSIFIER.status()
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub output_name: String,
    pub class_count: usize,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

/// Engine status for health checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub engine: String,
    pub metadata: Option<ModelMetadata>,
    pub load_attempts: u64,
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

/// Running latency counters
#[derive(Debug, Default)]
pub struct InferenceStats {
    latency_sum_us: AtomicU64,
    count: AtomicU64,
}

impl InferenceStats {
    pub fn record(&self, started: Instant) {
        self.latency_sum_us
            .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn avg_latency_ms(&self) -> f32 {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.count();
        if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 }
    }
}

// ============================================================================
// SEQUENCE MODEL TRAIT
// ============================================================================

/// Multi-class classifier over `(records, steps, step_width)` tensors
pub trait SequenceModel: Send + Sync {
    fn class_count(&self) -> usize;

    /// One probability row per record
    fn predict_proba(&self, batch: &Array3<f32>) -> PipelineResult<Array2<f32>>;

    fn engine(&self) -> &'static str;

    fn metadata(&self) -> Option<ModelMetadata> {
        None
    }

    fn stats(&self) -> Option<&InferenceStats> {
        None
    }
}

// ============================================================================
// MODEL HANDLE
// ============================================================================

/// Lazily loaded, load-once, read-only model slot
pub struct ModelHandle<M> {
    cell: OnceCell<M>,
    loader: fn(&PipelineConfig) -> PipelineResult<M>,
    load_attempts: AtomicU64,
}

impl<M> ModelHandle<M> {
    pub const fn new(loader: fn(&PipelineConfig) -> PipelineResult<M>) -> Self {
        Self {
            cell: OnceCell::new(),
            loader,
            load_attempts: AtomicU64::new(0),
        }
    }

    /// Loaded model, loading it first if needed.
    ///
    /// Concurrent callers block on the one load in progress. On failure the
    /// slot stays empty and the error goes to the caller that ran the load.
    pub fn get_or_load(&self, config: &PipelineConfig) -> PipelineResult<&M> {
        self.cell.get_or_try_init(|| {
            let attempt = self.load_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            log::info!("Loading classifier (attempt {}) from {}", attempt, config.model_path.display());
            let result = (self.loader)(config);
            if let Err(e) = &result {
                log::warn!("Classifier load failed: {}", e);
            }
            result
        })
    }

    pub fn get(&self) -> Option<&M> {
        self.cell.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn load_attempts(&self) -> u64 {
        self.load_attempts.load(Ordering::SeqCst)
    }
}

impl<M: SequenceModel> ModelHandle<M> {
    pub fn status(&self) -> ModelStatus {
        match self.get() {
            Some(model) => ModelStatus {
                model_loaded: true,
                engine: model.engine().to_string(),
                metadata: model.metadata(),
                load_attempts: self.load_attempts(),
                inference_count: model.stats().map(InferenceStats::count).unwrap_or(0),
                avg_latency_ms: model.stats().map(InferenceStats::avg_latency_ms).unwrap_or(0.0),
            },
            None => ModelStatus {
                model_loaded: false,
                engine: "none".to_string(),
                metadata: None,
                load_attempts: self.load_attempts(),
                inference_count: 0,
                avg_latency_ms: 0.0,
            },
        }
    }
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

/// ONNX export of the CICIDS sequence classifier
pub struct OnnxClassifier {
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,
    output_name: String,
    class_count: usize,
    chunk_rows: usize,
    metadata: ModelMetadata,
    stats: InferenceStats,
}

impl OnnxClassifier {
    /// Load ONNX model from `config.model_path`
    pub fn load(config: &PipelineConfig) -> PipelineResult<Self> {
        let path = config.model_path.as_path();

        if !path.exists() {
            return Err(PipelineError::model_unavailable(path, "model file not found"));
        }

        let bytes = std::fs::read(path).map_err(|e| PipelineError::model_unavailable(path, e))?;
        Self::from_bytes(&bytes, path, config)
    }

    fn from_bytes(bytes: &[u8], path: &Path, config: &PipelineConfig) -> PipelineResult<Self> {
        let sha256 = hex::encode(Sha256::digest(bytes));

        let session = Session::builder()
            .map_err(|e| PipelineError::model_unavailable(path, format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PipelineError::model_unavailable(path, format!("optimization: {}", e)))?
            .commit_from_memory(bytes)
            .map_err(|e| PipelineError::model_unavailable(path, format!("load: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| PipelineError::model_unavailable(path, "model defines no outputs"))?;

        log::info!("ONNX model loaded (sha256 {}, output '{}')", &sha256[..12], output_name);

        let metadata = ModelMetadata {
            model_path: path.display().to_string(),
            sha256,
            size_bytes: bytes.len() as u64,
            output_name: output_name.clone(),
            class_count: config.class_count,
            loaded_at: chrono::Utc::now(),
        };

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            class_count: config.class_count,
            chunk_rows: config.inference_batch,
            metadata,
            stats: InferenceStats::default(),
        })
    }
}

impl SequenceModel for OnnxClassifier {
    fn class_count(&self) -> usize {
        self.class_count
    }

    fn predict_proba(&self, batch: &Array3<f32>) -> PipelineResult<Array2<f32>> {
        let started = Instant::now();
        let rows = batch.shape()[0];
        let classes = self.class_count;
        let mut probabilities = Array2::<f32>::zeros((rows, classes));

        let mut session = self.session.lock();
        let mut offset = 0;

        for chunk in batch.axis_chunks_iter(Axis(0), self.chunk_rows) {
            let n = chunk.shape()[0];

            let input = Value::from_array(chunk.to_owned())
                .map_err(|e| PipelineError::Inference(format!("tensor error: {}", e)))?;

            let outputs = session
                .run(ort::inputs![input])
                .map_err(|e| PipelineError::Inference(format!("run failed: {}", e)))?;

            let output = outputs
                .get(&self.output_name)
                .ok_or_else(|| PipelineError::Inference(format!("missing output '{}'", self.output_name)))?;

            let (_, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Inference(format!("extract error: {}", e)))?;

            if data.len() != n * classes {
                return Err(PipelineError::shape(
                    format!("{} x {} probabilities", n, classes),
                    format!("{} values", data.len()),
                ));
            }

            let view = ArrayView2::from_shape((n, classes), data)
                .map_err(|e| PipelineError::shape(format!("{} x {}", n, classes), e))?;
            probabilities.slice_mut(s![offset..offset + n, ..]).assign(&view);
            offset += n;
        }

        self.stats.record(started);
        Ok(probabilities)
    }

    fn engine(&self) -> &'static str {
        "onnx"
    }

    fn metadata(&self) -> Option<ModelMetadata> {
        Some(self.metadata.clone())
    }

    fn stats(&self) -> Option<&InferenceStats> {
        Some(&self.stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::time::Duration;

    struct StubModel {
        id: usize,
    }

    impl SequenceModel for StubModel {
        fn class_count(&self) -> usize {
            7
        }

        fn predict_proba(&self, batch: &Array3<f32>) -> PipelineResult<Array2<f32>> {
            let mut out = Array2::<f32>::zeros((batch.shape()[0], 7));
            out.column_mut(0).fill(1.0);
            Ok(out)
        }

        fn engine(&self) -> &'static str {
            "stub"
        }
    }

    #[test]
    fn test_concurrent_first_load_runs_once() {
        static LOADS: AtomicUsize = AtomicUsize::new(0);
        static HANDLE: ModelHandle<StubModel> = ModelHandle::new(|_| {
            let id = LOADS.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Ok(StubModel { id })
        });

        let config = PipelineConfig::default();
        let barrier = Barrier::new(8);

        let ids: Vec<usize> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        HANDLE.get_or_load(&config).map(|m| m.id)
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap().unwrap()).collect()
        });

        assert_eq!(LOADS.load(Ordering::SeqCst), 1);
        assert_eq!(HANDLE.load_attempts(), 1);
        assert!(ids.iter().all(|&id| id == 0));
        assert!(HANDLE.is_loaded());
    }

    #[test]
    fn test_failed_load_leaves_handle_empty() {
        static FAIL_FIRST: AtomicUsize = AtomicUsize::new(0);
        static HANDLE: ModelHandle<StubModel> = ModelHandle::new(|config| {
            if FAIL_FIRST.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(PipelineError::model_unavailable(&config.model_path, "not yet"))
            } else {
                Ok(StubModel { id: 7 })
            }
        });

        let config = PipelineConfig::default();

        let first = HANDLE.get_or_load(&config);
        assert!(matches!(first, Err(PipelineError::ModelUnavailable { .. })));
        assert!(!HANDLE.is_loaded());
        assert!(!HANDLE.status().model_loaded);

        let second = HANDLE.get_or_load(&config).unwrap();
        assert_eq!(second.id, 7);
        assert!(HANDLE.is_loaded());
        assert_eq!(HANDLE.load_attempts(), 2);

        let status = HANDLE.status();
        assert!(status.model_loaded);
        assert_eq!(status.engine, "stub");
    }

    #[test]
    fn test_missing_onnx_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            model_path: dir.path().join("absent.onnx"),
            ..Default::default()
        };

        let result = OnnxClassifier::load(&config);
        assert!(matches!(result, Err(PipelineError::ModelUnavailable { .. })));
    }

    #[test]
    fn test_corrupt_onnx_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"definitely not a protobuf").unwrap();
        let config = PipelineConfig {
            model_path: path,
            ..Default::default()
        };

        let result = OnnxClassifier::load(&config);
        assert!(matches!(result, Err(PipelineError::ModelUnavailable { .. })));
    }

    #[test]
    fn test_inference_stats() {
        let stats = InferenceStats::default();
        assert_eq!(stats.avg_latency_ms(), 0.0);

        stats.record(Instant::now());
        assert_eq!(stats.count(), 1);
    }
}
