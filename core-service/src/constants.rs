//! Central Configuration Constants
//!
//! Single source of truth for all pipeline defaults.
//! Every default can be overridden through the environment.

use std::path::PathBuf;

/// Default location of the exported classifier, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "models/FINAL_CICIDS_MODEL.onnx";

/// Expected share of outliers in a batch
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Number of isolation trees
pub const DEFAULT_TREE_COUNT: usize = 100;

/// Sub-sample size per isolation tree (capped by batch size)
pub const DEFAULT_MAX_SAMPLES: usize = 256;

/// Seed for tree construction
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Rows per ONNX forward pass
pub const DEFAULT_INFERENCE_BATCH: usize = 1024;

/// Classifier output classes (0 = normal)
pub const CLASS_COUNT: usize = 7;

/// Index of the normal class
pub const NORMAL_CLASS: usize = 0;

/// Sequence steps fed to the classifier
pub const SEQUENCE_STEPS: usize = 10;

/// Attack category per classifier class, indexed by class.
/// Classes past the end keep their `class_N` key.
pub const CLASS_LABELS: &[&str] = &[
    "Normal Traffic",
    "DoS/DDoS Attacks",
    "Port Scans",
    "Bot Attacks",
    "Infiltration Attempts",
    "Web Attacks",
    "Brute Force Attacks",
    "Heartbleed Exploits",
    "SQL Injection",
];

/// Anomaly rate (%) above which a batch is a HIGH threat
pub const THREAT_HIGH_RATE: f64 = 20.0;

/// Anomaly rate (%) above which a batch is a MEDIUM threat
pub const THREAT_MEDIUM_RATE: f64 = 10.0;

/// Values per sequence step
pub const SEQUENCE_STEP_WIDTH: usize = 2;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get classifier model path from environment or use default
pub fn get_model_path() -> PathBuf {
    std::env::var("INTRUSCAN_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH))
}

/// Get contamination fraction from environment or use default
pub fn get_contamination() -> f64 {
    std::env::var("INTRUSCAN_CONTAMINATION")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CONTAMINATION)
}

/// Get isolation tree count from environment or use default
pub fn get_tree_count() -> usize {
    std::env::var("INTRUSCAN_TREES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TREE_COUNT)
}

/// Get per-tree sample size from environment or use default
pub fn get_max_samples() -> usize {
    std::env::var("INTRUSCAN_MAX_SAMPLES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_SAMPLES)
}

/// Get forest seed from environment or use default
pub fn get_random_seed() -> u64 {
    std::env::var("INTRUSCAN_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RANDOM_SEED)
}

/// Get inference chunk size from environment or use default
pub fn get_inference_batch() -> usize {
    std::env::var("INTRUSCAN_INFERENCE_BATCH")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_INFERENCE_BATCH)
}
