//! Logic Module - Analysis Pipeline
//!
//! Stages, leaf to root:
//! - `dataset/` - CSV bytes into a typed flow table
//! - `features/` - allow-list selection, imputation, scaling
//! - `model/` - shape adapter, isolation forest, ONNX classifier
//! - `scoring/` - pluggable scoring strategies
//! - `report/` - aggregation into the analysis report
//! - `pipeline/` - orchestration and the request boundary

pub mod config;
pub mod error;

pub mod dataset;
pub mod features;
pub mod model;
pub mod scoring;
pub mod report;
pub mod pipeline;
