//! Imputer / Sanitizer
//!
//! Builds the numeric matrix for a [`FeatureSet`]. Missing cells get a
//! per-column fallback and infinities become 0, so the output is all finite.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::logic::dataset::FlowTable;
use crate::logic::error::{PipelineError, PipelineResult};
use super::selector::FeatureSet;

/// Fallback for missing cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Column mean over present values of this batch
    Mean,
    /// Constant 0
    Zero,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputeStats {
    /// Missing cells replaced by the fallback
    pub filled_cells: usize,
    /// ±inf cells replaced by 0
    pub infinite_replaced: usize,
    /// Columns with no present value; their mean is taken as 0
    pub degenerate_columns: Vec<String>,
}

/// Materialize `features` from `table` as a (records × features) matrix.
///
/// Infinities are neutralized before means are taken, so they count as a
/// present 0 in the mean.
pub fn impute(
    table: &FlowTable,
    features: &FeatureSet,
    policy: FillPolicy,
) -> PipelineResult<(Array2<f64>, ImputeStats)> {
    let rows = table.row_count();
    let mut matrix = Array2::<f64>::zeros((rows, features.len()));
    let mut stats = ImputeStats::default();

    for (j, name) in features.names().iter().enumerate() {
        let values = table
            .numeric(name)
            .ok_or_else(|| PipelineError::shape(format!("numeric column '{}'", name), "absent column"))?;

        let mut mean = 0.0f64;
        let mut present = 0usize;
        for value in values.iter().flatten() {
            let v = if value.is_infinite() { 0.0 } else { *value };
            present += 1;
            mean += (v - mean) / present as f64;
        }

        let fill = match policy {
            FillPolicy::Zero => 0.0,
            FillPolicy::Mean if present == 0 => {
                if rows > 0 {
                    log::warn!("Column '{}' has no values, filling with 0", name);
                    stats.degenerate_columns.push(name.clone());
                }
                0.0
            }
            FillPolicy::Mean => mean,
        };

        let mut column = matrix.column_mut(j);
        for (cell, value) in column.iter_mut().zip(values) {
            *cell = match value {
                Some(v) if v.is_infinite() => {
                    stats.infinite_replaced += 1;
                    0.0
                }
                Some(v) => *v,
                None => {
                    stats.filled_cells += 1;
                    fill
                }
            };
        }
    }

    if stats.filled_cells > 0 || stats.infinite_replaced > 0 {
        log::debug!(
            "Imputed {} missing cells ({:?}), replaced {} infinite values",
            stats.filled_cells,
            policy,
            stats.infinite_replaced
        );
    }

    Ok((matrix, stats))
}
