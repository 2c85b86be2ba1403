//! Shape Adapter
//!
//! Statistical scoring takes the scaled matrix as is. The sequence classifier
//! takes a fixed `(records, steps, step_width)` tensor: the first
//! `steps * step_width` columns, zero-padded on the right when there are fewer.
//! Columns past that width are dropped.

use ndarray::{s, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::constants::{SEQUENCE_STEPS, SEQUENCE_STEP_WIDTH};
use crate::logic::error::{PipelineError, PipelineResult};

/// Per-record sequence layout expected by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceShape {
    pub steps: usize,
    pub step_width: usize,
}

impl Default for SequenceShape {
    fn default() -> Self {
        Self {
            steps: SEQUENCE_STEPS,
            step_width: SEQUENCE_STEP_WIDTH,
        }
    }
}

impl SequenceShape {
    /// Flat column count consumed per record
    pub fn width(&self) -> usize {
        self.steps * self.step_width
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.width() == 0 {
            return Err(PipelineError::shape(
                "non-empty sequence shape",
                format!("{}x{}", self.steps, self.step_width),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// (records × features), f64
    Flat,
    /// (records × steps × step_width), f32
    Sequence(SequenceShape),
}

#[derive(Debug, Clone)]
pub enum ShapedInput {
    Flat(Array2<f64>),
    Sequence(Array3<f32>),
}

impl ShapedInput {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            ShapedInput::Flat(x) => x.shape().to_vec(),
            ShapedInput::Sequence(t) => t.shape().to_vec(),
        }
    }
}

/// What the adapter did to the column count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeAdjustment {
    /// Trailing columns dropped
    pub truncated: usize,
    /// Zero columns appended
    pub padded: usize,
}

pub fn adapt(matrix: Array2<f64>, shape: InputShape) -> PipelineResult<(ShapedInput, ShapeAdjustment)> {
    match shape {
        InputShape::Flat => Ok((ShapedInput::Flat(matrix), ShapeAdjustment::default())),
        InputShape::Sequence(seq) => {
            let (tensor, adjustment) = to_sequences(&matrix, seq)?;
            Ok((ShapedInput::Sequence(tensor), adjustment))
        }
    }
}

/// Truncate or right-pad to `shape.width()` columns, then reshape row-major
pub fn to_sequences(matrix: &Array2<f64>, shape: SequenceShape) -> PipelineResult<(Array3<f32>, ShapeAdjustment)> {
    shape.validate()?;

    let rows = matrix.nrows();
    let cols = matrix.ncols();
    let width = shape.width();
    let keep = cols.min(width);

    let adjustment = ShapeAdjustment {
        truncated: cols.saturating_sub(width),
        padded: width.saturating_sub(cols),
    };
    if adjustment.truncated > 0 {
        log::debug!("Dropping {} columns beyond sequence width {}", adjustment.truncated, width);
    }

    let mut flat = Array2::<f32>::zeros((rows, width));
    flat.slice_mut(s![.., ..keep])
        .assign(&matrix.slice(s![.., ..keep]).mapv(|v| v as f32));

    let tensor = flat
        .into_shape_with_order((rows, shape.steps, shape.step_width))
        .map_err(|e| PipelineError::shape(format!("({}, {}, {})", rows, shape.steps, shape.step_width), e))?;

    Ok((tensor, adjustment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(i, j)| (i * 100 + j) as f64)
    }

    #[test]
    fn test_wide_matrix_is_truncated_to_first_20() {
        let (tensor, adj) = to_sequences(&ramp(3, 25), SequenceShape::default()).unwrap();

        assert_eq!(tensor.shape(), &[3, 10, 2]);
        assert_eq!(adj, ShapeAdjustment { truncated: 5, padded: 0 });
        // last kept column is index 19; 20..25 are gone
        assert_eq!(tensor[[1, 9, 1]], 119.0);
        assert!(!tensor.iter().any(|&v| (v as usize) % 100 >= 20));
    }

    #[test]
    fn test_narrow_matrix_is_zero_padded() {
        let (tensor, adj) = to_sequences(&ramp(2, 12), SequenceShape::default()).unwrap();

        assert_eq!(tensor.shape(), &[2, 10, 2]);
        assert_eq!(adj, ShapeAdjustment { truncated: 0, padded: 8 });
        assert_eq!(tensor[[1, 5, 1]], 111.0);
        for step in 6..10 {
            assert_eq!(tensor[[1, step, 0]], 0.0);
            assert_eq!(tensor[[1, step, 1]], 0.0);
        }
    }

    #[test]
    fn test_row_major_layout() {
        let (tensor, _) = to_sequences(&ramp(1, 20), SequenceShape::default()).unwrap();

        for step in 0..10 {
            assert_eq!(tensor[[0, step, 0]], (2 * step) as f32);
            assert_eq!(tensor[[0, step, 1]], (2 * step + 1) as f32);
        }
    }

    #[test]
    fn test_shape_is_always_records_10_2() {
        for cols in [1, 19, 20, 21, 52] {
            let (tensor, _) = to_sequences(&ramp(4, cols), SequenceShape::default()).unwrap();
            assert_eq!(tensor.shape(), &[4, 10, 2], "cols = {}", cols);
        }
    }

    #[test]
    fn test_flat_passes_through() {
        let (input, adj) = adapt(ramp(5, 3), InputShape::Flat).unwrap();

        assert_eq!(input.shape(), vec![5, 3]);
        assert_eq!(adj, ShapeAdjustment::default());
    }

    #[test]
    fn test_empty_sequence_shape_is_rejected() {
        let shape = SequenceShape { steps: 0, step_width: 2 };
        let result = to_sequences(&ramp(1, 4), shape);

        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));
    }
}
