//! Feature Scaler - per-batch standardization
//!
//! Fit on the current request only. Nothing is kept between requests.

use ndarray::{Array1, Array2, Axis};

/// Column-wise `(x - mean) / std` with population standard deviation
///
/// Each column is first divided by its largest magnitude, so the variance of
/// wide-ranging but finite columns cannot overflow.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    /// Largest |x| per column
    scale: Array1<f64>,
    /// Mean and std of the column divided by `scale`
    unit_mean: Array1<f64>,
    unit_std: Array1<f64>,
}

impl StandardScaler {
    /// Welford pass per column
    pub fn fit(x: &Array2<f64>) -> Self {
        let cols = x.ncols();
        let mut scale = Array1::<f64>::zeros(cols);
        let mut unit_mean = Array1::<f64>::zeros(cols);
        let mut unit_std = Array1::<f64>::zeros(cols);

        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let max_abs = column.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
            if max_abs == 0.0 || !max_abs.is_finite() {
                continue;
            }

            let mut m = 0.0f64;
            let mut m2 = 0.0f64;
            for (k, &v) in column.iter().enumerate() {
                let u = v / max_abs;
                let delta = u - m;
                m += delta / (k + 1) as f64;
                m2 += delta * (u - m);
            }
            scale[j] = max_abs;
            unit_mean[j] = m;
            unit_std[j] = (m2 / column.len() as f64).sqrt();
        }

        Self { scale, unit_mean, unit_std }
    }

    pub fn mean(&self) -> Array1<f64> {
        &self.unit_mean * &self.scale
    }

    pub fn std(&self) -> Array1<f64> {
        &self.unit_std * &self.scale
    }

    /// Columns that scale to all zeros (no spread)
    pub fn constant_columns(&self) -> Vec<usize> {
        self.unit_std
            .iter()
            .enumerate()
            .filter(|(_, &s)| !Self::has_spread(s))
            .map(|(j, _)| j)
            .collect()
    }

    fn has_spread(std: f64) -> bool {
        std.is_finite() && std > 0.0
    }

    /// Constant columns map to 0 for every row instead of dividing by zero
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (scale, mean, std) = (self.scale[j], self.unit_mean[j], self.unit_std[j]);
            if Self::has_spread(std) {
                column.mapv_inplace(|v| (v / scale - mean) / std);
            } else {
                column.fill(0.0);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_constant_column_scales_to_zero() {
        let x = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let scaled = StandardScaler::fit(&x).transform(&x);

        assert!(scaled.column(0).iter().all(|&v| v == 0.0));
        assert!(scaled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_zero_mean_unit_variance() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let scaler = StandardScaler::fit(&x);
        let scaled = scaler.transform(&x);

        assert!((scaler.mean()[0] - 2.5).abs() < 1e-12);
        assert!((scaler.std()[0] - 1.25f64.sqrt()).abs() < 1e-12);

        let mean: f64 = scaled.column(0).sum() / 4.0;
        let var: f64 = scaled.column(0).iter().map(|v| v * v).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_columns_listed() {
        let x = array![[5.0, 1.0, 0.0], [5.0, 2.0, 0.0]];
        let scaler = StandardScaler::fit(&x);
        assert_eq!(scaler.constant_columns(), vec![0, 2]);
    }

    #[test]
    fn test_single_row() {
        let x = array![[3.0, -7.0]];
        let scaled = StandardScaler::fit(&x).transform(&x);
        assert_eq!(scaled, array![[0.0, 0.0]]);
    }

    #[test]
    fn test_huge_finite_column_keeps_its_spread() {
        let x = array![[1e200], [-1e200], [0.0]];
        let scaler = StandardScaler::fit(&x);
        let scaled = scaler.transform(&x);

        assert!(scaler.constant_columns().is_empty());
        assert!(scaled.iter().all(|v| v.is_finite()));
        assert!(scaled[[0, 0]] > 1.0);
        assert!(scaled[[1, 0]] < -1.0);
        assert_eq!(scaled[[2, 0]], 0.0);
    }
}
