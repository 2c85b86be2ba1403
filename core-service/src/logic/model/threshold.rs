//! Contamination Threshold
//!
//! Turns raw isolation scores into labels. The offset is the `contamination`
//! percentile of the batch's own scores, so roughly that share of records
//! falls below it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContaminationThreshold {
    /// Expected outlier share, in (0, 0.5]
    pub contamination: f64,

    /// Raw scores strictly below this are anomalies
    pub offset: f64,
}

impl ContaminationThreshold {
    /// Calibrate the offset on the scores of the batch being labeled
    pub fn calibrate(scores: &[f64], contamination: f64) -> Self {
        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);

        let offset = percentile(&sorted, contamination * 100.0).unwrap_or(f64::NEG_INFINITY);

        Self { contamination, offset }
    }

    pub fn is_anomaly(&self, score: f64) -> bool {
        score < self.offset
    }
}

/// Percentile with linear interpolation between closest ranks.
/// `sorted` must be ascending; `q` is in [0, 100].
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 50.0), Some(3.0));
        assert_eq!(percentile(&sorted, 100.0), Some(5.0));
        assert!((percentile(&sorted, 10.0).unwrap() - 1.4).abs() < 1e-12);
        assert_eq!(percentile(&[], 10.0), None);
    }

    #[test]
    fn test_ten_percent_of_hundred() {
        let scores: Vec<f64> = (0..100).map(|i| -(i as f64) / 100.0).collect();
        let threshold = ContaminationThreshold::calibrate(&scores, 0.1);

        let flagged = scores.iter().filter(|&&s| threshold.is_anomaly(s)).count();
        assert_eq!(flagged, 10);
    }

    #[test]
    fn test_ties_are_not_flagged() {
        let scores = vec![-0.5; 20];
        let threshold = ContaminationThreshold::calibrate(&scores, 0.1);

        assert_eq!(threshold.offset, -0.5);
        assert!(scores.iter().all(|&s| !threshold.is_anomaly(s)));
    }
}
