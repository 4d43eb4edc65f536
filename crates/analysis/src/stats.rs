//! Summary statistics over a window of measurements.

use serde::{Deserialize, Serialize};

/// Statistics of one measurement over a window of entries.
///
/// A window without samples is a valid result: `sample_count` is zero and
/// every other field is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation (divides by `sample_count`).
    pub stddev: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Number of samples the statistics were computed from.
    pub sample_count: usize,
}

impl WindowStats {
    /// The "no data" result.
    pub const NO_DATA: WindowStats = WindowStats {
        mean: 0.0,
        stddev: 0.0,
        min: 0.0,
        max: 0.0,
        sample_count: 0,
    };

    /// Compute statistics for a set of samples.
    pub fn from_values(values: &[f64]) -> Self {
        let Some(&first) = values.first() else {
            return Self::NO_DATA;
        };
        let (min, max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        // Identical samples have no spread; avoid rounding noise in the mean.
        if min == max {
            return Self {
                mean: min,
                stddev: 0.0,
                min,
                max,
                sample_count: values.len(),
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            stddev: variance.sqrt(),
            min,
            max,
            sample_count: values.len(),
        }
    }

    /// Whether any sample contributed.
    pub fn has_data(&self) -> bool {
        self.sample_count > 0
    }

    /// Distance of `value` from the mean in standard deviations; `None` when
    /// the window has no spread.
    pub fn deviation_sigma(&self, value: f64) -> Option<f64> {
        (self.stddev > 0.0).then(|| (value - self.mean) / self.stddev)
    }

    /// Whether `value` deviates from the mean by more than
    /// `threshold_stddevs` standard deviations. A window without spread
    /// never flags.
    pub fn is_outlier(&self, value: f64, threshold_stddevs: f64) -> bool {
        self.stddev > 0.0 && (value - self.mean).abs() > threshold_stddevs * self.stddev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_is_no_data() {
        let stats = WindowStats::from_values(&[]);
        assert_eq!(stats, WindowStats::NO_DATA);
        assert!(!stats.has_data());
        assert!(!stats.is_outlier(1e9, 0.0));
    }

    #[test]
    fn test_single_sample_has_zero_stddev() {
        let stats = WindowStats::from_values(&[42.5]);
        assert_eq!(stats.sample_count, 1);
        assert_eq!(stats.mean, 42.5);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.deviation_sigma(50.0), None);
    }

    #[test]
    fn test_identical_samples_have_zero_stddev() {
        let stats = WindowStats::from_values(&[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.mean, 0.1);
    }

    #[test]
    fn test_population_standard_deviation() {
        let stats = WindowStats::from_values(&[10.0, 10.0, 30.0]);
        assert!((stats.mean - 16.667).abs() < 0.01);
        assert!((stats.stddev - 9.43).abs() < 0.01);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 30.0);
        assert_eq!(stats.sample_count, 3);

        let stats = WindowStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.stddev, 2.0);
    }

    #[test]
    fn test_outlier_detection() {
        let stats = WindowStats::from_values(&[10.0, 10.0, 30.0]);
        assert!(!stats.is_outlier(10.0, 1.0));
        assert!(stats.is_outlier(100.0, 1.0));
        assert!(stats.is_outlier(-100.0, 1.0));
        let sigma = stats.deviation_sigma(30.0).unwrap();
        assert!((sigma - 1.414).abs() < 0.01);
    }
}
