//! Latency statistics for finalized load test results
//!
//! Percentiles use the nearest-rank estimator: the value at index
//! `floor(p * n / 100)` of the ascending sample set, clamped to the last
//! index. No interpolation happens between neighbouring samples, so every
//! reported percentile is a latency that was actually observed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Extremes, mean and percentiles of one latency sample set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl LatencySummary {
    /// Summarize `samples`, sorting them in place
    pub fn from_samples(samples: &mut [Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        samples.sort_unstable();
        let sum: u128 = samples.iter().map(Duration::as_nanos).sum();
        let avg = Duration::from_nanos((sum / samples.len() as u128) as u64);

        Self {
            count: samples.len(),
            min: samples[0],
            max: samples[samples.len() - 1],
            avg,
            p50: percentile(samples, 50.0),
            p90: percentile(samples, 90.0),
            p95: percentile(samples, 95.0),
            p99: percentile(samples, 99.0),
        }
    }
}

/// Nearest-rank percentile of an ascending slice (zero for an empty slice)
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let last = sorted.len() - 1;
    let index = ((p * sorted.len() as f64) / 100.0).floor();
    let index = if index.is_nan() || index < 0.0 {
        0
    } else {
        (index as usize).min(last)
    };
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|&v| Duration::from_millis(v)).collect()
    }

    #[test]
    fn test_empty_summary() {
        let summary = LatencySummary::from_samples(&mut []);
        assert_eq!(summary, LatencySummary::default());
        assert_eq!(percentile(&[], 99.0), Duration::ZERO);
    }

    #[test]
    fn test_single_sample() {
        let mut samples = ms(&[42]);
        let summary = LatencySummary::from_samples(&mut samples);
        assert_eq!(summary.min, Duration::from_millis(42));
        assert_eq!(summary.p50, Duration::from_millis(42));
        assert_eq!(summary.p99, Duration::from_millis(42));
        assert_eq!(summary.max, Duration::from_millis(42));
        assert_eq!(summary.avg, Duration::from_millis(42));
    }

    #[test]
    fn test_nearest_rank_indices() {
        // 1..=100 ms: index floor(p * 100 / 100) = p, so pX is (X + 1) ms
        let sorted: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        assert_eq!(percentile(&sorted, 50.0), Duration::from_millis(51));
        assert_eq!(percentile(&sorted, 90.0), Duration::from_millis(91));
        assert_eq!(percentile(&sorted, 95.0), Duration::from_millis(96));
        assert_eq!(percentile(&sorted, 99.0), Duration::from_millis(100));
    }

    #[test]
    fn test_percentile_is_not_interpolated() {
        let sorted = ms(&[10, 20, 30, 40]);
        // floor(50 * 4 / 100) = 2
        assert_eq!(percentile(&sorted, 50.0), Duration::from_millis(30));
        // floor(90 * 4 / 100) = 3
        assert_eq!(percentile(&sorted, 90.0), Duration::from_millis(40));
    }

    #[test]
    fn test_percentile_clamps_to_last_index() {
        let sorted = ms(&[1, 2, 3]);
        assert_eq!(percentile(&sorted, 100.0), Duration::from_millis(3));
        assert_eq!(percentile(&sorted, 250.0), Duration::from_millis(3));
    }

    #[test]
    fn test_summary_sorts_unordered_input() {
        let mut samples = ms(&[30, 10, 50, 20, 40]);
        let summary = LatencySummary::from_samples(&mut samples);
        assert_eq!(summary.min, Duration::from_millis(10));
        assert_eq!(summary.max, Duration::from_millis(50));
        assert_eq!(summary.avg, Duration::from_millis(30));
        assert_eq!(summary.p50, Duration::from_millis(30));
        assert_eq!(summary.count, 5);
    }

    proptest! {
        #[test]
        fn prop_percentiles_are_ordered(values in prop::collection::vec(0u64..10_000_000, 1..500)) {
            let mut samples: Vec<Duration> = values.iter().map(|&v| Duration::from_micros(v)).collect();
            let s = LatencySummary::from_samples(&mut samples);
            prop_assert!(s.min <= s.p50);
            prop_assert!(s.p50 <= s.p90);
            prop_assert!(s.p90 <= s.p95);
            prop_assert!(s.p95 <= s.p99);
            prop_assert!(s.p99 <= s.max);
            prop_assert!(s.min <= s.avg && s.avg <= s.max);
        }
    }
}
