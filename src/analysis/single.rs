//! Single-trace descriptive statistics, change points, peaks/valleys, and
//! volatility windows.

use crate::analysis::stats::{self, Extremum};

#[derive(Debug, Clone)]
pub struct Descriptive {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub p25: f64,
    pub p75: f64,
    pub iqr: f64,
}

#[derive(Debug, Clone)]
pub struct Temporal {
    pub duration_ms: i64,
    pub sample_count: usize,
    pub activity_rate_hz: f64,
    pub percent_active: f64,
}

#[derive(Debug, Clone)]
pub struct VolatilityWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

#[derive(Debug, Clone)]
pub struct SingleResult {
    pub descriptive: Descriptive,
    pub temporal: Temporal,
    /// Indices into the input series flagged as change points.
    pub change_points: Vec<usize>,
    pub peaks: Vec<usize>,
    pub valleys: Vec<usize>,
    pub volatility_windows: Vec<VolatilityWindow>,
}

const CHANGE_POINT_K: f64 = 2.0;
const EXTREMA_MIN_SEPARATION: usize = 10;
const VOLATILITY_MIN_RUN: usize = 6;

/// Analyzes one aligned `(t_ms[], v[])` series. `t_ms` must be strictly
/// increasing and the same length as `v`. An empty series returns all-zero
/// statistics and empty event lists rather than panicking, since a stream
/// with no samples beyond its synthetic `INIT` marker is a normal, if
/// uninteresting, input.
pub fn analyze(t_ms: &[i64], v: &[f64]) -> SingleResult {
    assert_eq!(t_ms.len(), v.len());
    if v.is_empty() {
        return SingleResult {
            descriptive: Descriptive {
                mean: 0.0,
                median: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                range: 0.0,
                skewness: 0.0,
                kurtosis: 0.0,
                p25: 0.0,
                p75: 0.0,
                iqr: 0.0,
            },
            temporal: Temporal {
                duration_ms: 0,
                sample_count: 0,
                activity_rate_hz: 0.0,
                percent_active: 0.0,
            },
            change_points: Vec::new(),
            peaks: Vec::new(),
            valleys: Vec::new(),
            volatility_windows: Vec::new(),
        };
    }

    let descriptive = Descriptive {
        mean: stats::mean(v),
        median: stats::median(v),
        std_dev: stats::std_dev(v),
        min: v.iter().cloned().fold(f64::INFINITY, f64::min),
        max: v.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        range: {
            let lo = v.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            hi - lo
        },
        skewness: stats::skewness(v),
        kurtosis: stats::kurtosis(v),
        p25: stats::percentile(v, 25.0),
        p75: stats::percentile(v, 75.0),
        iqr: stats::percentile(v, 75.0) - stats::percentile(v, 25.0),
    };

    let duration_ms = t_ms.last().unwrap() - t_ms.first().unwrap();
    let abs_diffs = stats::abs_diffs(v);
    let activity_rate_hz = if duration_ms > 0 {
        v.len() as f64 / (duration_ms as f64 / 1000.0)
    } else {
        0.0
    };
    let percent_active = if abs_diffs.is_empty() {
        0.0
    } else {
        let threshold = 0.1 * descriptive.std_dev;
        abs_diffs.iter().filter(|&&d| d > threshold).count() as f64 / abs_diffs.len() as f64
    };
    let temporal = Temporal {
        duration_ms,
        sample_count: v.len(),
        activity_rate_hz,
        percent_active,
    };

    let change_points = if abs_diffs.is_empty() {
        Vec::new()
    } else {
        let threshold = stats::mean(&abs_diffs) + CHANGE_POINT_K * stats::std_dev(&abs_diffs);
        // `abs_diffs[i]` is `|v[i+1]-v[i]|`; the change point is reported at
        // the later sample index.
        abs_diffs
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > threshold)
            .map(|(i, _)| i + 1)
            .collect()
    };

    let peaks = stats::find_extrema(v, Extremum::Peak, EXTREMA_MIN_SEPARATION);
    let valleys = stats::find_extrema(v, Extremum::Valley, EXTREMA_MIN_SEPARATION);

    let volatility_windows = volatility_windows(t_ms, v);

    SingleResult {
        descriptive,
        temporal,
        change_points,
        peaks,
        valleys,
        volatility_windows,
    }
}

fn volatility_windows(t_ms: &[i64], v: &[f64]) -> Vec<VolatilityWindow> {
    let n = v.len();
    let window = (n / 10).max(1).min(50);
    if window < 2 || n < window {
        return Vec::new();
    }
    let mut rolling_var = vec![0.0; n];
    for i in 0..n {
        let lo = i.saturating_sub(window / 2);
        let hi = (i + window / 2 + 1).min(n);
        rolling_var[i] = stats::variance(&v[lo..hi]);
    }
    let threshold = stats::mean(&rolling_var) + stats::std_dev(&rolling_var);
    let above: Vec<bool> = rolling_var.iter().map(|&x| x > threshold).collect();
    stats::contiguous_runs(&above)
        .into_iter()
        .filter(|(s, e)| e - s >= VOLATILITY_MIN_RUN)
        .map(|(s, e)| VolatilityWindow {
            start_ms: t_ms[s],
            end_ms: t_ms[e - 1],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> (Vec<i64>, Vec<f64>) {
        let t: Vec<i64> = (0..n as i64).collect();
        let v: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        (t, v)
    }

    #[test]
    fn empty_trace_returns_zeros_not_a_panic() {
        let result = analyze(&[], &[]);
        assert_eq!(result.descriptive.mean, 0.0);
        assert_eq!(result.temporal.sample_count, 0);
        assert!(result.change_points.is_empty());
        assert!(result.peaks.is_empty());
        assert!(result.valleys.is_empty());
    }

    #[test]
    fn descriptive_stats_of_constant_series() {
        let t: Vec<i64> = (0..10).collect();
        let v = vec![5.0; 10];
        let result = analyze(&t, &v);
        assert_eq!(result.descriptive.mean, 5.0);
        assert_eq!(result.descriptive.std_dev, 0.0);
        assert_eq!(result.descriptive.range, 0.0);
        assert!(result.change_points.is_empty());
    }

    #[test]
    fn change_point_detects_a_sharp_jump() {
        let t: Vec<i64> = (0..20).collect();
        let mut v = vec![0.0; 20];
        v[10] = 100.0;
        let result = analyze(&t, &v);
        assert!(result.change_points.contains(&10));
    }

    #[test]
    fn activity_rate_reflects_sample_count_over_duration() {
        let t: Vec<i64> = (0..1000).step_by(100).collect(); // 0..900 ms, 10 samples
        let v = vec![1.0; t.len()];
        let result = analyze(&t, &v);
        assert_eq!(result.temporal.duration_ms, 900);
        assert!((result.temporal.activity_rate_hz - (10.0 / 0.9)).abs() < 1e-9);
    }

    #[test]
    fn peaks_and_valleys_found_in_oscillating_series() {
        let (t, v) = series(200);
        let result = analyze(&t, &v);
        assert!(!result.peaks.is_empty());
        assert!(!result.valleys.is_empty());
    }
}
