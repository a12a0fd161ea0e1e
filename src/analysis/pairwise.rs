//! Two-trace analysis: correlation, convergence/divergence events,
//! lead-lag, coherence, simultaneous peaks, and opposite movements.

use crate::analysis::stats::{self, Extremum};

#[derive(Debug, Clone)]
pub struct CorrelationResult {
    pub pearson: f64,
    pub pearson_p: f64,
    pub spearman: f64,
    pub spearman_p: f64,
}

#[derive(Debug, Clone)]
pub struct DistanceEvent {
    pub start_ms: i64,
    pub end_ms: i64,
    pub strength: f64,
}

#[derive(Debug, Clone)]
pub struct SimultaneousPeak {
    pub t_ms: i64,
}

#[derive(Debug, Clone)]
pub struct OppositeMovement {
    pub t_ms: i64,
}

#[derive(Debug, Clone)]
pub struct PairwiseResult {
    pub correlation: CorrelationResult,
    pub mean_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub convergence_events: Vec<DistanceEvent>,
    pub divergence_events: Vec<DistanceEvent>,
    pub lead_lag_ms: i64,
    pub coherence: f64,
    pub simultaneous_peaks: Vec<SimultaneousPeak>,
    pub opposite_movements: Vec<OppositeMovement>,
}

const CONVERGENCE_THRESHOLD: f64 = 0.3;
const DIVERGENCE_THRESHOLD: f64 = 0.7;
const EVENT_MIN_DURATION_MS: i64 = 500;
const EXTREMA_MIN_SEPARATION: usize = 10;
const SIMULTANEOUS_PEAK_WINDOW_MS: i64 = 500;
/// Below this many aligned samples, lead-lag and every event list report
/// empty rather than a value fitted to too little data.
const MIN_SAMPLES_FOR_EVENTS: usize = 10;

/// Analyzes two aligned series sharing `t_ms`. Both `v1` and `v2` must have
/// the same length as `t_ms`, which must be strictly increasing.
pub fn analyze(t_ms: &[i64], v1: &[f64], v2: &[f64]) -> PairwiseResult {
    assert_eq!(t_ms.len(), v1.len());
    assert_eq!(t_ms.len(), v2.len());

    let pearson = stats::pearson(v1, v2);
    let spearman = stats::spearman(v1, v2);
    let correlation = CorrelationResult {
        pearson,
        pearson_p: stats::correlation_p_value(pearson, t_ms.len()),
        spearman,
        spearman_p: stats::correlation_p_value(spearman, t_ms.len()),
    };

    let distance: Vec<f64> = v1.iter().zip(v2).map(|(a, b)| (a - b).abs()).collect();
    let mean_distance = stats::mean(&distance);
    let min_distance = distance.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_distance = distance.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let normalized = stats::min_max_normalize(&distance);

    // Fewer than 10 aligned samples isn't enough to trust an event-scale
    // result: lead-lag and every event list come back empty rather than
    // reporting a value fitted to noise.
    let enough_samples = t_ms.len() >= MIN_SAMPLES_FOR_EVENTS;

    let convergence_events = if enough_samples {
        distance_events(t_ms, &normalized, |d| d < CONVERGENCE_THRESHOLD, true)
    } else {
        Vec::new()
    };
    let divergence_events = if enough_samples {
        distance_events(t_ms, &normalized, |d| d > DIVERGENCE_THRESHOLD, false)
    } else {
        Vec::new()
    };

    let lead_lag_ms = if enough_samples { lead_lag(t_ms, v1, v2) } else { 0 };
    let coherence = {
        let d1 = stats::diffs(v1);
        let d2 = stats::diffs(v2);
        stats::pearson(&d1, &d2).abs()
    };

    let (simultaneous_peaks, opposite_movements) = if enough_samples {
        let peaks1 = stats::find_extrema(v1, Extremum::Peak, EXTREMA_MIN_SEPARATION);
        let peaks2 = stats::find_extrema(v2, Extremum::Peak, EXTREMA_MIN_SEPARATION);
        (simultaneous_peaks(t_ms, &peaks1, &peaks2), opposite_movements(t_ms, v1, v2))
    } else {
        (Vec::new(), Vec::new())
    };

    PairwiseResult {
        correlation,
        mean_distance,
        min_distance,
        max_distance,
        convergence_events,
        divergence_events,
        lead_lag_ms,
        coherence,
        simultaneous_peaks,
        opposite_movements,
    }
}

/// A maximal contiguous region matching `pred`, lasting longer than
/// [`EVENT_MIN_DURATION_MS`]; strength is `1 - mean(normalized_d)` for
/// convergence, `mean(normalized_d)` for divergence.
fn distance_events(
    t_ms: &[i64],
    normalized: &[f64],
    pred: impl Fn(f64) -> bool,
    convergence: bool,
) -> Vec<DistanceEvent> {
    let mask: Vec<bool> = normalized.iter().map(|&d| pred(d)).collect();
    stats::contiguous_runs(&mask)
        .into_iter()
        .filter_map(|(s, e)| {
            let start_ms = t_ms[s];
            let end_ms = t_ms[e - 1];
            if end_ms - start_ms <= EVENT_MIN_DURATION_MS {
                return None;
            }
            let region_mean = stats::mean(&normalized[s..e]);
            let strength = if convergence { 1.0 - region_mean } else { region_mean };
            Some(DistanceEvent {
                start_ms,
                end_ms,
                strength,
            })
        })
        .collect()
}

/// Lag (in ms) at maximum absolute cross-correlation of zero-mean `v1`,
/// `v2`, normalized by `std(v1)*std(v2)*N`. Positive lag means `v2` follows
/// `v1`. Converted to milliseconds via the series' average sample interval,
/// which is exact here since the Aligner always emits 1 ms steps.
fn lead_lag(t_ms: &[i64], v1: &[f64], v2: &[f64]) -> i64 {
    let n = v1.len();
    if n < 2 {
        return 0;
    }
    let m1 = stats::mean(v1);
    let m2 = stats::mean(v2);
    let a: Vec<f64> = v1.iter().map(|x| x - m1).collect();
    let b: Vec<f64> = v2.iter().map(|x| x - m2).collect();
    let denom = stats::std_dev(v1) * stats::std_dev(v2) * n as f64;
    if denom == 0.0 {
        return 0;
    }

    let max_lag = (n - 1) as i64;
    let mut best_lag = 0i64;
    let mut best_abs_corr = f64::NEG_INFINITY;
    for lag in -max_lag..=max_lag {
        let mut sum = 0.0;
        if lag >= 0 {
            let lag = lag as usize;
            for i in 0..n - lag {
                sum += a[i + lag] * b[i];
            }
        } else {
            let lag = (-lag) as usize;
            for i in 0..n - lag {
                sum += a[i] * b[i + lag];
            }
        }
        let corr = sum / denom;
        if corr.abs() > best_abs_corr {
            best_abs_corr = corr.abs();
            best_lag = lag;
        }
    }

    let avg_interval_ms = (t_ms.last().unwrap() - t_ms.first().unwrap()) as f64 / (n - 1) as f64;
    (best_lag as f64 * avg_interval_ms).round() as i64
}

fn simultaneous_peaks(t_ms: &[i64], peaks1: &[usize], peaks2: &[usize]) -> Vec<SimultaneousPeak> {
    let mut out = Vec::new();
    for &i in peaks1 {
        for &j in peaks2 {
            let dt = (t_ms[i] - t_ms[j]).abs();
            if dt <= SIMULTANEOUS_PEAK_WINDOW_MS {
                out.push(SimultaneousPeak {
                    t_ms: (t_ms[i] + t_ms[j]) / 2,
                });
            }
        }
    }
    out
}

fn opposite_movements(t_ms: &[i64], v1: &[f64], v2: &[f64]) -> Vec<OppositeMovement> {
    let d1 = stats::diffs(v1);
    let d2 = stats::diffs(v2);
    let threshold = 0.5 * stats::std_dev(&d1).max(stats::std_dev(&d2));
    let mut out = Vec::new();
    for i in 0..d1.len() {
        if d1[i] * d2[i] < 0.0 && d1[i].abs() > threshold && d2[i].abs() > threshold {
            out.push(OppositeMovement { t_ms: t_ms[i + 1] });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn perfectly_correlated_traces_have_zero_distance() {
        let t: Vec<i64> = (0..50).collect();
        let v1 = ramp(50, 0.0, 1.0);
        let v2 = v1.clone();
        let result = analyze(&t, &v1, &v2);
        assert!((result.correlation.pearson - 1.0).abs() < 1e-9);
        assert_eq!(result.mean_distance, 0.0);
    }

    #[test]
    fn converging_traces_produce_a_convergence_event() {
        let t: Vec<i64> = (0..1000).collect();
        let v1: Vec<f64> = (0..1000).map(|i| 10.0 - i as f64 * 0.01).collect();
        let v2: Vec<f64> = (0..1000).map(|_| 0.0).collect();
        let result = analyze(&t, &v1, &v2);
        assert!(!result.convergence_events.is_empty());
    }

    #[test]
    fn lead_lag_detects_a_shifted_copy() {
        let n = 200;
        let t: Vec<i64> = (0..n as i64).collect();
        let base: Vec<f64> = (0..n).map(|i| (i as f64 * 0.2).sin()).collect();
        let shift = 10;
        let mut shifted = vec![0.0; n];
        for i in 0..n {
            let src = i as i64 - shift;
            shifted[i] = if src >= 0 && (src as usize) < n {
                base[src as usize]
            } else {
                0.0
            };
        }
        let result = analyze(&t, &base, &shifted);
        assert_eq!(result.lead_lag_ms, shift);
    }

    #[test]
    fn opposite_movements_detected_in_mirrored_traces() {
        let n = 50;
        let t: Vec<i64> = (0..n as i64).collect();
        let v1: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin() * 10.0).collect();
        let v2: Vec<f64> = v1.iter().map(|x| -x).collect();
        let result = analyze(&t, &v1, &v2);
        assert!(!result.opposite_movements.is_empty());
    }

    #[test]
    fn fewer_than_ten_samples_yields_zero_lead_lag_and_no_events() {
        let n = 9;
        let t: Vec<i64> = (0..n as i64).collect();
        let v1: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin() * 10.0).collect();
        let v2: Vec<f64> = v1.iter().map(|x| -x).collect();
        let result = analyze(&t, &v1, &v2);
        assert_eq!(result.lead_lag_ms, 0);
        assert!(result.convergence_events.is_empty());
        assert!(result.divergence_events.is_empty());
        assert!(result.simultaneous_peaks.is_empty());
        assert!(result.opposite_movements.is_empty());
    }
}
