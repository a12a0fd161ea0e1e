//! Converts event-driven axis/button series into regularly sampled
//! timeseries at a fixed rate.

use base::{err, Error};

/// Allowed output sample rates.
pub const ALLOWED_RATES_HZ: [u32; 6] = [1, 5, 10, 20, 30, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    ForwardFill,
    Linear,
}

/// Converts event-driven series to equispaced samples at `rate_hz`.
/// `rate_hz` must be one of [`ALLOWED_RATES_HZ`].
pub struct TimeseriesConverter {
    period_ms: f64,
}

impl TimeseriesConverter {
    pub fn new(rate_hz: u32) -> Result<Self, Error> {
        if !ALLOWED_RATES_HZ.contains(&rate_hz) {
            return Err(err!(InvalidArgument, "unsupported sample rate {rate_hz} Hz"));
        }
        Ok(TimeseriesConverter {
            period_ms: 1000.0 / rate_hz as f64,
        })
    }

    fn timeline(&self, t_max_ms: i64) -> Vec<i64> {
        if t_max_ms <= 0 {
            return vec![0];
        }
        let n = (t_max_ms as f64 / self.period_ms).ceil() as i64;
        (0..=n).map(|i| (i as f64 * self.period_ms).round() as i64).collect()
    }

    /// Converts an axis event series `(t_ms[], v[])` (strictly increasing
    /// `t_ms`, non-empty) to equispaced integer-rounded samples.
    pub fn convert_axis(&self, t_ms: &[i64], v: &[f64], interp: Interpolation) -> (Vec<i64>, Vec<i32>) {
        assert_eq!(t_ms.len(), v.len());
        assert!(!t_ms.is_empty());
        let t_max = *t_ms.last().unwrap();
        let timeline = self.timeline(t_max);
        let values = match interp {
            Interpolation::ForwardFill => forward_fill(t_ms, v, &timeline),
            Interpolation::Linear => linear_interpolate(t_ms, v, &timeline),
        };
        (timeline, values.into_iter().map(|x| x.round() as i32).collect())
    }

    /// Converts press/release event times to a `{0,1}` state at each
    /// equispaced sample.
    pub fn convert_buttons(&self, presses_ms: &[i64], releases_ms: &[i64], t_max_ms: i64) -> (Vec<i64>, Vec<u8>) {
        let mut changes: Vec<(i64, u8)> = presses_ms
            .iter()
            .map(|&t| (t, 1u8))
            .chain(releases_ms.iter().map(|&t| (t, 0u8)))
            .collect();
        changes.sort_by_key(|&(t, _)| t);

        let timeline = self.timeline(t_max_ms);
        let mut out = Vec::with_capacity(timeline.len());
        let mut idx = 0usize;
        let mut state = 0u8;
        for &t in &timeline {
            while idx < changes.len() && changes[idx].0 <= t {
                state = changes[idx].1;
                idx += 1;
            }
            out.push(state);
        }
        (timeline, out)
    }
}

fn forward_fill(t_ms: &[i64], v: &[f64], timeline: &[i64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(timeline.len());
    let mut idx = 0usize;
    for &t in timeline {
        while idx + 1 < t_ms.len() && t_ms[idx + 1] <= t {
            idx += 1;
        }
        out.push(if t_ms[idx] > t { v[0] } else { v[idx] });
    }
    out
}

fn linear_interpolate(t_ms: &[i64], v: &[f64], timeline: &[i64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(timeline.len());
    let mut idx = 0usize;
    for &t in timeline {
        if t <= t_ms[0] {
            out.push(v[0]);
            continue;
        }
        if t >= *t_ms.last().unwrap() {
            out.push(*v.last().unwrap());
            continue;
        }
        while idx + 1 < t_ms.len() && t_ms[idx + 1] < t {
            idx += 1;
        }
        let (t0, t1) = (t_ms[idx], t_ms[idx + 1]);
        let (v0, v1) = (v[idx], v[idx + 1]);
        let frac = if t1 > t0 { (t - t0) as f64 / (t1 - t0) as f64 } else { 0.0 };
        out.push(v0 + (v1 - v0) * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_rate() {
        assert!(TimeseriesConverter::new(7).is_err());
    }

    #[test]
    fn forward_fill_holds_last_value() {
        let conv = TimeseriesConverter::new(10).unwrap(); // 100ms period
        let t = vec![0, 250];
        let v = vec![1.0, 2.0];
        let (timeline, values) = conv.convert_axis(&t, &v, Interpolation::ForwardFill);
        assert_eq!(timeline, vec![0, 100, 200, 300]);
        assert_eq!(values, vec![1, 1, 1, 2]);
    }

    #[test]
    fn linear_interpolation_between_samples() {
        let conv = TimeseriesConverter::new(10).unwrap(); // 100ms period
        let t = vec![0, 200];
        let v = vec![0.0, 20.0];
        let (_, values) = conv.convert_axis(&t, &v, Interpolation::Linear);
        assert_eq!(values, vec![0, 10, 20]);
    }

    #[test]
    fn buttons_track_press_release_state() {
        let conv = TimeseriesConverter::new(10).unwrap();
        let (timeline, states) = conv.convert_buttons(&[50], &[150], 200);
        assert_eq!(timeline, vec![0, 100, 200]);
        assert_eq!(states, vec![0, 1, 0]);
    }
}
