//! Resamples one or more event-driven `(t_ms, value)` series onto a common
//! integer-millisecond timeline.

use std::collections::BTreeMap;

/// A resampled series for every input name, all sharing `times_ms`.
#[derive(Debug, Clone, Default)]
pub struct Aligned {
    pub times_ms: Vec<i64>,
    pub series: BTreeMap<String, Vec<f64>>,
}

impl Aligned {
    pub fn is_empty(&self) -> bool {
        self.times_ms.len() < 2
    }
}

/// Resamples `streams` (name -> strictly-increasing `(t_ms, value)` pairs)
/// onto a shared timeline.
///
/// Steps:
///   (i) common-range = `[max(min t_i), min(max t_i)]`; falls back to the
///       broadest range (`[min(min t_i), max(max t_i)]`) if that's empty;
///   (ii) common-timeline = integer ms across the range;
///   (iii) each series resampled by last-value-carried-forward, with the
///       boundary before its first sample held at its first value.
///
/// Returns an empty `Aligned` if fewer than two samples survive in any
/// input series.
pub fn align(streams: &BTreeMap<String, Vec<(i64, f64)>>) -> Aligned {
    if streams.values().any(|s| s.len() < 2) || streams.is_empty() {
        return Aligned::default();
    }

    let mins: Vec<i64> = streams.values().map(|s| s[0].0).collect();
    let maxs: Vec<i64> = streams.values().map(|s| s.last().unwrap().0).collect();

    let common_start = mins.iter().cloned().max().unwrap();
    let common_end = maxs.iter().cloned().min().unwrap();
    let (start, end) = if common_start <= common_end {
        (common_start, common_end)
    } else {
        (
            mins.iter().cloned().min().unwrap(),
            maxs.iter().cloned().max().unwrap(),
        )
    };

    let times_ms: Vec<i64> = (start..=end).collect();
    if times_ms.len() < 2 {
        return Aligned::default();
    }

    let mut series = BTreeMap::new();
    for (name, points) in streams {
        series.insert(name.clone(), resample_lvcf(points, &times_ms));
    }
    Aligned { times_ms, series }
}

/// Resamples one series at `times_ms` using last-value-carried-forward;
/// times before the series' first sample hold its first value.
fn resample_lvcf(points: &[(i64, f64)], times_ms: &[i64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(times_ms.len());
    let mut idx = 0usize;
    let mut current = points[0].1;
    for &t in times_ms {
        while idx + 1 < points.len() && points[idx + 1].0 <= t {
            idx += 1;
            current = points[idx].1;
        }
        if points[idx].0 > t {
            out.push(points[0].1);
        } else {
            out.push(current);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_ranges_use_the_intersection() {
        let mut streams = BTreeMap::new();
        streams.insert("a".to_string(), vec![(0, 1.0), (10, 2.0), (20, 3.0)]);
        streams.insert("b".to_string(), vec![(5, 10.0), (15, 20.0)]);
        let aligned = align(&streams);
        assert_eq!(*aligned.times_ms.first().unwrap(), 5);
        assert_eq!(*aligned.times_ms.last().unwrap(), 15);
        assert_eq!(aligned.times_ms.len(), 11);
    }

    #[test]
    fn last_value_carried_forward_between_samples() {
        let mut streams = BTreeMap::new();
        streams.insert("a".to_string(), vec![(0, 1.0), (5, 2.0)]);
        streams.insert("b".to_string(), vec![(0, 10.0), (5, 20.0)]);
        let aligned = align(&streams);
        let a = &aligned.series["a"];
        assert_eq!(a[0], 1.0);
        assert_eq!(a[2], 1.0);
        assert_eq!(a[5], 2.0);
    }

    #[test]
    fn disjoint_ranges_fall_back_to_broadest_span() {
        let mut streams = BTreeMap::new();
        streams.insert("a".to_string(), vec![(0, 1.0), (10, 2.0)]);
        streams.insert("b".to_string(), vec![(20, 3.0), (30, 4.0)]);
        let aligned = align(&streams);
        assert_eq!(*aligned.times_ms.first().unwrap(), 0);
        assert_eq!(*aligned.times_ms.last().unwrap(), 30);
    }

    #[test]
    fn fewer_than_two_samples_in_any_input_yields_empty_result() {
        let mut streams = BTreeMap::new();
        streams.insert("a".to_string(), vec![(0, 1.0)]);
        streams.insert("b".to_string(), vec![(0, 1.0), (5, 2.0)]);
        let aligned = align(&streams);
        assert!(aligned.is_empty());
    }
}
