//! Analysis dispatch: one, two, or three-or-more aligned traces route to a
//! distinct analyzer.

pub mod aligner;
pub mod multi;
pub mod pairwise;
pub mod single;
pub mod stats;

use base::{err, Error};
use std::collections::BTreeMap;

/// The outcome of analyzing a selection of traces: exactly one variant, not
/// a struct of mostly-`None` optional fields.
#[derive(Debug, Clone)]
pub enum Results {
    Single(single::SingleResult),
    Pairwise(pairwise::PairwiseResult),
    Multi(multi::MultiResult),
}

/// Aligns `streams` (trace name -> event-driven `(t_ms, value)` pairs) and
/// dispatches to the single/pairwise/multi analyzer based on trace count.
pub fn analyze(streams: &BTreeMap<String, Vec<(i64, f64)>>) -> Result<Results, Error> {
    match streams.len() {
        0 => Err(err!(InvalidArgument, "no traces selected for analysis")),
        1 => {
            let (_, points) = streams.iter().next().unwrap();
            let (t_ms, v) = split(points);
            Ok(Results::Single(single::analyze(&t_ms, &v)))
        }
        2 => {
            let aligned = aligner::align(streams);
            if aligned.is_empty() {
                return Err(err!(FailedPrecondition, "aligned traces have too few overlapping samples"));
            }
            let mut iter = aligned.series.values();
            let v1 = iter.next().unwrap();
            let v2 = iter.next().unwrap();
            Ok(Results::Pairwise(pairwise::analyze(&aligned.times_ms, v1, v2)))
        }
        _ => {
            let aligned = aligner::align(streams);
            if aligned.is_empty() {
                return Err(err!(FailedPrecondition, "aligned traces have too few overlapping samples"));
            }
            let trace_names: Vec<String> = aligned.series.keys().cloned().collect();
            let columns: Vec<Vec<f64>> = aligned.series.values().cloned().collect();
            Ok(Results::Multi(multi::analyze(&aligned.times_ms, &trace_names, &columns)))
        }
    }
}

fn split(points: &[(i64, f64)]) -> (Vec<i64>, Vec<f64>) {
    (points.iter().map(|p| p.0).collect(), points.iter().map(|p| p.1).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_single_for_one_trace() {
        let mut streams = BTreeMap::new();
        streams.insert("a".to_string(), vec![(0, 1.0), (10, 2.0), (20, 3.0)]);
        let result = analyze(&streams).unwrap();
        assert!(matches!(result, Results::Single(_)));
    }

    #[test]
    fn dispatches_pairwise_for_two_traces() {
        let mut streams = BTreeMap::new();
        streams.insert("a".to_string(), vec![(0, 1.0), (10, 2.0), (20, 3.0)]);
        streams.insert("b".to_string(), vec![(0, 3.0), (10, 2.0), (20, 1.0)]);
        let result = analyze(&streams).unwrap();
        assert!(matches!(result, Results::Pairwise(_)));
    }

    #[test]
    fn dispatches_multi_for_three_or_more_traces() {
        let mut streams = BTreeMap::new();
        for name in ["a", "b", "c"] {
            streams.insert(name.to_string(), vec![(0, 1.0), (10, 2.0), (20, 3.0)]);
        }
        let result = analyze(&streams).unwrap();
        assert!(matches!(result, Results::Multi(_)));
    }

    #[test]
    fn empty_selection_is_an_error() {
        let streams = BTreeMap::new();
        assert!(analyze(&streams).is_err());
    }
}
