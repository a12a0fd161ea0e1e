//! Three-or-more-trace analysis: correlation matrix, PCA, k-means
//! clustering, all-trace convergence/divergence, and regime changes.

use crate::analysis::stats;
use nalgebra::{DMatrix, SymmetricEigen};

#[derive(Debug, Clone)]
pub struct PrincipalComponents {
    pub explained_variance_ratio: Vec<f64>,
    /// Row `i` is the `i`-th component vector, length = number of traces.
    pub components: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct Clustering {
    pub k: usize,
    /// Cluster assignment per sample.
    pub labels: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct RegimeChange {
    pub t_ms: i64,
    pub norm: f64,
}

#[derive(Debug, Clone)]
pub struct MultiResult {
    pub trace_names: Vec<String>,
    /// `correlation[i][j]` is Pearson r between trace i and j; diagonal 1.0.
    pub correlation: Vec<Vec<f64>>,
    /// `p_values[i][j]`; diagonal 0.0.
    pub p_values: Vec<Vec<f64>>,
    pub pca: PrincipalComponents,
    pub clustering: Option<Clustering>,
    pub convergence_moments_ms: Vec<i64>,
    pub divergence_moments_ms: Vec<i64>,
    pub regime_changes: Vec<RegimeChange>,
}

const CONVERGENCE_THRESHOLD: f64 = 0.3;
const DIVERGENCE_THRESHOLD: f64 = 0.7;
const KMEANS_SEED: u64 = 42;
const KMEANS_MAX_ITERS: usize = 100;

/// Analyzes 3+ aligned traces sharing `t_ms`. `trace_names` and `columns`
/// (one `Vec<f64>` per trace, each the same length as `t_ms`) must line up
/// positionally.
pub fn analyze(t_ms: &[i64], trace_names: &[String], columns: &[Vec<f64>]) -> MultiResult {
    let n_traces = columns.len();
    let n_samples = t_ms.len();
    assert!(n_traces >= 3);
    assert!(columns.iter().all(|c| c.len() == n_samples));

    let mut correlation = vec![vec![0.0; n_traces]; n_traces];
    let mut p_values = vec![vec![0.0; n_traces]; n_traces];
    for i in 0..n_traces {
        correlation[i][i] = 1.0;
        p_values[i][i] = 0.0;
        for j in (i + 1)..n_traces {
            let r = stats::pearson(&columns[i], &columns[j]);
            let p = stats::correlation_p_value(r, n_samples);
            correlation[i][j] = r;
            correlation[j][i] = r;
            p_values[i][j] = p;
            p_values[j][i] = p;
        }
    }

    let pca = principal_components(columns);

    let k = 5.min(n_samples / 10);
    let clustering = if k >= 2 {
        Some(kmeans(columns, k))
    } else {
        None
    };

    let mean_distance = all_trace_mean_distance(columns);
    let normalized = stats::min_max_normalize(&mean_distance);
    let convergence_moments_ms: Vec<i64> = normalized
        .iter()
        .enumerate()
        .filter(|(_, &d)| d < CONVERGENCE_THRESHOLD)
        .map(|(i, _)| t_ms[i])
        .collect();
    let divergence_moments_ms: Vec<i64> = normalized
        .iter()
        .enumerate()
        .filter(|(_, &d)| d > DIVERGENCE_THRESHOLD)
        .map(|(i, _)| t_ms[i])
        .collect();

    let regime_changes = regime_changes(t_ms, columns);

    MultiResult {
        trace_names: trace_names.to_vec(),
        correlation,
        p_values,
        pca,
        clustering,
        convergence_moments_ms,
        divergence_moments_ms,
        regime_changes,
    }
}

/// Mean pairwise sample-distance across all trace pairs, at each sample.
fn all_trace_mean_distance(columns: &[Vec<f64>]) -> Vec<f64> {
    let n_samples = columns[0].len();
    let n_traces = columns.len();
    let mut out = vec![0.0; n_samples];
    for s in 0..n_samples {
        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..n_traces {
            for j in (i + 1)..n_traces {
                sum += (columns[i][s] - columns[j][s]).abs();
                count += 1;
            }
        }
        out[s] = if count > 0 { sum / count as f64 } else { 0.0 };
    }
    out
}

/// PCA via eigendecomposition of the covariance matrix of `X` (rows =
/// samples, columns = traces).
fn principal_components(columns: &[Vec<f64>]) -> PrincipalComponents {
    let n_traces = columns.len();
    let n_samples = columns[0].len();
    let means: Vec<f64> = columns.iter().map(|c| stats::mean(c)).collect();

    let mut x = DMatrix::<f64>::zeros(n_samples, n_traces);
    for (j, col) in columns.iter().enumerate() {
        for (i, &v) in col.iter().enumerate() {
            x[(i, j)] = v - means[j];
        }
    }
    let denom = (n_samples.max(2) - 1) as f64;
    let cov = (x.transpose() * &x) / denom;

    let eig = SymmetricEigen::new(cov);
    let mut pairs: Vec<(f64, Vec<f64>)> = eig
        .eigenvalues
        .iter()
        .cloned()
        .zip(eig.eigenvectors.column_iter().map(|c| c.iter().cloned().collect::<Vec<f64>>()))
        .collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

    let total: f64 = pairs.iter().map(|(v, _)| v.max(0.0)).sum();
    let explained_variance_ratio = if total > 0.0 {
        pairs.iter().map(|(v, _)| v.max(0.0) / total).collect()
    } else {
        vec![0.0; pairs.len()]
    };
    let components = pairs.into_iter().map(|(_, vec)| vec).collect();

    PrincipalComponents {
        explained_variance_ratio,
        components,
    }
}

/// Deterministic k-means: a fixed seed picks the initial centroids (evenly
/// spaced sample indices rather than random draws), so test runs and repeat
/// analyses of the same recording are reproducible.
fn kmeans(columns: &[Vec<f64>], k: usize) -> Clustering {
    let n_samples = columns[0].len();
    let n_traces = columns.len();
    let sample = |i: usize| -> Vec<f64> { (0..n_traces).map(|t| columns[t][i]).collect() };

    // A fixed seed deterministically perturbs the initial centroid spacing
    // so repeat analyses of the same recording are reproducible.
    let mut rng_state = KMEANS_SEED;
    let mut next_u64 = || {
        rng_state ^= rng_state << 13;
        rng_state ^= rng_state >> 7;
        rng_state ^= rng_state << 17;
        rng_state
    };

    let mut centroids: Vec<Vec<f64>> = (0..k)
        .map(|c| {
            let base = (c * n_samples) / k;
            let jitter = (next_u64() as usize) % n_samples.max(1);
            sample((base + jitter) % n_samples)
        })
        .collect();

    let mut labels = vec![0usize; n_samples];
    for _ in 0..KMEANS_MAX_ITERS {
        let mut changed = false;
        for i in 0..n_samples {
            let s = sample(i);
            let mut best = 0usize;
            let mut best_dist = f64::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist: f64 = s.iter().zip(centroid).map(|(a, b)| (a - b).powi(2)).sum();
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            if labels[i] != best {
                changed = true;
            }
            labels[i] = best;
        }

        let mut sums = vec![vec![0.0; n_traces]; k];
        let mut counts = vec![0usize; k];
        for i in 0..n_samples {
            let c = labels[i];
            counts[c] += 1;
            for t in 0..n_traces {
                sums[c][t] += columns[t][i];
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                for t in 0..n_traces {
                    sums[c][t] /= counts[c] as f64;
                }
                centroids[c] = sums[c].clone();
            }
        }

        if !changed {
            break;
        }
    }

    Clustering { k, labels }
}

/// Frobenius norm between the covariance of a preceding and following
/// window at each interior time `i`; a regime change is flagged where this
/// norm exceeds twice the initial window's norm.
fn regime_changes(t_ms: &[i64], columns: &[Vec<f64>]) -> Vec<RegimeChange> {
    let n_samples = t_ms.len();
    let n_traces = columns.len();
    if n_samples < 20 {
        return Vec::new();
    }
    let w = (n_samples / 5).max(1).min(20);
    if n_samples < 2 * w + 1 {
        return Vec::new();
    }

    // The initial window's own Frobenius norm (not a difference) sets the
    // baseline.
    let initial_norm = {
        let cov = cov_matrix(columns, n_traces, 0, w);
        cov.iter().flatten().map(|x| x * x).sum::<f64>().sqrt()
    };
    let baseline = 2.0 * initial_norm;

    let mut out = Vec::new();
    for i in w..(n_samples - w) {
        let diff_norm = cov_norm_diff(columns, n_traces, i - w, i, i, i + w);
        if diff_norm > baseline {
            out.push(RegimeChange {
                t_ms: t_ms[i],
                norm: diff_norm,
            });
        }
    }
    out
}

fn cov_matrix(columns: &[Vec<f64>], n_traces: usize, start: usize, end: usize) -> Vec<Vec<f64>> {
    let len = (end - start).max(1);
    let means: Vec<f64> = (0..n_traces).map(|t| stats::mean(&columns[t][start..end])).collect();
    let mut cov = vec![vec![0.0; n_traces]; n_traces];
    for a in 0..n_traces {
        for b in 0..n_traces {
            let mut sum = 0.0;
            for s in start..end {
                sum += (columns[a][s] - means[a]) * (columns[b][s] - means[b]);
            }
            cov[a][b] = sum / len as f64;
        }
    }
    cov
}

fn cov_norm_diff(
    columns: &[Vec<f64>],
    n_traces: usize,
    s1: usize,
    e1: usize,
    s2: usize,
    e2: usize,
) -> f64 {
    let c1 = cov_matrix(columns, n_traces, s1, e1);
    let c2 = cov_matrix(columns, n_traces, s2, e2);
    let mut sum = 0.0;
    for a in 0..n_traces {
        for b in 0..n_traces {
            let d = c1[a][b] - c2[a][b];
            sum += d * d;
        }
    }
    sum.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("trace{i}")).collect()
    }

    #[test]
    fn correlation_matrix_has_unit_diagonal() {
        let t: Vec<i64> = (0..100).collect();
        let cols: Vec<Vec<f64>> = vec![
            (0..100).map(|i| i as f64).collect(),
            (0..100).map(|i| (i as f64 * 2.0)).collect(),
            (0..100).map(|i| -(i as f64)).collect(),
        ];
        let result = analyze(&t, &names(3), &cols);
        for i in 0..3 {
            assert_eq!(result.correlation[i][i], 1.0);
        }
        assert!((result.correlation[0][1] - 1.0).abs() < 1e-9);
        assert!((result.correlation[0][2] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pca_explained_variance_sums_to_one() {
        let t: Vec<i64> = (0..50).collect();
        let cols: Vec<Vec<f64>> = vec![
            (0..50).map(|i| (i as f64 * 0.1).sin()).collect(),
            (0..50).map(|i| (i as f64 * 0.1).cos()).collect(),
            (0..50).map(|i| (i as f64 * 0.2).sin()).collect(),
        ];
        let result = analyze(&t, &names(3), &cols);
        let sum: f64 = result.pca.explained_variance_ratio.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum={sum}");
    }

    #[test]
    fn regime_changes_empty_below_twenty_samples() {
        let n = 19;
        let t: Vec<i64> = (0..n as i64).collect();
        let cols: Vec<Vec<f64>> = vec![
            (0..n).map(|i| if i < n / 2 { 0.0 } else { 100.0 }).collect(),
            (0..n).map(|i| if i < n / 2 { 0.0 } else { -100.0 }).collect(),
            (0..n).map(|i| (i as f64).sin()).collect(),
        ];
        let result = analyze(&t, &names(3), &cols);
        assert!(result.regime_changes.is_empty());
    }

    #[test]
    fn clustering_k_is_independent_of_trace_count() {
        // 6 traces but only 20 samples: k = min(5, 20/10) = 2, not bounded by
        // the trace count.
        let n = 20;
        let t: Vec<i64> = (0..n as i64).collect();
        let cols: Vec<Vec<f64>> = (0..6)
            .map(|c| (0..n).map(|i| if i < n / 2 { c as f64 } else { c as f64 + 10.0 }).collect())
            .collect();
        let result = analyze(&t, &names(6), &cols);
        let clustering = result.clustering.unwrap();
        assert_eq!(clustering.k, 2);
    }

    #[test]
    fn clustering_emitted_only_when_k_at_least_two() {
        let t: Vec<i64> = (0..5).collect();
        let cols: Vec<Vec<f64>> = vec![vec![0.0; 5], vec![1.0; 5], vec![2.0; 5]];
        let result = analyze(&t, &names(3), &cols);
        // n_samples/10 == 0, so k < 2: no clustering.
        assert!(result.clustering.is_none());
    }

    #[test]
    fn clustering_runs_with_enough_samples() {
        let n = 100;
        let t: Vec<i64> = (0..n as i64).collect();
        let cols: Vec<Vec<f64>> = vec![
            (0..n).map(|i| if i < n / 2 { 0.0 } else { 10.0 }).collect(),
            (0..n).map(|i| if i < n / 2 { 0.0 } else { 10.0 }).collect(),
            (0..n).map(|i| if i < n / 2 { 0.0 } else { 10.0 }).collect(),
        ];
        let result = analyze(&t, &names(3), &cols);
        let clustering = result.clustering.unwrap();
        assert!(clustering.k >= 2);
        assert_eq!(clustering.labels.len(), n);
    }
}
