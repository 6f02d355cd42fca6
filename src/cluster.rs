//! Seeded k-means over term embeddings and the cluster-variance uncertainty proxy.
//!
//! Terms are partitioned into `k = ceil(sqrt(n))` clusters. A cluster's
//! variance is the mean per-dimension (population) standard deviation of its
//! members; every member inherits it as its uncertainty, normalized by the
//! largest cluster variance. Singleton clusters have zero variance.
//!
//! Clustering is reproducible: initial centroids come from a `StdRng` seeded
//! with a fixed value, and Lloyd iterations are capped.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::ClusterError;
use crate::graph::SemanticGraph;

/// Configuration for the clustering step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Seed for initial centroid selection.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Upper bound on Lloyd iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_seed() -> u64 {
    42
}
fn default_max_iterations() -> usize {
    100
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Outcome of clustering a graph's terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster id per node, in node-index order.
    pub assignments: Vec<usize>,
    /// Number of clusters.
    pub k: usize,
    /// Raw variance per cluster (0 for singleton or empty clusters).
    pub variances: Vec<f64>,
    /// Whether the partition fell back to a single cluster with zero uncertainty.
    pub degenerate: bool,
}

impl Clustering {
    /// Normalized uncertainty per node, in node-index order.
    pub fn uncertainty(&self) -> Vec<f64> {
        if self.degenerate {
            return vec![0.0; self.assignments.len()];
        }
        let max = self.variances.iter().copied().fold(0.0_f64, f64::max);
        self.assignments
            .iter()
            .map(|&c| {
                if max > 0.0 {
                    (self.variances[c] / max).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// `ceil(sqrt(n))`, at least 1.
pub fn cluster_count(n: usize) -> usize {
    ((n as f64).sqrt().ceil() as usize).max(1)
}

/// Cluster the graph's terms by embedding.
///
/// Never fails: a degenerate input (fewer distinct embeddings than clusters,
/// non-finite components) yields a single cluster with zero uncertainty.
pub fn cluster_terms(graph: &SemanticGraph, config: &ClusterConfig) -> Clustering {
    let points: Vec<&Embedding> = graph.terms().map(|t| &t.embedding).collect();
    let k = cluster_count(points.len());

    match kmeans(&points, k, config) {
        Ok(assignments) => {
            let variances = cluster_variances(&points, &assignments, k);
            tracing::debug!(k, n = points.len(), "clustered terms");
            Clustering {
                assignments,
                k,
                variances,
                degenerate: false,
            }
        }
        Err(err) => {
            tracing::debug!(%err, n = points.len(), "clustering fell back to zero uncertainty");
            Clustering {
                assignments: vec![0; points.len()],
                k: 1,
                variances: vec![0.0],
                degenerate: true,
            }
        }
    }
}

/// Normalized cluster uncertainty `U(v)` per node, in node-index order.
pub fn cluster_uncertainty(graph: &SemanticGraph, config: &ClusterConfig) -> Vec<f64> {
    cluster_terms(graph, config).uncertainty()
}

/// Lloyd's k-means with seeded initialisation.
///
/// Initial centroids are the first `k` pairwise-distinct points of a seeded
/// shuffle. Ties in assignment go to the lower centroid index. Empty clusters
/// keep their previous centroid.
pub fn kmeans(
    points: &[&Embedding],
    k: usize,
    config: &ClusterConfig,
) -> Result<Vec<usize>, ClusterError> {
    let n = points.len();
    if n == 0 || k == 0 {
        return Err(ClusterError::Degenerate {
            reason: format!("cannot form {k} clusters from {n} points"),
        });
    }
    if points
        .iter()
        .any(|p| p.as_slice().iter().any(|x| !x.is_finite()))
    {
        return Err(ClusterError::Degenerate {
            reason: "embedding contains non-finite components".into(),
        });
    }
    if k == 1 {
        return Ok(vec![0; n]);
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
    order.shuffle(&mut rng);

    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    for &i in &order {
        let candidate = points[i].as_slice();
        if centroids.iter().all(|c| c.as_slice() != candidate) {
            centroids.push(candidate.to_vec());
            if centroids.len() == k {
                break;
            }
        }
    }
    if centroids.len() < k {
        return Err(ClusterError::Degenerate {
            reason: format!(
                "only {} distinct embeddings for {k} clusters",
                centroids.len()
            ),
        });
    }

    let dim = points[0].dim();
    let mut assignments = vec![usize::MAX; n];
    for _ in 0..config.max_iterations {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let nearest = nearest_centroid(p.as_slice(), &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (i, p) in points.iter().enumerate() {
            let c = assignments[i];
            counts[c] += 1;
            for (s, x) in sums[c].iter_mut().zip(p.as_slice()) {
                *s += x;
            }
        }
        for (c, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
            if count > 0 {
                centroids[c] = sum.into_iter().map(|s| s / count as f64).collect();
            }
        }
    }

    Ok(assignments)
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d: f64 = point
            .iter()
            .zip(centroid)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

/// Mean per-dimension population standard deviation of each cluster.
pub fn cluster_variances(points: &[&Embedding], assignments: &[usize], k: usize) -> Vec<f64> {
    let mut members: Vec<Vec<&Embedding>> = vec![Vec::new(); k];
    for (p, &c) in points.iter().zip(assignments) {
        members[c].push(*p);
    }
    members
        .iter()
        .map(|cluster| {
            if cluster.len() < 2 {
                return 0.0;
            }
            let dim = cluster[0].dim();
            let count = cluster.len() as f64;
            let total_std: f64 = (0..dim)
                .map(|d| {
                    let mean = cluster.iter().map(|e| e.as_slice()[d]).sum::<f64>() / count;
                    let var = cluster
                        .iter()
                        .map(|e| {
                            let diff = e.as_slice()[d] - mean;
                            diff * diff
                        })
                        .sum::<f64>()
                        / count;
                    var.sqrt()
                })
                .sum();
            total_std / dim as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TermInput, build_graph};

    #[test]
    fn cluster_count_is_ceil_sqrt() {
        assert_eq!(cluster_count(1), 1);
        assert_eq!(cluster_count(2), 2);
        assert_eq!(cluster_count(4), 2);
        assert_eq!(cluster_count(5), 3);
        assert_eq!(cluster_count(9), 3);
        assert_eq!(cluster_count(10), 4);
    }

    #[test]
    fn identical_embeddings_fall_back_to_zero() {
        let terms = vec![
            TermInput::new("a", [0.5, 0.5]),
            TermInput::new("b", [0.5, 0.5]),
            TermInput::new("c", [0.5, 0.5]),
        ];
        let g = build_graph(terms, 0.5, None).unwrap();
        let clustering = cluster_terms(&g, &ClusterConfig::default());
        assert!(clustering.degenerate);
        assert_eq!(clustering.k, 1);
        assert_eq!(clustering.variances, vec![0.0]);
        assert_eq!(clustering.uncertainty(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn kmeans_separates_obvious_groups() {
        let e: Vec<Embedding> = [
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ]
        .into_iter()
        .map(Embedding::from)
        .collect();
        let refs: Vec<&Embedding> = e.iter().collect();
        let a = kmeans(&refs, 2, &ClusterConfig::default()).unwrap();
        assert_eq!(a[0], a[1]);
        assert_eq!(a[1], a[2]);
        assert_eq!(a[3], a[4]);
        assert_eq!(a[4], a[5]);
        assert_ne!(a[0], a[3]);
    }

    #[test]
    fn kmeans_is_reproducible() {
        let e: Vec<Embedding> = (0..12)
            .map(|i| Embedding::from([i as f64, (i * i % 7) as f64, (i % 3) as f64]))
            .collect();
        let refs: Vec<&Embedding> = e.iter().collect();
        let config = ClusterConfig::default();
        let first = kmeans(&refs, 4, &config).unwrap();
        for _ in 0..5 {
            assert_eq!(kmeans(&refs, 4, &config).unwrap(), first);
        }
    }

    #[test]
    fn variance_is_mean_population_std() {
        let e = [Embedding::from([0.0, 0.0]), Embedding::from([2.0, 4.0])];
        let refs: Vec<&Embedding> = e.iter().collect();
        let v = cluster_variances(&refs, &[0, 0], 1);
        // std per dim: 1.0 and 2.0 → mean 1.5
        assert!((v[0] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn singleton_clusters_have_zero_variance() {
        let e = [Embedding::from([0.0]), Embedding::from([5.0])];
        let refs: Vec<&Embedding> = e.iter().collect();
        assert_eq!(cluster_variances(&refs, &[0, 1], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn uncertainty_lies_in_unit_interval() {
        let terms: Vec<TermInput> = (0..10)
            .map(|i| {
                let x = i as f64;
                TermInput::new(format!("t{i}"), [x.cos(), x.sin(), x / 10.0])
            })
            .collect();
        let g = build_graph(terms, 0.5, None).unwrap();
        let u = cluster_uncertainty(&g, &ClusterConfig::default());
        assert_eq!(u.len(), 10);
        assert!(u.iter().all(|&x| (0.0..=1.0).contains(&x)));
        assert!(u.iter().any(|&x| x == 1.0));
    }
}
