//! Betweenness centrality: global, target-restricted, and the shortest-path
//! node sets used to flag guardrail terms.
//!
//! All measures count hops, not weights. Raw values are normalized by the
//! maximum raw value so every score lies in [0, 1]; a graph in which no
//! node sits inside any shortest path scores 0 everywhere.

use std::collections::VecDeque;

use crate::error::ScoreError;

use super::index::SemanticGraph;

/// Centrality score for a single term.
#[derive(Debug, Clone, PartialEq)]
pub struct CentralityScore {
    /// The term this score belongs to.
    pub term: String,
    /// Normalized score in [0, 1].
    pub score: f64,
}

/// Single-source BFS state: hop distances and shortest-path counts.
struct Bfs {
    dist: Vec<Option<usize>>,
    sigma: Vec<f64>,
    /// Nodes in non-decreasing distance order.
    order: Vec<usize>,
    preds: Vec<Vec<usize>>,
}

fn bfs(adj: &[Vec<(usize, f64)>], source: usize) -> Bfs {
    let n = adj.len();
    let mut dist = vec![None; n];
    let mut sigma = vec![0.0; n];
    let mut preds = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();

    dist[source] = Some(0);
    sigma[source] = 1.0;
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        order.push(v);
        let dv = dist[v].unwrap_or(0);
        for &(w, _) in &adj[v] {
            match dist[w] {
                None => {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
                Some(dw) if dw == dv + 1 => {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
                Some(_) => {}
            }
        }
    }

    Bfs {
        dist,
        sigma,
        order,
        preds,
    }
}

/// Divide by the maximum; all zeros when the maximum is zero.
pub(crate) fn normalize_by_max(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        raw.iter().map(|v| (v / max).clamp(0.0, 1.0)).collect()
    } else {
        vec![0.0; raw.len()]
    }
}

/// Normalized global betweenness per node, in node-index order.
///
/// Brandes' algorithm over the unweighted graph. Disconnected components are
/// handled naturally since BFS never leaves a component.
pub fn betweenness(graph: &SemanticGraph) -> Vec<f64> {
    let adj = graph.adjacency();
    let n = adj.len();
    let mut raw = vec![0.0; n];

    for s in 0..n {
        let state = bfs(&adj, s);
        let mut delta = vec![0.0; n];
        for &w in state.order.iter().rev() {
            for &v in &state.preds[w] {
                delta[v] += state.sigma[v] / state.sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                raw[w] += delta[w];
            }
        }
    }

    normalize_by_max(&raw)
}

/// Global betweenness per term, sorted by score desc then term id.
pub fn betweenness_scores(graph: &SemanticGraph) -> Vec<CentralityScore> {
    let values = betweenness(graph);
    let mut results: Vec<CentralityScore> = graph
        .terms()
        .zip(values)
        .map(|(term, score)| CentralityScore {
            term: term.id.clone(),
            score,
        })
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
    results
}

/// Normalized target-restricted betweenness per node, in node-index order.
///
/// For every source `s` that can reach `target`, each internal node `v` on a
/// shortest `s → target` path accrues `σ(s,v)·σ(v,target) / σ(s,target)`.
pub fn targeted_betweenness(graph: &SemanticGraph, target: &str) -> Result<Vec<f64>, ScoreError> {
    let t = graph
        .index_of(target)
        .ok_or_else(|| ScoreError::UnknownTarget {
            target: target.to_string(),
        })?
        .index();
    let adj = graph.adjacency();
    let n = adj.len();
    let from_target = bfs(&adj, t);
    let mut raw = vec![0.0; n];

    for s in 0..n {
        if s == t || from_target.dist[s].is_none() {
            continue;
        }
        let from_source = bfs(&adj, s);
        let Some(d_st) = from_source.dist[t] else {
            continue;
        };
        let sigma_st = from_source.sigma[t];
        for v in 0..n {
            if v == s || v == t {
                continue;
            }
            if let (Some(d_sv), Some(d_vt)) = (from_source.dist[v], from_target.dist[v]) {
                if d_sv + d_vt == d_st {
                    raw[v] += from_source.sigma[v] * from_target.sigma[v] / sigma_st;
                }
            }
        }
    }

    Ok(normalize_by_max(&raw))
}

/// Node indices lying on at least one shortest path between `a` and `b`
/// (endpoints included). Empty when `b` is unreachable from `a`.
pub fn shortest_path_nodes(graph: &SemanticGraph, a: usize, b: usize) -> Vec<usize> {
    let adj = graph.adjacency();
    let from_a = bfs(&adj, a);
    let Some(d_ab) = from_a.dist[b] else {
        return Vec::new();
    };
    let from_b = bfs(&adj, b);
    (0..adj.len())
        .filter(|&v| match (from_a.dist[v], from_b.dist[v]) {
            (Some(x), Some(y)) => x + y == d_ab,
            _ => false,
        })
        .collect()
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is in [0, 100]. Returns 0.0 for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
