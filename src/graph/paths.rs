//! Bounded simple-path enumeration and path strength.
//!
//! Depth-first search from a source term, visiting neighbours in node-index
//! order, with a hop cutoff and a cap on the number of paths kept. Edge
//! weights lie in (0, 1], so extending a path never raises its strength;
//! once the kept set is full, any partial path already weaker than the
//! weakest kept path, or tied with it but longer, is pruned.

use std::cmp::Ordering;

use super::Path;
use super::index::SemanticGraph;
use super::GraphResult;

/// Configuration for a path enumeration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathConfig {
    /// Maximum number of edges per path.
    pub cutoff: usize,
    /// Maximum number of paths kept per (source, destination) pair.
    pub max_paths: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            cutoff: 5,
            max_paths: 50,
        }
    }
}

/// Enumerate simple paths from `from` to `to`, best first.
///
/// Ordering is strength desc, then fewer hops, then lexical term sequence.
/// Returns an empty list when no path exists or `from == to`.
pub fn enumerate_paths(
    graph: &SemanticGraph,
    from: &str,
    to: &str,
    config: &PathConfig,
) -> GraphResult<Vec<Path>> {
    let source = graph.require(from)?.index();
    let dest = graph.require(to)?.index();
    let adj = graph.adjacency();
    let names: Vec<&str> = graph.terms().map(|t| t.id.as_str()).collect();
    Ok(enumerate_indexed(&adj, &names, source, dest, config))
}

/// Sum of path strengths over the enumerated paths from `from` to `to`.
pub fn path_strength(
    graph: &SemanticGraph,
    from: &str,
    to: &str,
    config: &PathConfig,
) -> GraphResult<f64> {
    Ok(enumerate_paths(graph, from, to, config)?
        .iter()
        .map(|p| p.strength)
        .sum())
}

/// Path strength from every node to `dest`, in node-index order.
///
/// Reuses one adjacency build for all sources.
pub(crate) fn path_strengths_to(
    graph: &SemanticGraph,
    dest: usize,
    config: &PathConfig,
) -> Vec<f64> {
    let adj = graph.adjacency();
    let names: Vec<&str> = graph.terms().map(|t| t.id.as_str()).collect();
    (0..adj.len())
        .map(|source| {
            enumerate_indexed(&adj, &names, source, dest, config)
                .iter()
                .map(|p| p.strength)
                .sum()
        })
        .collect()
}

pub(crate) fn enumerate_indexed(
    adj: &[Vec<(usize, f64)>],
    names: &[&str],
    source: usize,
    dest: usize,
    config: &PathConfig,
) -> Vec<Path> {
    if source == dest || config.cutoff == 0 || config.max_paths == 0 {
        return Vec::new();
    }

    let mut search = Search {
        adj,
        names,
        dest,
        config,
        on_path: vec![false; adj.len()],
        stack: vec![source],
        kept: Vec::new(),
        truncated: false,
    };
    search.on_path[source] = true;
    search.descend(source, 1.0);

    if search.truncated {
        tracing::debug!(
            from = names[source],
            to = names[dest],
            kept = search.kept.len(),
            "path enumeration truncated to max_paths"
        );
    }
    search.kept
}

struct Search<'a> {
    adj: &'a [Vec<(usize, f64)>],
    names: &'a [&'a str],
    dest: usize,
    config: &'a PathConfig,
    on_path: Vec<bool>,
    stack: Vec<usize>,
    /// Best paths so far, sorted by rank.
    kept: Vec<Path>,
    truncated: bool,
}

impl Search<'_> {
    fn descend(&mut self, node: usize, strength: f64) {
        let adj = self.adj;
        for &(next, weight) in &adj[node] {
            if self.on_path[next] {
                continue;
            }
            let extended = strength * weight;
            if self.is_full() && self.cannot_outrank(extended, next) {
                self.truncated = true;
                continue;
            }
            self.stack.push(next);
            if next == self.dest {
                self.keep(extended);
            } else if self.stack.len() - 1 < self.config.cutoff {
                self.on_path[next] = true;
                self.descend(next, extended);
                self.on_path[next] = false;
            }
            self.stack.pop();
        }
    }

    fn is_full(&self) -> bool {
        self.kept.len() >= self.config.max_paths
    }

    /// Whether every completion of the current path extended by `next` ranks
    /// below the weakest kept path: weaker, or equally strong with more hops.
    fn cannot_outrank(&self, extended: f64, next: usize) -> bool {
        let Some(weakest) = self.kept.last() else {
            return false;
        };
        if extended != weakest.strength {
            return extended < weakest.strength;
        }
        // Hops once `next` is pushed; reaching the destination later costs at least one more.
        let hops = self.stack.len();
        let min_hops = if next == self.dest { hops } else { hops + 1 };
        min_hops > weakest.hops()
    }

    fn keep(&mut self, strength: f64) {
        let path = Path {
            terms: self.stack.iter().map(|&i| self.names[i].to_string()).collect(),
            strength,
        };
        let pos = self
            .kept
            .binary_search_by(|probe| match probe.rank_cmp(&path) {
                Ordering::Equal => Ordering::Less,
                other => other,
            })
            .unwrap_or_else(|e| e);
        self.kept.insert(pos, path);
        if self.kept.len() > self.config.max_paths {
            self.kept.pop();
            self.truncated = true;
        }
    }
}
