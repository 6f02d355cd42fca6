//! In-memory semantic graph and its builder.
//!
//! Uses a `petgraph` undirected graph for structure and a `HashMap` for
//! O(1) lookups by term id. Node indices follow input order, which keeps
//! every downstream algorithm deterministic.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::GraphError;

use super::{EdgeData, GraphResult, Term, TermInput};

/// Optional collaborator that strengthens (or weakens) known relations.
///
/// `boost(a, b)` returns a multiplier for the pair, or `None` when the pair
/// has no known relation. Lookups are made in both orders; the larger
/// resulting weight wins.
pub trait RelationBoost: Send + Sync {
    fn boost(&self, a: &str, b: &str) -> Option<f64>;

    /// Relation tag recorded on a boosted edge.
    fn relation(&self, _a: &str, _b: &str) -> Option<String> {
        None
    }
}

impl<F> RelationBoost for F
where
    F: Fn(&str, &str) -> Option<f64> + Send + Sync,
{
    fn boost(&self, a: &str, b: &str) -> Option<f64> {
        self(a, b)
    }
}

/// A single entry of a [`BoostTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostEntry {
    pub a: String,
    pub b: String,
    pub factor: f64,
    #[serde(default)]
    pub relation: Option<String>,
}

/// Symmetric lookup table of relation boosts.
#[derive(Debug, Clone, Default)]
pub struct BoostTable {
    entries: HashMap<(String, String), (f64, Option<String>)>,
}

impl BoostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a boost for the unordered pair `(a, b)`. A repeated pair keeps the larger factor.
    pub fn insert(&mut self, a: &str, b: &str, factor: f64, relation: Option<String>) {
        let key = Self::key(a, b);
        match self.entries.get(&key) {
            Some((existing, _)) if *existing >= factor => {}
            _ => {
                self.entries.insert(key, (factor, relation));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }
}

impl FromIterator<BoostEntry> for BoostTable {
    fn from_iter<I: IntoIterator<Item = BoostEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(&entry.a, &entry.b, entry.factor, entry.relation);
        }
        table
    }
}

impl RelationBoost for BoostTable {
    fn boost(&self, a: &str, b: &str) -> Option<f64> {
        self.entries.get(&Self::key(a, b)).map(|(f, _)| *f)
    }

    fn relation(&self, a: &str, b: &str) -> Option<String> {
        self.entries
            .get(&Self::key(a, b))
            .and_then(|(_, r)| r.clone())
    }
}

/// Weighted undirected similarity graph over a fixed term set.
///
/// Never mutated after construction; methods that "change" the graph return
/// a new snapshot.
#[derive(Debug, Clone)]
pub struct SemanticGraph {
    graph: UnGraph<Term, EdgeData>,
    index: HashMap<String, NodeIndex>,
    threshold: f64,
}

/// Build a similarity graph from terms and their embeddings.
///
/// Every unordered pair whose cosine similarity reaches `threshold` becomes
/// an edge weighted by that similarity. When `boosts` knows the pair, the
/// similarity is multiplied by the boost factor and clamped to 1.0; a boost
/// can promote a below-threshold pair to an edge.
pub fn build_graph(
    terms: Vec<TermInput>,
    threshold: f64,
    boosts: Option<&dyn RelationBoost>,
) -> GraphResult<SemanticGraph> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(GraphError::InvalidThreshold { threshold });
    }
    if terms.len() < 2 {
        return Err(GraphError::InsufficientTerms { count: terms.len() });
    }

    let mut graph: UnGraph<Term, EdgeData> = UnGraph::with_capacity(terms.len(), 0);
    let mut index = HashMap::with_capacity(terms.len());
    let mut dim = None;

    for input in terms {
        if index.contains_key(&input.id) {
            return Err(GraphError::DuplicateTerm { term: input.id });
        }
        validate_term(&input.id, &input.embedding, input.actionability, &mut dim)?;
        let id = input.id.clone();
        let idx = graph.add_node(Term::from(input));
        index.insert(id, idx);
    }

    let n = graph.node_count();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (NodeIndex::new(i), NodeIndex::new(j));
            if let Some(edge) = pair_edge(&graph[a], &graph[b], threshold, boosts)? {
                graph.add_edge(a, b, edge);
            }
        }
    }

    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        threshold,
        boosted = boosts.is_some(),
        "built semantic graph"
    );

    Ok(SemanticGraph {
        graph,
        index,
        threshold,
    })
}

/// Per-term checks shared by [`build_graph`] and snapshot restore.
fn validate_term(
    id: &str,
    embedding: &Embedding,
    actionability: f64,
    dim: &mut Option<usize>,
) -> GraphResult<()> {
    let actual = embedding.dim();
    if actual == 0 {
        return Err(GraphError::EmptyEmbedding {
            term: id.to_string(),
        });
    }
    match *dim {
        None => *dim = Some(actual),
        Some(expected) if expected != actual => {
            return Err(GraphError::DimensionMismatch {
                term: id.to_string(),
                expected,
                actual,
            });
        }
        Some(_) => {}
    }
    if embedding.as_slice().iter().any(|x| !x.is_finite()) {
        return Err(GraphError::NonFiniteEmbedding {
            term: id.to_string(),
        });
    }
    if !(0.0..=1.0).contains(&actionability) {
        return Err(GraphError::InvalidActionability {
            term: id.to_string(),
            value: actionability,
        });
    }
    Ok(())
}

/// Decide whether `(a, b)` becomes an edge, and with which weight.
fn pair_edge(
    a: &Term,
    b: &Term,
    threshold: f64,
    boosts: Option<&dyn RelationBoost>,
) -> GraphResult<Option<EdgeData>> {
    let similarity = a.embedding.cosine(&b.embedding);
    let base = if similarity >= threshold {
        Some(similarity)
    } else {
        None
    };

    let Some(boosts) = boosts else {
        return Ok(base.map(|weight| EdgeData {
            weight,
            relation: None,
        }));
    };

    let factors = [boosts.boost(&a.id, &b.id), boosts.boost(&b.id, &a.id)];
    let mut best: Option<f64> = None;
    for factor in factors.into_iter().flatten() {
        if !factor.is_finite() || factor < 0.0 {
            return Err(GraphError::InvalidBoost {
                a: a.id.clone(),
                b: b.id.clone(),
                factor,
            });
        }
        let boosted = (similarity * factor).min(1.0);
        best = Some(best.map_or(boosted, |w: f64| w.max(boosted)));
    }

    let Some(boosted) = best else {
        return Ok(base.map(|weight| EdgeData {
            weight,
            relation: None,
        }));
    };

    // Already an edge: the boost reshapes it. Otherwise it must lift the pair over the threshold.
    if boosted > 0.0 && (base.is_some() || boosted >= threshold) {
        let relation = boosts
            .relation(&a.id, &b.id)
            .or_else(|| boosts.relation(&b.id, &a.id))
            .or_else(|| Some("boost".to_string()));
        Ok(Some(EdgeData {
            weight: boosted,
            relation,
        }))
    } else {
        Ok(None)
    }
}

impl SemanticGraph {
    /// Reassemble a graph from snapshot parts, applying the same term checks as [`build_graph`].
    pub(crate) fn from_parts(
        nodes: Vec<Term>,
        edges: Vec<(String, String, EdgeData)>,
        threshold: f64,
    ) -> GraphResult<Self> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(GraphError::InvalidThreshold { threshold });
        }
        if nodes.len() < 2 {
            return Err(GraphError::InsufficientTerms { count: nodes.len() });
        }
        let mut graph: UnGraph<Term, EdgeData> = UnGraph::with_capacity(nodes.len(), edges.len());
        let mut index = HashMap::with_capacity(nodes.len());
        let mut dim = None;
        for term in nodes {
            if index.contains_key(&term.id) {
                return Err(GraphError::DuplicateTerm { term: term.id });
            }
            validate_term(&term.id, &term.embedding, term.actionability, &mut dim)?;
            let id = term.id.clone();
            let idx = graph.add_node(term);
            index.insert(id, idx);
        }
        for (a, b, data) in edges {
            let ia = *index
                .get(&a)
                .ok_or_else(|| GraphError::UnknownTerm { term: a.clone() })?;
            let ib = *index
                .get(&b)
                .ok_or_else(|| GraphError::UnknownTerm { term: b.clone() })?;
            if !(data.weight > 0.0 && data.weight <= 1.0) {
                return Err(GraphError::SnapshotFormat {
                    message: format!("edge ({a}, {b}) has weight {} outside (0, 1]", data.weight),
                });
            }
            graph.update_edge(ia, ib, data);
        }
        Ok(Self {
            graph,
            index,
            threshold,
        })
    }

    /// Underlying petgraph structure.
    pub fn inner(&self) -> &UnGraph<Term, EdgeData> {
        &self.graph
    }

    /// Similarity threshold used to build this graph.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Node index for a term id.
    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Node index for a term id, or `UnknownTerm`.
    pub fn require(&self, id: &str) -> GraphResult<NodeIndex> {
        self.index_of(id).ok_or_else(|| GraphError::UnknownTerm {
            term: id.to_string(),
        })
    }

    /// Term data by id.
    pub fn term(&self, id: &str) -> Option<&Term> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// Term data by node index.
    pub fn term_at(&self, idx: NodeIndex) -> &Term {
        &self.graph[idx]
    }

    /// All terms in node-index (input) order.
    pub fn terms(&self) -> impl Iterator<Item = &Term> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// All term ids in node-index order.
    pub fn term_ids(&self) -> Vec<String> {
        self.terms().map(|t| t.id.clone()).collect()
    }

    /// Weight of the edge between `a` and `b`, if any.
    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        let (ia, ib) = (self.index_of(a)?, self.index_of(b)?);
        let edge = self.graph.find_edge(ia, ib)?;
        Some(self.graph[edge].weight)
    }

    /// Ids of the neighbours of `id`, sorted lexically.
    pub fn neighbors(&self, id: &str) -> GraphResult<Vec<String>> {
        let idx = self.require(id)?;
        let mut out: Vec<String> = self
            .graph
            .neighbors(idx)
            .map(|n| self.graph[n].id.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    /// Every edge as `(a, b, data)` with `a` the lower node index, sorted by node indices.
    pub fn edges(&self) -> Vec<(String, String, EdgeData)> {
        let mut raw: Vec<(usize, usize, EdgeData)> = self
            .graph
            .edge_references()
            .map(|e| {
                let (s, t) = (e.source().index(), e.target().index());
                (s.min(t), s.max(t), e.weight().clone())
            })
            .collect();
        raw.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        raw.into_iter()
            .map(|(s, t, data)| {
                (
                    self.graph[NodeIndex::new(s)].id.clone(),
                    self.graph[NodeIndex::new(t)].id.clone(),
                    data,
                )
            })
            .collect()
    }

    /// Adjacency lists by node index, each sorted by neighbour index.
    ///
    /// Algorithms iterate this instead of petgraph's neighbour order so that
    /// results do not depend on edge insertion order.
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        let mut adj = vec![Vec::new(); self.graph.node_count()];
        for e in self.graph.edge_references() {
            let (s, t) = (e.source().index(), e.target().index());
            let w = e.weight().weight;
            adj[s].push((t, w));
            adj[t].push((s, w));
        }
        for list in &mut adj {
            list.sort_by_key(|&(n, _)| n);
        }
        adj
    }

    /// Number of nodes with no edges.
    pub fn isolated_count(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.neighbors(idx).next().is_none())
            .count()
    }

    /// Number of connected components (isolated nodes count as one each).
    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }

    /// New snapshot with the given cluster ids, one per node in index order.
    pub fn with_clusters(&self, assignments: &[usize]) -> Self {
        let mut next = self.clone();
        for (idx, cluster) in next.graph.node_indices().zip(assignments) {
            next.graph[idx].cluster = Some(*cluster);
        }
        next
    }

    /// New snapshot with the edge `(a, b)` set to `weight` (created if absent).
    pub fn with_edge_weight(&self, a: &str, b: &str, weight: f64) -> GraphResult<Self> {
        let (ia, ib) = (self.require(a)?, self.require(b)?);
        if !(weight > 0.0 && weight <= 1.0) {
            return Err(GraphError::InvalidBoost {
                a: a.to_string(),
                b: b.to_string(),
                factor: weight,
            });
        }
        let mut next = self.clone();
        let relation = next
            .graph
            .find_edge(ia, ib)
            .and_then(|e| next.graph[e].relation.clone());
        next.graph.update_edge(ia, ib, EdgeData { weight, relation });
        Ok(next)
    }
}
