//! Semantic graph: terms connected by embedding similarity.
//!
//! - **Data model** (this module): [`Term`], [`EdgeData`], [`Path`], [`TermInput`]
//! - **Graph + builder** ([`index`]): [`SemanticGraph`] backed by `petgraph`
//! - **Centrality** ([`centrality`]): global and targeted betweenness
//! - **Paths** ([`paths`]): bounded simple-path enumeration and path strength
//!
//! A built graph is an immutable snapshot. Everything downstream refers to
//! terms by id, never by node index, so a graph can be dropped or rebuilt
//! without invalidating scores or recommendations.

pub mod centrality;
pub mod index;
pub mod paths;

use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::GraphError;

pub use index::{BoostEntry, BoostTable, RelationBoost, SemanticGraph, build_graph};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Caller-supplied description of one term, before the graph exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermInput {
    /// Unique term identifier.
    pub id: String,
    /// Embedding from the embedding provider.
    pub embedding: Embedding,
    /// Degree to which the term can be changed directly, in [0, 1].
    #[serde(default = "default_actionability")]
    pub actionability: f64,
    /// Declared category, used to look up action templates.
    #[serde(default)]
    pub category: Option<String>,
}

fn default_actionability() -> f64 {
    1.0
}

impl TermInput {
    /// A fully actionable term with no category.
    pub fn new(id: impl Into<String>, embedding: impl Into<Embedding>) -> Self {
        Self {
            id: id.into(),
            embedding: embedding.into(),
            actionability: default_actionability(),
            category: None,
        }
    }

    /// Set the actionability, clamped to [0, 1].
    pub fn with_actionability(mut self, actionability: f64) -> Self {
        self.actionability = actionability.clamp(0.0, 1.0);
        self
    }

    /// Set the declared category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A node of the semantic graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Unique term identifier.
    pub id: String,
    /// Embedding vector.
    pub embedding: Embedding,
    /// Declared actionability in [0, 1].
    pub actionability: f64,
    /// Declared category for action-template lookup.
    pub category: Option<String>,
    /// Cluster assigned by the clustering step, if it has run.
    pub cluster: Option<usize>,
}

impl From<TermInput> for Term {
    fn from(input: TermInput) -> Self {
        Self {
            id: input.id,
            embedding: input.embedding,
            actionability: input.actionability,
            category: input.category,
            cluster: None,
        }
    }
}

/// Edge data stored on petgraph edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Similarity weight in (0, 1].
    pub weight: f64,
    /// Relation tag, set when a relation boost shaped this edge.
    pub relation: Option<String>,
}

/// A simple path through the graph with its strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Term ids from source to destination, at least two, all distinct.
    pub terms: Vec<String>,
    /// Product of the edge weights along the path.
    pub strength: f64,
}

impl Path {
    /// Number of edges.
    pub fn hops(&self) -> usize {
        self.terms.len().saturating_sub(1)
    }

    /// Whether `term` appears anywhere on this path.
    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    /// Ranking order: strength desc, then fewer hops, then lexical term sequence.
    pub fn rank_cmp(&self, other: &Path) -> std::cmp::Ordering {
        other
            .strength
            .total_cmp(&self.strength)
            .then_with(|| self.hops().cmp(&other.hops()))
            .then_with(|| self.terms.cmp(&other.terms))
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.4})", self.terms.join(" -> "), self.strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(terms: &[&str], strength: f64) -> Path {
        Path {
            terms: terms.iter().map(|t| t.to_string()).collect(),
            strength,
        }
    }

    #[test]
    fn rank_prefers_stronger_paths() {
        let strong = path(&["a", "b", "c"], 0.8);
        let weak = path(&["a", "c"], 0.5);
        assert_eq!(strong.rank_cmp(&weak), std::cmp::Ordering::Less);
    }

    #[test]
    fn rank_breaks_ties_by_length_then_lexically() {
        let short = path(&["a", "z"], 0.5);
        let long = path(&["a", "b", "z"], 0.5);
        assert_eq!(short.rank_cmp(&long), std::cmp::Ordering::Less);

        let via_b = path(&["a", "b", "z"], 0.5);
        let via_c = path(&["a", "c", "z"], 0.5);
        assert_eq!(via_b.rank_cmp(&via_c), std::cmp::Ordering::Less);
    }

    #[test]
    fn term_input_defaults_to_fully_actionable() {
        let input: TermInput =
            serde_json::from_str(r#"{"id": "price", "embedding": [1.0, 0.0]}"#).unwrap();
        assert_eq!(input.actionability, 1.0);
        assert!(input.category.is_none());
    }

    #[test]
    fn actionability_is_clamped() {
        let input = TermInput::new("price", [1.0]).with_actionability(1.7);
        assert_eq!(input.actionability, 1.0);
    }
}
