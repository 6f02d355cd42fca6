//! Embedding vectors and the embedding-provider seam.
//!
//! The engine never produces embeddings itself. Callers supply them through an
//! [`EmbeddingProvider`], which must be deterministic for a given
//! `(term, model)` pair. [`EmbeddingTable`] is a plain lookup table
//! implementation for precomputed vectors (CLI input files, tests).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::GraphResult;

/// A fixed-length real vector describing one term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f64>);

impl Embedding {
    /// Wrap raw components.
    pub fn new(components: Vec<f64>) -> Self {
        Self(components)
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// Raw component slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.0.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Cosine similarity in [-1, 1].
    ///
    /// Returns 0.0 when either vector has zero norm.
    pub fn cosine(&self, other: &Embedding) -> f64 {
        let na = self.norm();
        let nb = other.norm();
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        let dot: f64 = self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum();
        (dot / (na * nb)).clamp(-1.0, 1.0)
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &Embedding) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(components: Vec<f64>) -> Self {
        Self(components)
    }
}

impl<const N: usize> From<[f64; N]> for Embedding {
    fn from(components: [f64; N]) -> Self {
        Self(components.to_vec())
    }
}

/// Supplies an embedding per term.
///
/// Implementations must be deterministic: the same `(term, model)` always
/// yields the same vector. `None` means the provider has no vector for the term.
pub trait EmbeddingProvider: Send + Sync {
    fn embedding(&self, term: &str, model: &str) -> Option<Embedding>;
}

/// Precomputed embeddings keyed by term, tagged with the model that produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingTable {
    model: String,
    vectors: HashMap<String, Embedding>,
}

impl EmbeddingTable {
    /// Create an empty table for `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            vectors: HashMap::new(),
        }
    }

    /// Insert or replace the vector for `term`.
    pub fn insert(&mut self, term: impl Into<String>, embedding: impl Into<Embedding>) {
        self.vectors.insert(term.into(), embedding.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, term: impl Into<String>, embedding: impl Into<Embedding>) -> Self {
        self.insert(term, embedding);
        self
    }

    /// The model identifier these vectors belong to.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl EmbeddingProvider for EmbeddingTable {
    fn embedding(&self, term: &str, model: &str) -> Option<Embedding> {
        if model != self.model {
            return None;
        }
        self.vectors.get(term).cloned()
    }
}

/// Look up every term in `terms`, failing on the first one the provider lacks.
pub fn embed_all<P: EmbeddingProvider + ?Sized>(
    provider: &P,
    terms: &[String],
    model: &str,
) -> GraphResult<Vec<Embedding>> {
    terms
        .iter()
        .map(|term| {
            provider
                .embedding(term, model)
                .ok_or_else(|| GraphError::MissingEmbedding { term: term.clone() })
        })
        .collect()
}
