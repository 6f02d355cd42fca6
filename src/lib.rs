// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # semantic-leverage
//!
//! Finds the terms in a semantic network where a small intervention should
//! move a business metric the most, and turns them into experiment plans.
//!
//! ## Architecture
//!
//! - **Semantic graph** (`graph`): petgraph network of terms joined by cosine similarity
//! - **Centrality and paths** (`graph::centrality`, `graph::paths`): betweenness, shortest routes, bounded path enumeration
//! - **Clustering** (`cluster`): seeded k-means over embeddings, per-cluster spread as uncertainty
//! - **Scoring** (`score`): basic and targeted leverage
//! - **Recommendations** (`recommend`): experiment design with sample size, duration, guardrails
//! - **Persistence** (`export`, `config`): JSON/bincode graph snapshots and TOML configuration
//!
//! ## Library usage
//!
//! ```no_run
//! use semantic_leverage::config::AnalysisConfig;
//! use semantic_leverage::engine::LeverageEngine;
//! use semantic_leverage::graph::TermInput;
//! use semantic_leverage::score::Actionability;
//!
//! let terms = vec![
//!     TermInput::new("price", [1.0, 0.0]),
//!     TermInput::new("demand", [0.8, 0.6]),
//!     TermInput::new("revenue", [0.6, 0.8]),
//! ];
//! let engine = LeverageEngine::from_terms(terms, None, AnalysisConfig::default()).unwrap();
//! let levers = engine.analyze("revenue", &Actionability::Declared, 3).unwrap();
//! ```

pub mod cluster;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod recommend;
pub mod registry;
pub mod score;
