//! Engine facade: top-level API for the semantic leverage system.
//!
//! A `LeverageEngine` owns one immutable graph snapshot (shared through an
//! `Arc`, so any number of threads can score against it) plus the analysis
//! configuration. Collaborators such as effect models and action templates
//! are passed per call rather than registered on the engine.

use std::path::Path;
use std::sync::Arc;

use crate::cluster::{Clustering, cluster_terms};
use crate::config::AnalysisConfig;
use crate::embedding::{EmbeddingProvider, embed_all};
use crate::error::LevResult;
use crate::export::GraphSnapshot;
use crate::graph::{RelationBoost, SemanticGraph, TermInput, build_graph};
use crate::recommend::{ActionTemplates, InterventionRecommendation, recommend};
use crate::score::{
    Actionability, EffectModel, LeverageScore, score_basic, score_targeted, score_targeted_many,
    top_levers,
};

/// The semantic leverage engine.
#[derive(Clone)]
pub struct LeverageEngine {
    config: AnalysisConfig,
    graph: Arc<SemanticGraph>,
}

impl LeverageEngine {
    /// Wrap an already-built graph.
    pub fn new(graph: SemanticGraph, config: AnalysisConfig) -> LevResult<Self> {
        config.validate()?;
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "initializing leverage engine"
        );
        Ok(Self {
            config,
            graph: Arc::new(graph),
        })
    }

    /// Build the graph from term inputs using the configured threshold.
    pub fn from_terms(
        terms: Vec<TermInput>,
        boosts: Option<&dyn RelationBoost>,
        config: AnalysisConfig,
    ) -> LevResult<Self> {
        config.validate()?;
        let graph = build_graph(terms, config.similarity_threshold, boosts)?;
        Self::new(graph, config)
    }

    /// Fetch embeddings for `terms` from `provider` with the configured model, then build.
    pub fn from_provider<P: EmbeddingProvider + ?Sized>(
        provider: &P,
        terms: &[String],
        boosts: Option<&dyn RelationBoost>,
        config: AnalysisConfig,
    ) -> LevResult<Self> {
        let embeddings = embed_all(provider, terms, &config.model)?;
        let inputs = terms
            .iter()
            .zip(embeddings)
            .map(|(id, embedding)| TermInput::new(id.clone(), embedding))
            .collect();
        Self::from_terms(inputs, boosts, config)
    }

    /// Restore a graph snapshot from disk.
    pub fn load(path: &Path, config: AnalysisConfig) -> LevResult<Self> {
        let graph = GraphSnapshot::load(path)?.into_graph()?;
        Self::new(graph, config)
    }

    /// Persist the graph snapshot to disk.
    pub fn save(&self, path: &Path) -> LevResult<()> {
        Ok(self.graph.snapshot().save(path)?)
    }

    /// Basic leverage of every term against `kpi`.
    pub fn score_basic(
        &self,
        kpi: &str,
        actionable: &Actionability,
    ) -> LevResult<Vec<LeverageScore>> {
        Ok(score_basic(&self.graph, kpi, actionable, &self.config.score)?)
    }

    /// Targeted leverage of every term toward `target`.
    pub fn score_targeted(
        &self,
        target: &str,
        actionable: &Actionability,
        effect_model: Option<&dyn EffectModel>,
    ) -> LevResult<Vec<LeverageScore>> {
        Ok(score_targeted(
            &self.graph,
            target,
            actionable,
            effect_model,
            &self.config.score,
        )?)
    }

    /// Targeted leverage for several targets in parallel.
    pub fn score_targeted_many(
        &self,
        targets: &[String],
        actionable: &Actionability,
        effect_model: Option<&dyn EffectModel>,
    ) -> LevResult<Vec<(String, Vec<LeverageScore>)>> {
        Ok(score_targeted_many(
            &self.graph,
            targets,
            actionable,
            effect_model,
            &self.config.score,
        )?)
    }

    /// Experiment plans for `lever → target` using the configured recommendation settings.
    pub fn recommend(
        &self,
        lever: &str,
        target: &str,
        templates: Option<&dyn ActionTemplates>,
    ) -> LevResult<Vec<InterventionRecommendation>> {
        Ok(recommend(
            &self.graph,
            lever,
            target,
            &self.config.recommend,
            templates,
        )?)
    }

    /// The `n` strongest basic levers for `kpi`.
    pub fn analyze(
        &self,
        kpi: &str,
        actionable: &Actionability,
        n: usize,
    ) -> LevResult<Vec<LeverageScore>> {
        let results = self.score_basic(kpi, actionable)?;
        Ok(top_levers(&results, n).to_vec())
    }

    /// Run the clustering step.
    pub fn clusters(&self) -> Clustering {
        cluster_terms(&self.graph, &self.config.score.cluster)
    }

    /// New engine whose graph carries the cluster id of every term.
    pub fn with_clusters(&self) -> Self {
        let clustering = self.clusters();
        Self {
            config: self.config.clone(),
            graph: Arc::new(self.graph.with_clusters(&clustering.assignments)),
        }
    }

    /// Shared handle to the graph.
    pub fn graph(&self) -> Arc<SemanticGraph> {
        Arc::clone(&self.graph)
    }

    /// Serializable snapshot of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Graph statistics.
    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            isolated_count: self.graph.isolated_count(),
            component_count: self.graph.component_count(),
            threshold: self.graph.threshold(),
            cluster_count: crate::cluster::cluster_count(self.graph.node_count()),
        }
    }
}

/// Summary statistics of the engine's graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EngineInfo {
    pub node_count: usize,
    pub edge_count: usize,
    pub isolated_count: usize,
    pub component_count: usize,
    pub threshold: f64,
    pub cluster_count: usize,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "semantic leverage engine info")?;
        writeln!(f, "  nodes:        {}", self.node_count)?;
        writeln!(f, "  edges:        {}", self.edge_count)?;
        writeln!(f, "  isolated:     {}", self.isolated_count)?;
        writeln!(f, "  components:   {}", self.component_count)?;
        writeln!(f, "  threshold:    {}", self.threshold)?;
        writeln!(f, "  clusters (k): {}", self.cluster_count)?;
        Ok(())
    }
}

impl std::fmt::Debug for LeverageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeverageEngine")
            .field("config", &self.config)
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingTable;
    use crate::error::{GraphError, LeverageError};

    fn test_engine() -> LeverageEngine {
        let terms = vec![
            TermInput::new("A", [1.0, 0.0]),
            TermInput::new("B", [0.9, 0.436]),
            TermInput::new("C", [0.0, 1.0]),
        ];
        LeverageEngine::from_terms(terms, None, AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn engine_reports_graph_info() {
        let engine = test_engine();
        let info = engine.info();
        assert_eq!(info.node_count, 3);
        assert_eq!(info.edge_count, 1);
        assert_eq!(info.isolated_count, 1);
        assert_eq!(info.component_count, 2);
        assert!(info.to_string().contains("nodes:        3"));
    }

    #[test]
    fn engine_rejects_invalid_config() {
        let config = AnalysisConfig {
            similarity_threshold: 2.0,
            ..Default::default()
        };
        let terms = vec![
            TermInput::new("A", [1.0, 0.0]),
            TermInput::new("B", [0.0, 1.0]),
        ];
        assert!(matches!(
            LeverageEngine::from_terms(terms, None, config).unwrap_err(),
            LeverageError::Config(_)
        ));
    }

    #[test]
    fn engine_builds_from_provider() {
        let table = EmbeddingTable::new("default")
            .with("price", [1.0, 0.0])
            .with("demand", [0.8, 0.6]);
        let terms = vec!["price".to_string(), "demand".to_string()];
        let engine =
            LeverageEngine::from_provider(&table, &terms, None, AnalysisConfig::default())
                .unwrap();
        assert_eq!(engine.info().edge_count, 1);
    }

    #[test]
    fn provider_missing_term_surfaces_graph_error() {
        let table = EmbeddingTable::new("default").with("price", [1.0, 0.0]);
        let terms = vec!["price".to_string(), "churn".to_string()];
        let err = LeverageEngine::from_provider(&table, &terms, None, AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            LeverageError::Graph(GraphError::MissingEmbedding { .. })
        ));
    }

    #[test]
    fn with_clusters_annotates_terms_without_touching_original() {
        let engine = test_engine();
        let clustered = engine.with_clusters();
        assert!(engine.graph().terms().all(|t| t.cluster.is_none()));
        assert!(clustered.graph().terms().all(|t| t.cluster.is_some()));
    }

    #[test]
    fn analyze_returns_top_n() {
        let engine = test_engine();
        let top = engine.analyze("A", &Actionability::Declared, 2).unwrap();
        assert_eq!(top.len(), 2);
        assert!(top[0].score >= top[1].score);
    }
}
