//! Intervention recommendations: turn a lever → target pair into experiment plans.
//!
//! For each of the strongest simple paths from lever to target the generator
//! emits an action description, an expected effect size, the per-group sample
//! size of a two-group comparison, a duration in weeks, and guardrail terms:
//! highly central terms on a shortest lever → target route that the chosen
//! path bypasses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RecommendError;
use crate::graph::centrality::{betweenness, percentile, shortest_path_nodes};
use crate::graph::paths::{PathConfig, enumerate_paths};
use crate::graph::{Path, SemanticGraph};

/// Result type for recommendation operations.
pub type RecommendResult<T> = std::result::Result<T, RecommendError>;

/// Optional collaborator mapping a lever category to an action template.
///
/// Templates may contain `{lever}` and `{target}` placeholders.
pub trait ActionTemplates: Send + Sync {
    fn template(&self, category: &str) -> Option<String>;
}

impl<F> ActionTemplates for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn template(&self, category: &str) -> Option<String> {
        self(category)
    }
}

/// Category → template lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateTable(HashMap<String, String>);

impl TemplateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, template: impl Into<String>) {
        self.0.insert(category.into(), template.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl ActionTemplates for TemplateTable {
    fn template(&self, category: &str) -> Option<String> {
        self.0.get(category).cloned()
    }
}

/// One experiment plan for a lever → target pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRecommendation {
    pub lever: String,
    pub target: String,
    /// The path this experiment acts along.
    pub path: Path,
    pub action: String,
    /// Expected standardized effect size, clamped to the configured range.
    pub expected_effect: f64,
    /// Required sample size per group.
    pub sample_size: u64,
    pub duration_weeks: u64,
    /// Central terms to monitor for side effects, sorted lexically.
    pub guardrails: Vec<String>,
}

/// Configuration for recommendation generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// Number of paths (and recommendations) to keep.
    #[serde(default = "default_top_paths")]
    pub top_paths: usize,
    /// Hop cutoff for lever → target paths.
    #[serde(default = "default_path_cutoff")]
    pub path_cutoff: usize,
    /// Enumeration cap before ranking.
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
    /// Multiplier from path strength to expected effect size.
    #[serde(default = "default_calibration")]
    pub calibration_constant: f64,
    /// Numerator of `n = ceil(c / d²)`; 16 ≈ α = 0.05, power = 0.8.
    #[serde(default = "default_sample_size_constant")]
    pub sample_size_constant: f64,
    #[serde(default = "default_min_effect")]
    pub min_effect: f64,
    #[serde(default = "default_max_effect")]
    pub max_effect: f64,
    /// Centrality percentile above which an off-path term becomes a guardrail.
    #[serde(default = "default_guardrail_percentile")]
    pub guardrail_percentile: f64,
    /// Units observed per week. Required; there is no sensible default.
    #[serde(default)]
    pub weekly_throughput: Option<f64>,
}

fn default_top_paths() -> usize {
    3
}
fn default_path_cutoff() -> usize {
    3
}
fn default_max_paths() -> usize {
    50
}
fn default_calibration() -> f64 {
    1.0
}
fn default_sample_size_constant() -> f64 {
    16.0
}
fn default_min_effect() -> f64 {
    0.05
}
fn default_max_effect() -> f64 {
    0.5
}
fn default_guardrail_percentile() -> f64 {
    90.0
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            top_paths: default_top_paths(),
            path_cutoff: default_path_cutoff(),
            max_paths: default_max_paths(),
            calibration_constant: default_calibration(),
            sample_size_constant: default_sample_size_constant(),
            min_effect: default_min_effect(),
            max_effect: default_max_effect(),
            guardrail_percentile: default_guardrail_percentile(),
            weekly_throughput: None,
        }
    }
}

impl RecommendConfig {
    /// Builder-style throughput assumption.
    pub fn with_throughput(mut self, weekly_throughput: f64) -> Self {
        self.weekly_throughput = Some(weekly_throughput);
        self
    }

    /// Reject bounds and constants the plan arithmetic cannot use.
    ///
    /// The throughput assumption is checked separately by [`recommend`], since
    /// a config without one is still valid for scoring-only runs.
    pub fn validate(&self) -> RecommendResult<()> {
        let (min, max) = (self.min_effect, self.max_effect);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(RecommendError::InvalidEffectBounds { min, max });
        }
        for (name, value) in [
            ("calibration_constant", self.calibration_constant),
            ("sample_size_constant", self.sample_size_constant),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(RecommendError::InvalidConstant { name, value });
            }
        }
        if !(0.0..=100.0).contains(&self.guardrail_percentile) {
            return Err(RecommendError::InvalidPercentile {
                percentile: self.guardrail_percentile,
            });
        }
        Ok(())
    }
}

/// `clamp(strength × calibration, [min, max])`.
///
/// Never panics: inverted bounds resolve to `max`. [`recommend`] rejects them
/// up front through [`RecommendConfig::validate`].
pub fn expected_effect_size(strength: f64, calibration: f64, min: f64, max: f64) -> f64 {
    (strength * calibration).max(min).min(max)
}

/// Per-group sample size `ceil(constant / effect²)`.
pub fn required_sample_size(effect: f64, constant: f64) -> u64 {
    let raw = constant / (effect * effect);
    // Absorb representation error that would push an exact quotient past an integer.
    (raw - 1e-9).ceil().max(1.0) as u64
}

/// Weeks needed to observe `sample_size` units at `weekly_throughput` per week.
pub fn duration_weeks(sample_size: u64, weekly_throughput: f64) -> u64 {
    (sample_size as f64 / weekly_throughput).ceil() as u64
}

fn describe_action(
    graph: &SemanticGraph,
    lever: &str,
    target: &str,
    templates: Option<&dyn ActionTemplates>,
) -> String {
    let template = graph
        .term(lever)
        .and_then(|t| t.category.as_deref())
        .and_then(|category| templates.and_then(|tpl| tpl.template(category)));
    match template {
        Some(text) => text.replace("{lever}", lever).replace("{target}", target),
        None => format!("Run a controlled change to \"{lever}\" and measure the response in \"{target}\""),
    }
}

/// Generate up to `config.top_paths` experiment plans for `lever → target`.
///
/// Returns an empty list when the lever cannot reach the target.
pub fn recommend(
    graph: &SemanticGraph,
    lever: &str,
    target: &str,
    config: &RecommendConfig,
    templates: Option<&dyn ActionTemplates>,
) -> RecommendResult<Vec<InterventionRecommendation>> {
    let throughput = config
        .weekly_throughput
        .ok_or(RecommendError::MissingThroughputAssumption)?;
    if !(throughput.is_finite() && throughput > 0.0) {
        return Err(RecommendError::InvalidThroughput { throughput });
    }
    config.validate()?;
    let lever_idx = graph
        .index_of(lever)
        .ok_or_else(|| RecommendError::UnknownLever {
            lever: lever.to_string(),
        })?;
    let target_idx = graph
        .index_of(target)
        .ok_or_else(|| RecommendError::UnknownTarget {
            target: target.to_string(),
        })?;

    let path_config = PathConfig {
        cutoff: config.path_cutoff,
        max_paths: config.max_paths.max(config.top_paths),
    };
    let mut paths = enumerate_paths(graph, lever, target, &path_config).map_err(|_| {
        RecommendError::UnknownLever {
            lever: lever.to_string(),
        }
    })?;
    if paths.is_empty() {
        tracing::info!(lever, target, "no path from lever to target; nothing to recommend");
        return Ok(Vec::new());
    }
    paths.truncate(config.top_paths);

    let centrality = betweenness(graph);
    let cutoff = percentile(&centrality, config.guardrail_percentile);
    let route = shortest_path_nodes(graph, lever_idx.index(), target_idx.index());
    let action = describe_action(graph, lever, target, templates);

    let recommendations: Vec<InterventionRecommendation> = paths
        .into_iter()
        .map(|path| {
            let mut guardrails: Vec<String> = route
                .iter()
                .filter(|&&v| centrality[v] > cutoff)
                .map(|&v| graph.term_at(petgraph::graph::NodeIndex::new(v)).id.clone())
                .filter(|id| !path.contains(id))
                .collect();
            guardrails.sort();

            let expected_effect = expected_effect_size(
                path.strength,
                config.calibration_constant,
                config.min_effect,
                config.max_effect,
            );
            let sample_size = required_sample_size(expected_effect, config.sample_size_constant);
            InterventionRecommendation {
                lever: lever.to_string(),
                target: target.to_string(),
                action: action.clone(),
                expected_effect,
                sample_size,
                duration_weeks: duration_weeks(sample_size, throughput),
                guardrails,
                path,
            }
        })
        .collect();

    tracing::info!(
        lever,
        target,
        count = recommendations.len(),
        "generated intervention recommendations"
    );
    Ok(recommendations)
}
