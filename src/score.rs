//! Leverage scoring.
//!
//! Two pure functions of a [`SemanticGraph`] plus caller parameters:
//!
//! - **Basic**: `L(v) = A(v) × (S(v) + U(v) + C(v))`, measured against a KPI term.
//! - **Targeted**: `L(v→T) = Betweenness_T(v) × PathStrength(v→T) × A(v) × ModelEffect_T(v)`.
//!
//! Sensitivity `S` and uncertainty `U` are embedding-space proxies, not causal
//! estimates. Output is sorted by score desc, ties broken by ascending term id.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cluster::{ClusterConfig, cluster_terms};
use crate::error::ScoreError;
use crate::graph::SemanticGraph;
use crate::graph::centrality::{betweenness, targeted_betweenness};
use crate::graph::paths::{PathConfig, path_strengths_to};

/// Result type for scoring operations.
pub type ScoreResult<T> = std::result::Result<T, ScoreError>;

/// How actionability `A(v)` is determined.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Actionability {
    /// Use each term's declared actionability.
    #[default]
    Declared,
    /// Explicit per-term values; terms not listed use their declared value.
    Values(HashMap<String, f64>),
    /// Membership set: 1.0 for members, 0.0 for everything else.
    Set(HashSet<String>),
}

impl Actionability {
    /// Membership-set actionability from any iterable of term ids.
    pub fn set<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Set(terms.into_iter().map(Into::into).collect())
    }

    /// Resolve `A(v)` for every node, in node-index order.
    pub fn resolve(&self, graph: &SemanticGraph) -> ScoreResult<Vec<f64>> {
        graph
            .terms()
            .map(|term| {
                let value = match self {
                    Self::Declared => term.actionability,
                    Self::Values(map) => map.get(&term.id).copied().unwrap_or(term.actionability),
                    Self::Set(set) => {
                        if set.contains(&term.id) {
                            1.0
                        } else {
                            0.0
                        }
                    }
                };
                if !(0.0..=1.0).contains(&value) {
                    return Err(ScoreError::InvalidActionability {
                        term: term.id.clone(),
                        value,
                    });
                }
                Ok(value)
            })
            .collect()
    }
}

/// Optional collaborator estimating a term's effect on a target.
///
/// Only the magnitude is used; it is normalized by the largest magnitude
/// across all terms for that target.
pub trait EffectModel: Send + Sync {
    fn effect(&self, term: &str, target: &str) -> f64;
}

impl<F> EffectModel for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn effect(&self, term: &str, target: &str) -> f64 {
        self(term, target)
    }
}

/// Named factors that produced a leverage score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Components {
    Basic {
        actionability: f64,
        sensitivity: f64,
        uncertainty: f64,
        centrality: f64,
    },
    Targeted {
        betweenness: f64,
        path_strength: f64,
        actionability: f64,
        model_effect: f64,
    },
}

/// Leverage of one term with respect to one KPI or target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageScore {
    /// The candidate lever.
    pub term: String,
    /// The KPI (basic mode) or target (targeted mode).
    pub target: String,
    /// Aggregate leverage.
    pub score: f64,
    /// Factors behind the score.
    pub components: Components,
}

/// Configuration for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Hop cutoff for path strength in targeted mode.
    #[serde(default = "default_path_cutoff")]
    pub path_cutoff: usize,
    /// Maximum paths summed per (term, target) pair.
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
    /// Clustering parameters for uncertainty.
    #[serde(default)]
    pub cluster: ClusterConfig,
}

fn default_path_cutoff() -> usize {
    5
}
fn default_max_paths() -> usize {
    50
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            path_cutoff: default_path_cutoff(),
            max_paths: default_max_paths(),
            cluster: ClusterConfig::default(),
        }
    }
}

impl ScoreConfig {
    pub fn path_config(&self) -> PathConfig {
        PathConfig {
            cutoff: self.path_cutoff,
            max_paths: self.max_paths,
        }
    }
}

fn rank(results: &mut [LeverageScore]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
}

/// Sensitivity `S(v) = 1 − d(v, KPI) / max d(·, KPI)` using Euclidean distance.
///
/// All ones when the maximum distance is zero.
pub fn sensitivity(graph: &SemanticGraph, kpi: &str) -> ScoreResult<Vec<f64>> {
    let kpi_term = graph.term(kpi).ok_or_else(|| ScoreError::UnknownKpi {
        kpi: kpi.to_string(),
    })?;
    let distances: Vec<f64> = graph
        .terms()
        .map(|t| t.embedding.distance(&kpi_term.embedding))
        .collect();
    let max = distances.iter().copied().fold(0.0_f64, f64::max);
    if max == 0.0 {
        tracing::debug!(kpi, "all terms coincide with the KPI; sensitivity is 1 everywhere");
        return Ok(vec![1.0; distances.len()]);
    }
    Ok(distances
        .into_iter()
        .map(|d| (1.0 - d / max).clamp(0.0, 1.0))
        .collect())
}

/// Basic leverage of every term against `kpi`.
pub fn score_basic(
    graph: &SemanticGraph,
    kpi: &str,
    actionable: &Actionability,
    config: &ScoreConfig,
) -> ScoreResult<Vec<LeverageScore>> {
    let s = sensitivity(graph, kpi)?;
    let a = actionable.resolve(graph)?;
    let u = cluster_terms(graph, &config.cluster).uncertainty();
    let c = betweenness(graph);

    let mut results: Vec<LeverageScore> = graph
        .terms()
        .enumerate()
        .map(|(i, term)| {
            let score = if a[i] == 0.0 {
                0.0
            } else {
                a[i] * (s[i] + u[i] + c[i])
            };
            LeverageScore {
                term: term.id.clone(),
                target: kpi.to_string(),
                score,
                components: Components::Basic {
                    actionability: a[i],
                    sensitivity: s[i],
                    uncertainty: u[i],
                    centrality: c[i],
                },
            }
        })
        .collect();

    rank(&mut results);
    tracing::info!(kpi, terms = results.len(), "scored basic leverage");
    Ok(results)
}

/// Normalized |effect| per node for `target`; all ones without a model.
fn model_effects(
    graph: &SemanticGraph,
    target: &str,
    model: Option<&dyn EffectModel>,
) -> Vec<f64> {
    let Some(model) = model else {
        return vec![1.0; graph.node_count()];
    };
    let magnitudes: Vec<f64> = graph
        .terms()
        .map(|t| {
            let e = model.effect(&t.id, target).abs();
            if e.is_finite() { e } else { 0.0 }
        })
        .collect();
    let max = magnitudes.iter().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        magnitudes.into_iter().map(|m| m / max).collect()
    } else {
        vec![0.0; magnitudes.len()]
    }
}

/// Targeted leverage of every term toward `target`.
pub fn score_targeted(
    graph: &SemanticGraph,
    target: &str,
    actionable: &Actionability,
    effect_model: Option<&dyn EffectModel>,
    config: &ScoreConfig,
) -> ScoreResult<Vec<LeverageScore>> {
    let t = graph
        .index_of(target)
        .ok_or_else(|| ScoreError::UnknownTarget {
            target: target.to_string(),
        })?
        .index();
    let bt = targeted_betweenness(graph, target)?;
    let a = actionable.resolve(graph)?;
    let strengths = path_strengths_to(graph, t, &config.path_config());
    let effects = model_effects(graph, target, effect_model);

    let mut results: Vec<LeverageScore> = graph
        .terms()
        .enumerate()
        .map(|(i, term)| {
            let score = if a[i] == 0.0 {
                0.0
            } else {
                bt[i] * strengths[i] * a[i] * effects[i]
            };
            LeverageScore {
                term: term.id.clone(),
                target: target.to_string(),
                score,
                components: Components::Targeted {
                    betweenness: bt[i],
                    path_strength: strengths[i],
                    actionability: a[i],
                    model_effect: effects[i],
                },
            }
        })
        .collect();

    rank(&mut results);
    tracing::info!(target, terms = results.len(), "scored targeted leverage");
    Ok(results)
}

/// Targeted leverage for several targets, computed in parallel.
///
/// Results are returned in the order of `targets`. Any unknown target fails
/// the whole call.
pub fn score_targeted_many(
    graph: &SemanticGraph,
    targets: &[String],
    actionable: &Actionability,
    effect_model: Option<&dyn EffectModel>,
    config: &ScoreConfig,
) -> ScoreResult<Vec<(String, Vec<LeverageScore>)>> {
    targets
        .par_iter()
        .map(|target| {
            score_targeted(graph, target, actionable, effect_model, config)
                .map(|scores| (target.clone(), scores))
        })
        .collect()
}

/// The first `n` entries of a ranked result list.
pub fn top_levers(results: &[LeverageScore], n: usize) -> &[LeverageScore] {
    &results[..n.min(results.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TermInput, build_graph};

    fn chain() -> SemanticGraph {
        let angle = |deg: f64| {
            let r = deg.to_radians();
            [r.cos(), r.sin()]
        };
        let terms = vec![
            TermInput::new("a", angle(0.0)),
            TermInput::new("b", angle(30.0)),
            TermInput::new("c", angle(60.0)),
            TermInput::new("kpi", angle(90.0)),
        ];
        build_graph(terms, 0.8, None).unwrap()
    }

    fn find<'a>(results: &'a [LeverageScore], term: &str) -> &'a LeverageScore {
        results.iter().find(|r| r.term == term).unwrap()
    }

    #[test]
    fn sensitivity_is_one_at_kpi_and_zero_at_farthest() {
        let g = chain();
        let s = sensitivity(&g, "kpi").unwrap();
        assert_eq!(s[3], 1.0);
        assert_eq!(s[0], 0.0);
        assert!(s[1] < s[2]);
    }

    #[test]
    fn unknown_kpi_fails() {
        let g = chain();
        let err = score_basic(&g, "revenue", &Actionability::Declared, &ScoreConfig::default())
            .unwrap_err();
        assert!(matches!(err, ScoreError::UnknownKpi { .. }));
    }

    #[test]
    fn basic_scores_sum_factors_and_gate_on_actionability() {
        let g = chain();
        let actionable = Actionability::set(["b", "c"]);
        let results = score_basic(&g, "kpi", &actionable, &ScoreConfig::default()).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(find(&results, "a").score, 0.0);
        assert_eq!(find(&results, "kpi").score, 0.0);
        let c = find(&results, "c");
        let Components::Basic {
            actionability,
            sensitivity,
            uncertainty,
            centrality,
        } = c.components
        else {
            panic!("expected basic components");
        };
        assert_eq!(actionability, 1.0);
        assert!((c.score - (sensitivity + uncertainty + centrality)).abs() < 1e-12);
    }

    #[test]
    fn ties_break_lexically() {
        let terms = vec![
            TermInput::new("zeta", [1.0, 0.0]),
            TermInput::new("alpha", [1.0, 0.0]),
            TermInput::new("kpi", [1.0, 0.0]),
        ];
        let g = build_graph(terms, 0.5, None).unwrap();
        let results =
            score_basic(&g, "kpi", &Actionability::Declared, &ScoreConfig::default()).unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(order, vec!["alpha", "kpi", "zeta"]);
    }

    #[test]
    fn targeted_scores_favour_bridging_terms() {
        let g = chain();
        let results =
            score_targeted(&g, "kpi", &Actionability::Declared, None, &ScoreConfig::default())
                .unwrap();
        assert_eq!(results[0].term, "c");
        assert!(results[0].score > 0.0);
        // The endpoint of every path has no betweenness of its own.
        assert_eq!(find(&results, "a").score, 0.0);
        assert_eq!(find(&results, "kpi").score, 0.0);
    }

    #[test]
    fn targeted_unknown_target_fails() {
        let g = chain();
        let err = score_targeted(&g, "nope", &Actionability::Declared, None, &ScoreConfig::default())
            .unwrap_err();
        assert!(matches!(err, ScoreError::UnknownTarget { .. }));
    }

    #[test]
    fn effect_model_is_normalized_by_magnitude() {
        let g = chain();
        let model = |term: &str, _: &str| match term {
            "b" => -4.0,
            "c" => 2.0,
            _ => 0.0,
        };
        let results = score_targeted(
            &g,
            "kpi",
            &Actionability::Declared,
            Some(&model),
            &ScoreConfig::default(),
        )
        .unwrap();
        let effect_of = |term: &str| match find(&results, term).components {
            Components::Targeted { model_effect, .. } => model_effect,
            _ => unreachable!(),
        };
        assert_eq!(effect_of("b"), 1.0);
        assert_eq!(effect_of("c"), 0.5);
        assert_eq!(effect_of("a"), 0.0);
    }

    #[test]
    fn actionability_values_out_of_range_rejected() {
        let g = chain();
        let actionable = Actionability::Values(HashMap::from([("a".to_string(), 1.5)]));
        let err = score_basic(&g, "kpi", &actionable, &ScoreConfig::default()).unwrap_err();
        assert!(matches!(err, ScoreError::InvalidActionability { .. }));
    }

    #[test]
    fn many_targets_preserve_order() {
        let g = chain();
        let targets = vec!["kpi".to_string(), "a".to_string()];
        let out = score_targeted_many(
            &g,
            &targets,
            &Actionability::Declared,
            None,
            &ScoreConfig::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, "kpi");
        assert_eq!(out[1].0, "a");
        let single =
            score_targeted(&g, "a", &Actionability::Declared, None, &ScoreConfig::default())
                .unwrap();
        assert_eq!(out[1].1, single);
    }

    #[test]
    fn top_levers_truncates() {
        let g = chain();
        let results =
            score_basic(&g, "kpi", &Actionability::Declared, &ScoreConfig::default()).unwrap();
        assert_eq!(top_levers(&results, 2).len(), 2);
        assert_eq!(top_levers(&results, 10).len(), 4);
    }
}
