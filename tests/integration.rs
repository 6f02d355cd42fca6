//! End-to-end integration tests for the semantic leverage engine.
//!
//! These tests exercise the full pipeline from graph construction through
//! scoring and recommendation, validating the documented scenarios and the
//! properties every graph must satisfy.

use rand::{Rng, SeedableRng};

use semantic_leverage::cluster::{ClusterConfig, cluster_terms, cluster_uncertainty};
use semantic_leverage::config::AnalysisConfig;
use semantic_leverage::engine::LeverageEngine;
use semantic_leverage::error::{GraphError, LeverageError, RecommendError, ScoreError};
use semantic_leverage::graph::centrality::betweenness;
use semantic_leverage::graph::paths::{PathConfig, path_strength};
use semantic_leverage::graph::{BoostTable, SemanticGraph, TermInput, build_graph};
use semantic_leverage::recommend::{RecommendConfig, recommend, required_sample_size};
use semantic_leverage::registry::{AnalysisOutput, AnalysisTask, CapabilityRegistry};
use semantic_leverage::score::{
    Actionability, Components, EffectModel, ScoreConfig, score_basic, score_targeted,
};

fn angle(deg: f64) -> [f64; 2] {
    let r = deg.to_radians();
    [r.cos(), r.sin()]
}

/// `a - b - c - kpi` at 30° steps; only neighbours clear 0.8.
fn chain() -> SemanticGraph {
    build_graph(
        vec![
            TermInput::new("a", angle(0.0)),
            TermInput::new("b", angle(30.0)),
            TermInput::new("c", angle(60.0)),
            TermInput::new("kpi", angle(90.0)),
        ],
        0.8,
        None,
    )
    .unwrap()
}

fn scenario_a() -> SemanticGraph {
    build_graph(
        vec![
            TermInput::new("A", [1.0, 0.0]),
            TermInput::new("B", [0.9, 0.436]),
            TermInput::new("C", [0.0, 1.0]),
        ],
        0.5,
        None,
    )
    .unwrap()
}

fn random_graph(seed: u64, n: usize) -> SemanticGraph {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let terms = (0..n)
        .map(|i| {
            let v: Vec<f64> = (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect();
            TermInput::new(format!("t{i:02}"), v).with_actionability(rng.gen_range(0.0..1.0))
        })
        .collect();
    build_graph(terms, 0.2, None).unwrap()
}

#[test]
fn scenario_a_graph_construction() {
    let g = scenario_a();
    assert_eq!(g.node_count(), 3);
    assert_eq!(g.edge_count(), 1);
    assert!((g.weight("A", "B").unwrap() - 0.9).abs() < 1e-3);
    assert!(g.weight("A", "C").is_none());
    assert!(g.weight("B", "C").is_none());
}

#[test]
fn scenario_b_degenerate_clustering() {
    let g = build_graph(
        vec![
            TermInput::new("x", [0.5, 0.5]),
            TermInput::new("y", [0.5, 0.5]),
            TermInput::new("z", [0.5, 0.5]),
        ],
        0.5,
        None,
    )
    .unwrap();
    let clustering = cluster_terms(&g, &ClusterConfig::default());
    assert_eq!(clustering.k, 1);
    assert!(clustering.variances.iter().all(|&v| v == 0.0));
    assert_eq!(
        cluster_uncertainty(&g, &ClusterConfig::default()),
        vec![0.0; 3]
    );

    let scores = score_basic(&g, "x", &Actionability::Declared, &ScoreConfig::default()).unwrap();
    for s in &scores {
        let Components::Basic { uncertainty, .. } = s.components else {
            panic!("expected basic components");
        };
        assert_eq!(uncertainty, 0.0);
    }
}

#[test]
fn scenario_c_unknown_target() {
    let err = score_targeted(
        &chain(),
        "missing",
        &Actionability::Declared,
        None,
        &ScoreConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ScoreError::UnknownTarget { target } if target == "missing"));
}

#[test]
fn scenario_d_no_path_is_empty() {
    let config = RecommendConfig::default().with_throughput(100.0);
    let recs = recommend(&scenario_a(), "A", "C", &config, None).unwrap();
    assert!(recs.is_empty());
}

#[test]
fn scenario_e_sample_size() {
    assert_eq!(required_sample_size(0.2, 16.0), 400);
}

#[test]
fn missing_throughput_fails() {
    let err = recommend(&chain(), "a", "kpi", &RecommendConfig::default(), None).unwrap_err();
    assert!(matches!(err, RecommendError::MissingThroughputAssumption));
}

#[test]
fn build_errors_are_surfaced() {
    let one = vec![TermInput::new("solo", [1.0, 0.0])];
    assert!(matches!(
        build_graph(one, 0.5, None).unwrap_err(),
        GraphError::InsufficientTerms { count: 1 }
    ));

    let dup = vec![
        TermInput::new("x", [1.0, 0.0]),
        TermInput::new("x", [0.0, 1.0]),
    ];
    assert!(matches!(
        build_graph(dup, 0.5, None).unwrap_err(),
        GraphError::DuplicateTerm { .. }
    ));

    let terms = vec![
        TermInput::new("x", [1.0, 0.0]),
        TermInput::new("y", [0.0, 1.0]),
    ];
    assert!(matches!(
        build_graph(terms, 1.5, None).unwrap_err(),
        GraphError::InvalidThreshold { .. }
    ));
}

#[test]
fn boost_promotes_pair_below_threshold() {
    let terms = vec![
        TermInput::new("B", [0.9, 0.436]),
        TermInput::new("C", [0.0, 1.0]),
    ];
    let mut boosts = BoostTable::new();
    boosts.insert("C", "B", 2.0, Some("causes".into()));
    let g = build_graph(terms, 0.5, Some(&boosts)).unwrap();
    let similarity = 0.436 / (0.9_f64.powi(2) + 0.436_f64.powi(2)).sqrt();
    let weight = g.weight("B", "C").unwrap();
    assert!((weight - 2.0 * similarity).abs() < 1e-9);
}

#[test]
fn normalized_factors_lie_in_unit_interval() {
    for seed in 0..5 {
        let g = random_graph(seed, 20);
        let basic =
            score_basic(&g, "t00", &Actionability::Declared, &ScoreConfig::default()).unwrap();
        for s in &basic {
            let Components::Basic {
                sensitivity,
                uncertainty,
                centrality,
                ..
            } = s.components
            else {
                panic!("expected basic components");
            };
            for v in [sensitivity, uncertainty, centrality] {
                assert!((0.0..=1.0).contains(&v), "seed {seed}: {v} out of range");
            }
        }

        let targeted = score_targeted(
            &g,
            "t01",
            &Actionability::Declared,
            None,
            &ScoreConfig::default(),
        )
        .unwrap();
        for s in &targeted {
            let Components::Targeted { betweenness, .. } = s.components else {
                panic!("expected targeted components");
            };
            assert!((0.0..=1.0).contains(&betweenness));
        }
    }
}

#[test]
fn zero_actionability_zeroes_leverage() {
    let g = chain();
    let only_b = Actionability::set(["b"]);

    let basic = score_basic(&g, "kpi", &only_b, &ScoreConfig::default()).unwrap();
    let targeted = score_targeted(&g, "kpi", &only_b, None, &ScoreConfig::default()).unwrap();
    for s in basic.iter().chain(&targeted) {
        if s.term != "b" {
            assert_eq!(s.score, 0.0, "{} should be gated out", s.term);
        }
    }
    assert_eq!(basic[0].term, "b");
    assert!(targeted.iter().any(|s| s.term == "b" && s.score > 0.0));
}

#[test]
fn path_strength_is_monotone_in_edge_weight() {
    let g = chain();
    let config = PathConfig::default();
    let before = path_strength(&g, "a", "kpi", &config).unwrap();

    let stronger = g.with_edge_weight("b", "c", 0.95).unwrap();
    let after = path_strength(&stronger, "a", "kpi", &config).unwrap();
    assert!(after > before);

    let shortcut = g.with_edge_weight("a", "c", 0.3).unwrap();
    let with_shortcut = path_strength(&shortcut, "a", "kpi", &config).unwrap();
    assert!(with_shortcut >= before);
}

#[test]
fn repeated_runs_are_byte_identical() {
    let run = || {
        let g = random_graph(7, 25);
        let basic =
            score_basic(&g, "t03", &Actionability::Declared, &ScoreConfig::default()).unwrap();
        let targeted = score_targeted(
            &g,
            "t03",
            &Actionability::Declared,
            None,
            &ScoreConfig::default(),
        )
        .unwrap();
        (
            serde_json::to_string(&g.snapshot()).unwrap(),
            serde_json::to_string(&basic).unwrap(),
            serde_json::to_string(&targeted).unwrap(),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn chain_centrality_peaks_in_the_middle() {
    let c = betweenness(&chain());
    assert_eq!(c, vec![0.0, 1.0, 1.0, 0.0]);
}

#[test]
fn targeted_ranks_node_nearest_target_first() {
    let results = score_targeted(
        &chain(),
        "kpi",
        &Actionability::Declared,
        None,
        &ScoreConfig::default(),
    )
    .unwrap();
    assert_eq!(results[0].term, "c");
    let Components::Targeted { betweenness, .. } = results[0].components else {
        panic!("expected targeted components");
    };
    assert_eq!(betweenness, 1.0);
}

#[test]
fn effect_model_reweights_targeted_scores() {
    let g = chain();
    let favour_b = |term: &str, _target: &str| if term == "b" { -4.0 } else { 1.0 };
    let results = score_targeted(
        &g,
        "kpi",
        &Actionability::Declared,
        Some(&favour_b as &dyn EffectModel),
        &ScoreConfig::default(),
    )
    .unwrap();
    let b = results.iter().find(|s| s.term == "b").unwrap();
    let Components::Targeted { model_effect, .. } = b.components else {
        panic!("expected targeted components");
    };
    assert_eq!(model_effect, 1.0);
    assert_eq!(results[0].term, "b");
}

#[test]
fn engine_end_to_end() {
    let mut config = AnalysisConfig {
        similarity_threshold: 0.8,
        ..Default::default()
    };
    config.recommend.weekly_throughput = Some(50.0);
    let terms = vec![
        TermInput::new("a", angle(0.0)),
        TermInput::new("b", angle(30.0)),
        TermInput::new("c", angle(60.0)),
        TermInput::new("kpi", angle(90.0)),
    ];
    let engine = LeverageEngine::from_terms(terms, None, config).unwrap();

    let info = engine.info();
    assert_eq!((info.node_count, info.edge_count), (4, 3));
    assert_eq!(info.component_count, 1);

    let levers = engine.analyze("kpi", &Actionability::Declared, 2).unwrap();
    assert_eq!(levers.len(), 2);

    let many = engine
        .score_targeted_many(
            &["kpi".to_string(), "a".to_string()],
            &Actionability::Declared,
            None,
        )
        .unwrap();
    assert_eq!(many[0].0, "kpi");
    assert_eq!(many[1].0, "a");

    let recs = engine.recommend("a", "kpi", None).unwrap();
    assert_eq!(recs.len(), 1);
    let rec = &recs[0];
    assert_eq!(rec.path.terms, vec!["a", "b", "c", "kpi"]);
    assert!((0.05..=0.5).contains(&rec.expected_effect));
    assert_eq!(rec.duration_weeks, rec.sample_size.div_ceil(50));
    assert!(rec.guardrails.is_empty());
}

#[test]
fn engine_errors_wrap_subsystem_errors() {
    let engine = LeverageEngine::new(chain(), AnalysisConfig::default()).unwrap();
    let err = engine
        .score_basic("nowhere", &Actionability::Declared)
        .unwrap_err();
    assert!(matches!(err, LeverageError::Score(ScoreError::UnknownKpi { .. })));

    let err = engine.recommend("a", "kpi", None).unwrap_err();
    assert!(matches!(
        err,
        LeverageError::Recommend(RecommendError::MissingThroughputAssumption)
    ));
}

#[test]
fn registry_dispatch_through_engine() {
    let engine = LeverageEngine::new(chain(), AnalysisConfig::default()).unwrap();
    let registry = CapabilityRegistry::with_defaults();
    let out = registry
        .dispatch(
            &engine,
            &AnalysisTask::Targeted {
                target: "kpi".into(),
                actionable: Actionability::Declared,
            },
        )
        .unwrap();
    let AnalysisOutput::Scores(scores) = out else {
        panic!("expected scores");
    };
    assert_eq!(scores.len(), 4);
    assert_eq!(scores[0].term, "c");
}
