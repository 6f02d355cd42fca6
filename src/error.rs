//! Rich diagnostic error types for the semantic leverage engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! which input was rejected and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the semantic leverage engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum LeverageError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Recommend(#[from] RecommendError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// Graph construction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("insufficient terms: need at least 2, got {count}")]
    #[diagnostic(
        code(leverage::graph::insufficient_terms),
        help("A similarity graph needs at least two terms. Supply a larger term set.")
    )]
    InsufficientTerms { count: usize },

    #[error("duplicate term: \"{term}\"")]
    #[diagnostic(
        code(leverage::graph::duplicate_term),
        help("Term identifiers must be unique within one graph. Remove or rename the duplicate.")
    )]
    DuplicateTerm { term: String },

    #[error("invalid similarity threshold {threshold}: must lie in (0, 1]")]
    #[diagnostic(
        code(leverage::graph::invalid_threshold),
        help("Choose a threshold greater than 0 and at most 1, e.g. 0.5.")
    )]
    InvalidThreshold { threshold: f64 },

    #[error("no embedding supplied for term \"{term}\"")]
    #[diagnostic(
        code(leverage::graph::missing_embedding),
        help("Every term needs an embedding from the embedding provider before the graph is built.")
    )]
    MissingEmbedding { term: String },

    #[error("embedding for \"{term}\" has dimension {actual}, expected {expected}")]
    #[diagnostic(
        code(leverage::graph::dim_mismatch),
        help(
            "All embeddings in one graph must share a dimension. \
             Check that they were produced by the same model."
        )
    )]
    DimensionMismatch {
        term: String,
        expected: usize,
        actual: usize,
    },

    #[error("embedding for \"{term}\" is empty")]
    #[diagnostic(
        code(leverage::graph::empty_embedding),
        help("Embeddings must have at least one dimension.")
    )]
    EmptyEmbedding { term: String },

    #[error("embedding for \"{term}\" has a non-finite component")]
    #[diagnostic(
        code(leverage::graph::non_finite_embedding),
        help("Embedding components must be finite numbers. Regenerate the vector for this term.")
    )]
    NonFiniteEmbedding { term: String },

    #[error("declared actionability {value} for \"{term}\" is outside [0, 1]")]
    #[diagnostic(
        code(leverage::graph::invalid_actionability),
        help("Actionability is a fraction: 0 for terms that cannot be changed, 1 for fully controllable ones.")
    )]
    InvalidActionability { term: String, value: f64 },

    #[error("invalid relation boost {factor} for (\"{a}\", \"{b}\")")]
    #[diagnostic(
        code(leverage::graph::invalid_boost),
        help("Relation boosts are multipliers and must be finite and non-negative.")
    )]
    InvalidBoost { a: String, b: String, factor: f64 },

    #[error("term not found in graph: \"{term}\"")]
    #[diagnostic(
        code(leverage::graph::unknown_term),
        help("The term is not a node of this graph. Check the spelling or rebuild the graph with it.")
    )]
    UnknownTerm { term: String },

    #[error("graph snapshot I/O failed: {path}")]
    #[diagnostic(
        code(leverage::graph::snapshot_io),
        help("Check that the path exists and that you have read/write permissions.")
    )]
    SnapshotIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("graph snapshot format error: {message}")]
    #[diagnostic(
        code(leverage::graph::snapshot_format),
        help(
            "The snapshot could not be encoded or decoded. \
             Use a `.json` or `.bin` file written by this version of the engine."
        )
    )]
    SnapshotFormat { message: String },
}

// ---------------------------------------------------------------------------
// Clustering errors (internal)
// ---------------------------------------------------------------------------

/// Errors from the clustering routine.
///
/// These never reach callers of the scoring API: a degenerate clustering is a
/// valid input and falls back to zero uncertainty.
#[derive(Debug, Error, Diagnostic)]
pub enum ClusterError {
    #[error("degenerate clustering: {reason}")]
    #[diagnostic(
        code(leverage::cluster::degenerate),
        help("Every term receives zero uncertainty when the embeddings cannot be partitioned.")
    )]
    Degenerate { reason: String },
}

// ---------------------------------------------------------------------------
// Scoring errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ScoreError {
    #[error("unknown KPI: \"{kpi}\"")]
    #[diagnostic(
        code(leverage::score::unknown_kpi),
        help("The KPI must be one of the graph's terms. Add it to the term set and rebuild.")
    )]
    UnknownKpi { kpi: String },

    #[error("unknown target: \"{target}\"")]
    #[diagnostic(
        code(leverage::score::unknown_target),
        help("The target must be one of the graph's terms. Add it to the term set and rebuild.")
    )]
    UnknownTarget { target: String },

    #[error("invalid actionability {value} for \"{term}\": must lie in [0, 1]")]
    #[diagnostic(
        code(leverage::score::invalid_actionability),
        help("Actionability is a degree between 0 (cannot be changed) and 1 (directly changeable).")
    )]
    InvalidActionability { term: String, value: f64 },
}

// ---------------------------------------------------------------------------
// Recommendation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RecommendError {
    #[error("missing weekly throughput assumption")]
    #[diagnostic(
        code(leverage::recommend::missing_throughput),
        help(
            "Duration estimates need the number of units observed per week. \
             Pass a domain-appropriate `weekly_throughput`; there is no default."
        )
    )]
    MissingThroughputAssumption,

    #[error("invalid weekly throughput {throughput}: must be finite and > 0")]
    #[diagnostic(
        code(leverage::recommend::invalid_throughput),
        help("Throughput is a count of units per week and must be positive.")
    )]
    InvalidThroughput { throughput: f64 },

    #[error("unknown lever: \"{lever}\"")]
    #[diagnostic(
        code(leverage::recommend::unknown_lever),
        help("The lever must be one of the graph's terms.")
    )]
    UnknownLever { lever: String },

    #[error("unknown target: \"{target}\"")]
    #[diagnostic(
        code(leverage::recommend::unknown_target),
        help("The target must be one of the graph's terms.")
    )]
    UnknownTarget { target: String },

    #[error("invalid guardrail percentile {percentile}: must lie in [0, 100]")]
    #[diagnostic(
        code(leverage::recommend::invalid_percentile),
        help("Use a percentile such as 90 to flag the top decile of central terms.")
    )]
    InvalidPercentile { percentile: f64 },

    #[error("invalid effect bounds [{min}, {max}]: need 0 < min_effect <= max_effect")]
    #[diagnostic(
        code(leverage::recommend::invalid_effect_bounds),
        help("Effect sizes are standardized and positive, e.g. min_effect = 0.05, max_effect = 0.5.")
    )]
    InvalidEffectBounds { min: f64, max: f64 },

    #[error("invalid {name} {value}: must be finite and > 0")]
    #[diagnostic(
        code(leverage::recommend::invalid_constant),
        help("Calibration and sample size constants scale the plan and must be positive.")
    )]
    InvalidConstant { name: &'static str, value: f64 },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read analysis config: {path}")]
    #[diagnostic(
        code(leverage::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse analysis config: {path}: {message}")]
    #[diagnostic(
        code(leverage::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write analysis config: {path}")]
    #[diagnostic(
        code(leverage::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(leverage::config::invalid),
        help("Check the AnalysisConfig fields. {message}")
    )]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("capability \"{name}\" is already registered")]
    #[diagnostic(
        code(leverage::registry::duplicate),
        help("Capability names are unique. Unregister the existing one first or choose another name.")
    )]
    DuplicateCapability { name: String },

    #[error("no capability handles task: {task}")]
    #[diagnostic(
        code(leverage::registry::unhandled),
        help("Register a capability whose predicate matches this task, or use `with_defaults()`.")
    )]
    Unhandled { task: String },
}

/// Convenience alias for functions returning leverage engine results.
pub type LevResult<T> = std::result::Result<T, LeverageError>;
