//! semlev CLI: semantic leverage analysis.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use semantic_leverage::config::AnalysisConfig;
use semantic_leverage::engine::LeverageEngine;
use semantic_leverage::graph::{BoostEntry, BoostTable, RelationBoost, TermInput};
use semantic_leverage::score::{Actionability, top_levers};

#[derive(Parser)]
#[command(name = "semlev", version, about = "Semantic leverage analysis")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a semantic graph from a terms file and save its snapshot.
    Build {
        /// JSON file of terms with embeddings.
        #[arg(long)]
        terms: PathBuf,

        /// Similarity threshold (overrides the config value).
        #[arg(long)]
        threshold: Option<f64>,

        /// JSON file of relation boosts.
        #[arg(long)]
        boosts: Option<PathBuf>,

        /// Snapshot output path (`.bin` for bincode, otherwise JSON).
        #[arg(long)]
        out: PathBuf,
    },

    /// Show graph statistics.
    Info {
        #[arg(long)]
        graph: PathBuf,
    },

    /// Rank levers for a KPI (basic leverage).
    Score {
        #[arg(long)]
        graph: PathBuf,

        #[arg(long)]
        kpi: String,

        /// Actionable terms (comma-separated). Declared values are used when omitted.
        #[arg(long)]
        actionable: Option<String>,

        /// Number of results to print.
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Rank levers toward a target (targeted leverage).
    Target {
        #[arg(long)]
        graph: PathBuf,

        #[arg(long)]
        target: String,

        /// Actionable terms (comma-separated). Declared values are used when omitted.
        #[arg(long)]
        actionable: Option<String>,

        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Generate experiment plans for a lever and target.
    Recommend {
        #[arg(long)]
        graph: PathBuf,

        #[arg(long)]
        lever: String,

        #[arg(long)]
        target: String,

        /// Expected eligible units per week.
        #[arg(long)]
        throughput: Option<f64>,

        /// Number of paths to turn into experiments.
        #[arg(long)]
        top_paths: Option<usize>,

        /// Calibration constant for the expected effect size.
        #[arg(long)]
        calibration: Option<f64>,
    },

    /// Manage configuration files.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration.
    Init {
        /// Destination path.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path).into_diagnostic()?,
        None => AnalysisConfig::default(),
    };

    match cli.command {
        Commands::Build {
            terms,
            threshold,
            boosts,
            out,
        } => {
            if let Some(t) = threshold {
                config.similarity_threshold = t;
            }
            let inputs: Vec<TermInput> = read_json(&terms)?;
            let table: Option<BoostTable> = match boosts {
                Some(path) => {
                    let entries: Vec<BoostEntry> = read_json(&path)?;
                    Some(entries.into_iter().collect())
                }
                None => None,
            };
            let engine = LeverageEngine::from_terms(
                inputs,
                table.as_ref().map(|t| t as &dyn RelationBoost),
                config,
            )
            .into_diagnostic()?;
            engine.save(&out).into_diagnostic()?;
            print_json(&engine.info())?;
        }

        Commands::Info { graph } => {
            let engine = LeverageEngine::load(&graph, config).into_diagnostic()?;
            print_json(&engine.info())?;
        }

        Commands::Score {
            graph,
            kpi,
            actionable,
            top,
        } => {
            let engine = LeverageEngine::load(&graph, config).into_diagnostic()?;
            let actionable = parse_actionable(actionable.as_deref());
            let results = engine.score_basic(&kpi, &actionable).into_diagnostic()?;
            print_json(&top_levers(&results, top))?;
        }

        Commands::Target {
            graph,
            target,
            actionable,
            top,
        } => {
            let engine = LeverageEngine::load(&graph, config).into_diagnostic()?;
            let actionable = parse_actionable(actionable.as_deref());
            let results = engine
                .score_targeted(&target, &actionable, None)
                .into_diagnostic()?;
            print_json(&top_levers(&results, top))?;
        }

        Commands::Recommend {
            graph,
            lever,
            target,
            throughput,
            top_paths,
            calibration,
        } => {
            if let Some(t) = throughput {
                config.recommend.weekly_throughput = Some(t);
            }
            if let Some(n) = top_paths {
                config.recommend.top_paths = n;
            }
            if let Some(c) = calibration {
                config.recommend.calibration_constant = c;
            }
            let engine = LeverageEngine::load(&graph, config).into_diagnostic()?;
            let recs = engine.recommend(&lever, &target, None).into_diagnostic()?;
            if recs.is_empty() {
                tracing::warn!(%lever, %target, "no path connects lever and target");
            }
            print_json(&recs)?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { path } => {
                AnalysisConfig::default().save(&path).into_diagnostic()?;
                println!("Wrote default configuration to {}", path.display());
            }
        },
    }

    Ok(())
}

fn parse_actionable(list: Option<&str>) -> Actionability {
    match list {
        Some(list) => Actionability::set(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        ),
        None => Actionability::Declared,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&content).into_diagnostic()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
