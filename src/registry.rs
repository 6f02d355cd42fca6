//! Capability registry: named analysis handlers dispatched by task.
//!
//! Each [`Capability`] pairs a predicate over [`AnalysisTask`] with a handler
//! that runs against a [`LeverageEngine`]. Dispatch picks the earliest
//! registered capability whose predicate matches, so registration order is
//! the tie-breaker. Lookups go through a `DashMap`, so a shared registry can
//! be extended from several threads.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;

use crate::engine::LeverageEngine;
use crate::error::{LevResult, RegistryError};
use crate::recommend::InterventionRecommendation;
use crate::score::{Actionability, LeverageScore};

/// A unit of analysis work.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisTask {
    /// Basic leverage against a KPI term.
    Basic { kpi: String, actionable: Actionability },
    /// Targeted leverage toward a target term.
    Targeted { target: String, actionable: Actionability },
    /// Experiment plans for a lever → target pair.
    Recommend { lever: String, target: String },
}

impl AnalysisTask {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Targeted { .. } => "targeted",
            Self::Recommend { .. } => "recommend",
        }
    }
}

impl fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { kpi, .. } => write!(f, "basic({kpi})"),
            Self::Targeted { target, .. } => write!(f, "targeted({target})"),
            Self::Recommend { lever, target } => write!(f, "recommend({lever} -> {target})"),
        }
    }
}

/// Output of a dispatched task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum AnalysisOutput {
    Scores(Vec<LeverageScore>),
    Recommendations(Vec<InterventionRecommendation>),
}

impl AnalysisOutput {
    pub fn len(&self) -> usize {
        match self {
            Self::Scores(s) => s.len(),
            Self::Recommendations(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Predicate = Arc<dyn Fn(&AnalysisTask) -> bool + Send + Sync>;
type Handler = Arc<dyn Fn(&LeverageEngine, &AnalysisTask) -> LevResult<AnalysisOutput> + Send + Sync>;

/// A named handler with the predicate selecting the tasks it accepts.
#[derive(Clone)]
pub struct Capability {
    pub name: String,
    seq: u64,
    predicate: Predicate,
    handler: Handler,
}

impl Capability {
    pub fn accepts(&self, task: &AnalysisTask) -> bool {
        (self.predicate)(task)
    }

    pub fn run(&self, engine: &LeverageEngine, task: &AnalysisTask) -> LevResult<AnalysisOutput> {
        (self.handler)(engine, task)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("seq", &self.seq)
            .finish()
    }
}

/// Registry mapping capability names to handlers.
pub struct CapabilityRegistry {
    capabilities: DashMap<String, Arc<Capability>>,
    next_seq: AtomicU64,
}

impl CapabilityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            capabilities: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Registry with `score_basic`, `score_targeted` and `recommend` installed.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let defaults: [(&str, Predicate, Handler); 3] = [
            (
                "score_basic",
                Arc::new(|t: &AnalysisTask| matches!(t, AnalysisTask::Basic { .. })),
                Arc::new(|engine: &LeverageEngine, task: &AnalysisTask| -> LevResult<AnalysisOutput> {
                    match task {
                        AnalysisTask::Basic { kpi, actionable } => {
                            Ok(AnalysisOutput::Scores(engine.score_basic(kpi, actionable)?))
                        }
                        other => Err(unhandled(other)),
                    }
                }),
            ),
            (
                "score_targeted",
                Arc::new(|t: &AnalysisTask| matches!(t, AnalysisTask::Targeted { .. })),
                Arc::new(|engine: &LeverageEngine, task: &AnalysisTask| -> LevResult<AnalysisOutput> {
                    match task {
                        AnalysisTask::Targeted { target, actionable } => Ok(AnalysisOutput::Scores(
                            engine.score_targeted(target, actionable, None)?,
                        )),
                        other => Err(unhandled(other)),
                    }
                }),
            ),
            (
                "recommend",
                Arc::new(|t: &AnalysisTask| matches!(t, AnalysisTask::Recommend { .. })),
                Arc::new(|engine: &LeverageEngine, task: &AnalysisTask| -> LevResult<AnalysisOutput> {
                    match task {
                        AnalysisTask::Recommend { lever, target } => Ok(
                            AnalysisOutput::Recommendations(engine.recommend(lever, target, None)?),
                        ),
                        other => Err(unhandled(other)),
                    }
                }),
            ),
        ];
        for (name, predicate, handler) in defaults {
            registry.insert(name, predicate, handler);
        }
        registry
    }

    /// Register a capability. Errors if the name is already taken.
    pub fn register<P, H>(&self, name: impl Into<String>, predicate: P, handler: H) -> LevResult<()>
    where
        P: Fn(&AnalysisTask) -> bool + Send + Sync + 'static,
        H: Fn(&LeverageEngine, &AnalysisTask) -> LevResult<AnalysisOutput> + Send + Sync + 'static,
    {
        let name = name.into();
        match self.capabilities.entry(name) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateCapability {
                name: entry.key().clone(),
            }
            .into()),
            Entry::Vacant(entry) => {
                let capability = self.capability(entry.key(), Arc::new(predicate), Arc::new(handler));
                entry.insert(capability);
                Ok(())
            }
        }
    }

    fn insert(&self, name: &str, predicate: Predicate, handler: Handler) {
        let capability = self.capability(name, predicate, handler);
        self.capabilities.insert(name.to_string(), capability);
    }

    fn capability(&self, name: &str, predicate: Predicate, handler: Handler) -> Arc<Capability> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(name, seq, "registered capability");
        Arc::new(Capability {
            name: name.to_string(),
            seq,
            predicate,
            handler,
        })
    }

    /// Remove a capability by name, returning it if present.
    pub fn unregister(&self, name: &str) -> Option<Arc<Capability>> {
        self.capabilities.remove(name).map(|(_, cap)| cap)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Capability>> {
        self.capabilities.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Earliest-registered capability accepting `task`.
    pub fn resolve(&self, task: &AnalysisTask) -> Option<Arc<Capability>> {
        self.capabilities
            .iter()
            .filter(|entry| entry.value().accepts(task))
            .min_by_key(|entry| entry.value().seq)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Run `task` on `engine` through the matching capability.
    pub fn dispatch(&self, engine: &LeverageEngine, task: &AnalysisTask) -> LevResult<AnalysisOutput> {
        let capability = self.resolve(task).ok_or_else(|| unhandled(task))?;
        tracing::debug!(capability = %capability.name, %task, "dispatching analysis task");
        capability.run(engine, task)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        let mut caps: Vec<_> = self
            .capabilities
            .iter()
            .map(|r| (r.value().seq, r.key().clone()))
            .collect();
        caps.sort();
        caps.into_iter().map(|(_, name)| name).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

fn unhandled(task: &AnalysisTask) -> crate::error::LeverageError {
    RegistryError::Unhandled {
        task: task.to_string(),
    }
    .into()
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("count", &self.len())
            .finish()
    }
}
