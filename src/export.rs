//! Export types for serializing a built graph.
//!
//! A [`GraphSnapshot`] preserves the node set (in node-index order), every
//! edge with its weight and relation tag, and the threshold the graph was
//! built with. It round-trips through JSON or bincode without loss beyond
//! floating-point representation, so a graph can be built once and reused
//! across analysis runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::GraphError;
use crate::graph::{EdgeData, GraphResult, SemanticGraph, Term};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Exported node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExport {
    pub id: String,
    pub embedding: Embedding,
    pub actionability: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cluster: Option<usize>,
}

/// Exported edge between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeExport {
    pub a: String,
    pub b: String,
    pub weight: f64,
    #[serde(default)]
    pub relation: Option<String>,
}

/// Lossless, serializable form of a [`SemanticGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    pub threshold: f64,
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
}

impl GraphSnapshot {
    /// Capture a graph.
    pub fn from_graph(graph: &SemanticGraph) -> Self {
        let nodes = graph
            .terms()
            .map(|t| NodeExport {
                id: t.id.clone(),
                embedding: t.embedding.clone(),
                actionability: t.actionability,
                category: t.category.clone(),
                cluster: t.cluster,
            })
            .collect();
        let edges = graph
            .edges()
            .into_iter()
            .map(|(a, b, data)| EdgeExport {
                a,
                b,
                weight: data.weight,
                relation: data.relation,
            })
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            threshold: graph.threshold(),
            nodes,
            edges,
        }
    }

    /// Rebuild the graph this snapshot describes.
    pub fn into_graph(self) -> GraphResult<SemanticGraph> {
        if self.version != SNAPSHOT_VERSION {
            return Err(GraphError::SnapshotFormat {
                message: format!(
                    "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                    self.version
                ),
            });
        }
        let nodes = self
            .nodes
            .into_iter()
            .map(|n| Term {
                id: n.id,
                embedding: n.embedding,
                actionability: n.actionability,
                category: n.category,
                cluster: n.cluster,
            })
            .collect();
        let edges = self
            .edges
            .into_iter()
            .map(|e| {
                (
                    e.a,
                    e.b,
                    EdgeData {
                        weight: e.weight,
                        relation: e.relation,
                    },
                )
            })
            .collect();
        SemanticGraph::from_parts(nodes, edges, self.threshold)
    }

    pub fn to_json(&self) -> GraphResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::SnapshotFormat {
            message: format!("failed to encode snapshot as JSON: {e}"),
        })
    }

    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(|e| GraphError::SnapshotFormat {
            message: format!("failed to decode JSON snapshot: {e}"),
        })
    }

    pub fn to_bincode(&self) -> GraphResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GraphError::SnapshotFormat {
            message: format!("failed to encode snapshot as bincode: {e}"),
        })
    }

    pub fn from_bincode(bytes: &[u8]) -> GraphResult<Self> {
        bincode::deserialize(bytes).map_err(|e| GraphError::SnapshotFormat {
            message: format!("failed to decode bincode snapshot: {e}"),
        })
    }

    /// Write to `path`; `.bin` selects bincode, anything else JSON.
    pub fn save(&self, path: &Path) -> GraphResult<()> {
        let bytes = if is_binary(path) {
            self.to_bincode()?
        } else {
            self.to_json()?.into_bytes()
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GraphError::SnapshotIo {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, bytes).map_err(|e| GraphError::SnapshotIo {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Read from `path`; `.bin` selects bincode, anything else JSON.
    pub fn load(path: &Path) -> GraphResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| GraphError::SnapshotIo {
            path: path.display().to_string(),
            source: e,
        })?;
        if is_binary(path) {
            Self::from_bincode(&bytes)
        } else {
            let text = String::from_utf8(bytes).map_err(|e| GraphError::SnapshotFormat {
                message: format!("snapshot is not valid UTF-8: {e}"),
            })?;
            Self::from_json(&text)
        }
    }
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

impl SemanticGraph {
    /// Serializable snapshot of this graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::from_graph(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TermInput, build_graph};

    fn sample() -> SemanticGraph {
        build_graph(
            vec![
                TermInput::new("A", [1.0, 0.0]).with_category("pricing"),
                TermInput::new("B", [0.9, 0.436]).with_actionability(0.3),
                TermInput::new("C", [0.0, 1.0]),
            ],
            0.5,
            None,
        )
        .unwrap()
    }

    #[test]
    fn json_round_trip_preserves_graph() {
        let g = sample();
        let json = g.snapshot().to_json().unwrap();
        let restored = GraphSnapshot::from_json(&json).unwrap().into_graph().unwrap();
        assert_eq!(restored.term_ids(), g.term_ids());
        assert_eq!(restored.edges(), g.edges());
        assert_eq!(restored.threshold(), g.threshold());
        assert_eq!(restored.term("B").unwrap().actionability, 0.3);
        assert_eq!(
            restored.term("A").unwrap().category.as_deref(),
            Some("pricing")
        );
    }

    #[test]
    fn bincode_round_trip_is_exact() {
        let g = sample();
        let bytes = g.snapshot().to_bincode().unwrap();
        let restored = GraphSnapshot::from_bincode(&bytes).unwrap();
        assert_eq!(restored, g.snapshot());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut snap = sample().snapshot();
        snap.version = 99;
        assert!(matches!(
            snap.into_graph().unwrap_err(),
            GraphError::SnapshotFormat { .. }
        ));
    }

    #[test]
    fn rejects_edge_to_missing_node() {
        let mut snap = sample().snapshot();
        snap.edges.push(EdgeExport {
            a: "A".into(),
            b: "Z".into(),
            weight: 0.5,
            relation: None,
        });
        assert!(matches!(
            snap.into_graph().unwrap_err(),
            GraphError::UnknownTerm { term } if term == "Z"
        ));
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let mut snap = sample().snapshot();
        snap.edges[0].weight = 1.5;
        assert!(snap.into_graph().is_err());
    }
}
