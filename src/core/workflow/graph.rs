#![allow(clippy::result_large_err)] // Graph loading APIs return EngineError to preserve structured validation context without boxing.

use crate::core::error::EngineError;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::str::FromStr;

fn default_config_value() -> Value {
    Value::Object(Map::new())
}

/// Node kind discriminator carried on the wire in SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Start,
    End,
    Human,
    System,
    Ai,
    Decision,
    Database,
    Mail,
    RestCall,
    Agent,
    Custom,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "START",
            NodeKind::End => "END",
            NodeKind::Human => "HUMAN",
            NodeKind::System => "SYSTEM",
            NodeKind::Ai => "AI",
            NodeKind::Decision => "DECISION",
            NodeKind::Database => "DATABASE",
            NodeKind::Mail => "MAIL",
            NodeKind::RestCall => "REST_CALL",
            NodeKind::Agent => "AGENT",
            NodeKind::Custom => "CUSTOM",
        }
    }

    /// True for kinds dispatched to a registered executor rather than
    /// handled structurally by the engine.
    pub fn is_automated(&self) -> bool {
        matches!(
            self,
            NodeKind::System
                | NodeKind::Ai
                | NodeKind::Database
                | NodeKind::Mail
                | NodeKind::RestCall
                | NodeKind::Agent
                | NodeKind::Custom
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known node kind.
#[derive(Debug, thiserror::Error)]
#[error("unknown node kind: {0}")]
pub struct ParseNodeKindError(String);

impl FromStr for NodeKind {
    type Err = ParseNodeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "START" => Ok(NodeKind::Start),
            "END" => Ok(NodeKind::End),
            "HUMAN" => Ok(NodeKind::Human),
            "SYSTEM" => Ok(NodeKind::System),
            "AI" => Ok(NodeKind::Ai),
            "DECISION" => Ok(NodeKind::Decision),
            "DATABASE" => Ok(NodeKind::Database),
            "MAIL" => Ok(NodeKind::Mail),
            "REST_CALL" => Ok(NodeKind::RestCall),
            "AGENT" => Ok(NodeKind::Agent),
            "CUSTOM" => Ok(NodeKind::Custom),
            other => Err(ParseNodeKindError(other.to_string())),
        }
    }
}

/// Canvas coordinates kept for round-tripping designer documents.
/// Layout only, never consulted during execution.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A single node in a workflow definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default = "default_config_value")]
    pub config: Value,
}

impl Node {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Directed edge between two nodes. `source_handle` distinguishes the
/// `true`/`false` outputs of DECISION nodes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(
        rename = "sourceHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,
}

/// A workflow definition: nodes plus directed edges.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowGraph {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowGraph {
    /// Load a workflow definition from a JSON or YAML file, dispatching
    /// on the file extension (`.yaml`/`.yml` parse as YAML, everything
    /// else as JSON).
    pub fn load_from_file(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|err| {
            EngineError::new(
                ErrorCategory::IoError,
                format!("failed to read {}: {}", path.display(), err),
            )
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
        .map_err(|err| err.with_context("file", path.display().to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text).map_err(|err| {
            EngineError::new(
                ErrorCategory::SerializationError,
                format!("failed to parse workflow JSON: {}", err),
            )
            .with_code("WF-VAL-010")
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        serde_yaml::from_str(text).map_err(|err| {
            EngineError::new(
                ErrorCategory::SerializationError,
                format!("failed to parse workflow YAML: {}", err),
            )
            .with_code("WF-VAL-010")
        })
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Outgoing edges of a node in declaration order.
    pub fn outgoing_edges(&self, id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|edge| edge.source == id).collect()
    }

    /// The unique START node, when the graph has exactly one.
    pub fn start_node(&self) -> Option<&Node> {
        let mut starts = self.nodes.iter().filter(|n| n.kind == NodeKind::Start);
        let first = starts.next()?;
        if starts.next().is_some() {
            return None;
        }
        Some(first)
    }

    pub fn end_nodes(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::End)
            .collect()
    }

    pub fn human_nodes(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Human)
            .collect()
    }

    /// SHA-256 of the canonical JSON encoding, recorded on executions
    /// so a persisted run can be traced back to the exact definition.
    pub fn definition_hash(&self) -> Result<String, EngineError> {
        let canonical = serde_json::to_vec(self).map_err(|err| {
            EngineError::new(
                ErrorCategory::SerializationError,
                format!("failed to serialize workflow for hashing: {}", err),
            )
        })?;
        Ok(compute_sha256_hex(&canonical))
    }
}

pub fn compute_sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
