use crate::core::workflow::graph::WorkflowGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Version embedded in persisted execution files.
pub const EXECUTION_FORMAT_VERSION: &str = "1";

fn default_object_value() -> Value {
    Value::Object(Map::new())
}

/// Lifecycle status of a workflow execution.
///
/// Transitions: PENDING -> RUNNING -> {PAUSED, COMPLETED, FAILED,
/// CANCELLED}; PAUSED -> {RUNNING, CANCELLED}. COMPLETED, FAILED, and
/// CANCELLED are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "PENDING",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Paused => "PAUSED",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-node progress marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Waiting,
    Completed,
    Error,
    Skipped,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Idle => "IDLE",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Waiting => "WAITING",
            NodeStatus::Completed => "COMPLETED",
            NodeStatus::Error => "ERROR",
            NodeStatus::Skipped => "SKIPPED",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line in the append-only execution log. Execution-level entries
/// carry no node id or status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Failing node and error retained on a FAILED execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSummary {
    pub node_id: Option<String>,
    pub code: String,
    pub message: String,
}

/// A single run of a workflow definition.
///
/// The definition is frozen into `snapshot` when the execution is
/// created; later edits to the source workflow never affect a run in
/// flight. `definition_hash` ties the snapshot back to the exact
/// definition bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub format_version: String,
    pub id: Uuid,
    pub workflow_id: String,
    pub workflow_name: String,
    pub definition_hash: String,
    pub snapshot: WorkflowGraph,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_node_id: Option<String>,
    pub waiting_since: Option<DateTime<Utc>>,
    #[serde(default = "default_object_value")]
    pub input: Value,
    #[serde(default = "default_object_value")]
    pub context: Value,
    #[serde(default)]
    pub node_statuses: HashMap<String, NodeStatus>,
    #[serde(default)]
    pub node_results: HashMap<String, Value>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,
}

impl WorkflowExecution {
    /// Create a PENDING execution over a frozen snapshot of the graph.
    pub fn new(snapshot: WorkflowGraph, definition_hash: String, input: Value) -> Self {
        let context = if input.is_object() {
            input.clone()
        } else {
            default_object_value()
        };
        let mut execution = WorkflowExecution {
            format_version: EXECUTION_FORMAT_VERSION.to_string(),
            id: Uuid::new_v4(),
            workflow_id: snapshot.id.clone(),
            workflow_name: snapshot.name.clone(),
            definition_hash,
            snapshot,
            status: ExecutionStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            current_node_id: None,
            waiting_since: None,
            input,
            context,
            node_statuses: HashMap::new(),
            node_results: HashMap::new(),
            log: Vec::new(),
            failure: None,
        };
        execution.log_event("execution created", None, None, None);
        execution
    }

    /// Status of a node. Unknown ids read as IDLE, never an error.
    pub fn node_status(&self, node_id: &str) -> NodeStatus {
        self.node_statuses.get(node_id).copied().unwrap_or_default()
    }

    pub(crate) fn set_node_status(&mut self, node_id: &str, status: NodeStatus) {
        self.node_statuses.insert(node_id.to_string(), status);
    }

    /// Append a log entry stamped with the current time.
    pub(crate) fn log_event(
        &mut self,
        message: &str,
        node_id: Option<&str>,
        status: Option<NodeStatus>,
        data: Option<Value>,
    ) {
        self.log.push(LogEntry {
            timestamp: Utc::now(),
            node_id: node_id.map(str::to_string),
            status,
            message: message.to_string(),
            data,
        });
    }

    pub(crate) fn record_failure(&mut self, node_id: Option<&str>, code: &str, message: &str) {
        self.failure = Some(FailureSummary {
            node_id: node_id.map(str::to_string),
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    /// Log entries attributed to a given node.
    pub fn log_for_node(&self, node_id: &str) -> Vec<&LogEntry> {
        self.log
            .iter()
            .filter(|entry| entry.node_id.as_deref() == Some(node_id))
            .collect()
    }

    /// Log entries carrying a given node status.
    pub fn log_with_status(&self, status: NodeStatus) -> Vec<&LogEntry> {
        self.log
            .iter()
            .filter(|entry| entry.status == Some(status))
            .collect()
    }
}
