#![allow(clippy::result_large_err)] // Store module returns EngineError to preserve structured diagnostic context; boxing would discard run-time state.

use crate::core::error::EngineError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::execution::{ExecutionStatus, WorkflowExecution};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Durability capability for executions. The engine calls `save` after
/// each node transition when a store is wired in; retention and backend
/// choice belong to the host.
pub trait ExecutionStore: Send + Sync + 'static {
    fn save(&self, execution: &WorkflowExecution) -> Result<(), EngineError>;
    fn load(&self, execution_id: &Uuid) -> Result<WorkflowExecution, EngineError>;
}

/// Paths under `<state_dir>/executions/<execution_id>`.
pub struct ExecutionStatePaths {
    pub execution_dir: PathBuf,
    pub execution_file: PathBuf,
}

impl ExecutionStatePaths {
    pub fn new(state_dir: &Path, execution_id: &Uuid) -> Self {
        let execution_dir = state_dir.join("executions").join(execution_id.to_string());
        let execution_file = execution_dir.join("execution.json");
        Self {
            execution_dir,
            execution_file,
        }
    }

    pub fn executions_root(state_dir: &Path) -> PathBuf {
        state_dir.join("executions")
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            EngineError::new(
                ErrorCategory::IoError,
                format!("failed to create directory {}: {}", parent.display(), err),
            )
            .with_code("WF-PERSIST-001")
        })?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data).map_err(|err| {
        EngineError::new(
            ErrorCategory::IoError,
            format!("failed to write {}: {}", tmp_path.display(), err),
        )
        .with_code("WF-PERSIST-001")
    })?;
    fs::rename(&tmp_path, path).map_err(|err| {
        EngineError::new(
            ErrorCategory::IoError,
            format!(
                "failed to rename {} -> {}: {}",
                tmp_path.display(),
                path.display(),
                err
            ),
        )
        .with_code("WF-PERSIST-001")
    })?;
    Ok(())
}

/// Line item returned by [`FileExecutionStore::list`].
pub struct ExecutionSummary {
    pub execution_id: Uuid,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
}

/// File-backed store writing pretty JSON with a tmp-then-rename cycle,
/// so a crash mid-write never leaves a torn execution file.
pub struct FileExecutionStore {
    state_dir: PathBuf,
}

impl FileExecutionStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Summaries for every persisted execution, newest first.
    /// Unparseable directories are skipped rather than failing the scan.
    pub fn list(&self) -> Result<Vec<ExecutionSummary>, EngineError> {
        let mut entries = Vec::new();
        let root = ExecutionStatePaths::executions_root(&self.state_dir);
        if !root.exists() {
            return Ok(entries);
        }
        for entry in fs::read_dir(&root)
            .map_err(|err| {
                EngineError::new(
                    ErrorCategory::IoError,
                    format!("failed to list executions state: {}", err),
                )
                .with_code("WF-PERSIST-001")
            })?
            .flatten()
        {
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            if let Ok(uuid) = Uuid::parse_str(&entry.file_name().to_string_lossy()) {
                if let Ok(execution) = self.load(&uuid) {
                    entries.push(ExecutionSummary {
                        execution_id: execution.id,
                        workflow_id: execution.workflow_id,
                        status: execution.status,
                        started_at: execution.started_at,
                    });
                }
            }
        }
        entries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(entries)
    }
}

impl ExecutionStore for FileExecutionStore {
    fn save(&self, execution: &WorkflowExecution) -> Result<(), EngineError> {
        let paths = ExecutionStatePaths::new(&self.state_dir, &execution.id);
        let content = serde_json::to_vec_pretty(execution).map_err(|err| {
            EngineError::new(
                ErrorCategory::SerializationError,
                format!("failed to serialize execution.json: {}", err),
            )
            .with_code("WF-PERSIST-002")
        })?;
        atomic_write(&paths.execution_file, &content)
    }

    fn load(&self, execution_id: &Uuid) -> Result<WorkflowExecution, EngineError> {
        let paths = ExecutionStatePaths::new(&self.state_dir, execution_id);
        let bytes = fs::read(&paths.execution_file).map_err(|err| {
            EngineError::new(
                ErrorCategory::IoError,
                format!("failed to read {}: {}", paths.execution_file.display(), err),
            )
            .with_code("WF-PERSIST-001")
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            EngineError::new(
                ErrorCategory::SerializationError,
                format!("failed to deserialize execution.json: {}", err),
            )
            .with_code("WF-PERSIST-002")
        })
    }
}
