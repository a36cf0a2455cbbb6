#![allow(clippy::result_large_err)] // Engine operations return EngineError to preserve structured diagnostic context; boxing would discard run-time state.

use crate::core::error::EngineError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::execution::{ExecutionStatus, NodeStatus, WorkflowExecution};
use crate::core::workflow::executor::ExecutorRegistry;
use crate::core::workflow::graph::{Node, NodeKind, WorkflowGraph};
use crate::core::workflow::human::HumanTaskConfig;
use crate::core::workflow::notify::{NotificationSink, TracingNotifier};
use crate::core::workflow::rules::{DecisionSpec, ExpressionRuleEvaluator, RuleEvaluator};
use crate::core::workflow::store::ExecutionStore;
use crate::core::workflow::validator;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Builder wiring collaborators into an [`Engine`].
pub struct EngineBuilder {
    executors: ExecutorRegistry,
    rules: Arc<dyn RuleEvaluator>,
    notifier: Arc<dyn NotificationSink>,
    store: Option<Arc<dyn ExecutionStore>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            executors: ExecutorRegistry::new(),
            rules: Arc::new(ExpressionRuleEvaluator::new()),
            notifier: Arc::new(TracingNotifier::new()),
            store: None,
        }
    }

    pub fn executors(mut self, registry: ExecutorRegistry) -> Self {
        self.executors = registry;
        self
    }

    pub fn rule_evaluator(mut self, rules: Arc<dyn RuleEvaluator>) -> Self {
        self.rules = rules;
        self
    }

    pub fn notification_sink(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Persist the execution through this store after every node
    /// transition. Without a store the engine never touches disk.
    pub fn store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            executors: self.executors,
            rules: self.rules,
            notifier: self.notifier,
            store: self.store,
        }
    }
}

/// The execution state machine. Host-owned; every operation takes the
/// execution by exclusive reference, which is what guarantees
/// single-threaded progress per execution.
///
/// Traversal policy: a non-DECISION node with several outgoing edges
/// follows the first edge in declaration order. Parallel fan-out is not
/// part of the model.
pub struct Engine {
    executors: ExecutorRegistry,
    rules: Arc<dyn RuleEvaluator>,
    notifier: Arc<dyn NotificationSink>,
    store: Option<Arc<dyn ExecutionStore>>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Validate the graph, freeze a snapshot, and drive a new execution
    /// forward until it completes, fails, or suspends on a HUMAN node.
    ///
    /// An invalid graph is rejected before any state is created.
    pub async fn start(
        &self,
        graph: &WorkflowGraph,
        input: Value,
    ) -> Result<WorkflowExecution, EngineError> {
        let result = validator::validate(graph);
        if !result.is_valid {
            return Err(EngineError::new(
                ErrorCategory::ValidationError,
                format!("workflow validation failed: {}", result.errors.join("; ")),
            )
            .with_code("WF-VAL-001")
            .with_context("workflow_id", graph.id.clone()));
        }

        let definition_hash = graph.definition_hash()?;
        let mut execution = WorkflowExecution::new(graph.clone(), definition_hash, input);
        tracing::info!(
            execution_id = %execution.id,
            workflow_id = %execution.workflow_id,
            "starting workflow execution"
        );

        let start_id = graph
            .start_node()
            .map(|node| node.id.clone())
            .ok_or_else(|| {
                EngineError::new(
                    ErrorCategory::InternalError,
                    "validated workflow has no START node",
                )
            })?;
        execution.status = ExecutionStatus::Running;
        execution.current_node_id = Some(start_id);
        self.persist(&execution)?;

        self.drive(&mut execution).await?;
        Ok(execution)
    }

    /// Complete a WAITING human task with the responder's payload and
    /// resume traversal at the successor.
    ///
    /// Any mismatch between the submission and the execution's state is
    /// a conflict that leaves the execution untouched, so a second
    /// submit for the same task is rejected rather than processed twice.
    pub async fn submit_human_task(
        &self,
        execution: &mut WorkflowExecution,
        node_id: &str,
        data: Value,
    ) -> Result<(), EngineError> {
        self.check_waiting_on(execution, node_id)?;

        tracing::info!(
            execution_id = %execution.id,
            node_id = %node_id,
            "human task submitted"
        );
        execution
            .node_results
            .insert(node_id.to_string(), data.clone());
        if data.is_object() {
            apply_patch(&mut execution.context, &data);
        }
        execution.set_node_status(node_id, NodeStatus::Completed);
        execution.waiting_since = None;
        execution.log_event(
            "human task completed",
            Some(node_id),
            Some(NodeStatus::Completed),
            None,
        );

        match self.next_target(execution, node_id) {
            Some(next) => {
                execution.current_node_id = Some(next);
                self.persist(execution)?;
                self.drive(execution).await
            }
            None => {
                self.fail(
                    execution,
                    Some(node_id),
                    &EngineError::new(
                        ErrorCategory::ExecutorError,
                        format!("node {} has no outgoing edge", node_id),
                    )
                    .with_code("WF-EXEC-003"),
                )?;
                Ok(())
            }
        }
    }

    /// Cancel an execution. Terminal executions are left untouched; the
    /// call is an idempotent no-op for them.
    pub fn cancel(&self, execution: &mut WorkflowExecution) -> Result<(), EngineError> {
        if execution.status.is_terminal() {
            return Ok(());
        }
        tracing::info!(execution_id = %execution.id, "execution cancelled");
        execution.status = ExecutionStatus::Cancelled;
        execution.completed_at = Some(Utc::now());
        execution.log_event("execution cancelled", None, None, None);
        self.persist(execution)
    }

    /// Suspend a RUNNING execution without touching node state.
    pub fn pause(&self, execution: &mut WorkflowExecution) -> Result<(), EngineError> {
        if execution.status != ExecutionStatus::Running {
            return Err(EngineError::new(
                ErrorCategory::StateConflictError,
                format!("cannot pause execution in status {}", execution.status),
            )
            .with_code("WF-STATE-004"));
        }
        tracing::info!(execution_id = %execution.id, "execution paused");
        execution.status = ExecutionStatus::Paused;
        execution.log_event("execution paused", None, None, None);
        self.persist(execution)
    }

    /// Resume a PAUSED execution. If the current node is WAITING the
    /// execution stays suspended on the human task; otherwise traversal
    /// re-enters activation at the current node as if freshly activated.
    /// That re-entry is the recovery path for executions reloaded from
    /// the store after a crash mid-step.
    pub async fn resume(&self, execution: &mut WorkflowExecution) -> Result<(), EngineError> {
        if execution.status != ExecutionStatus::Paused {
            return Err(EngineError::new(
                ErrorCategory::StateConflictError,
                format!("cannot resume execution in status {}", execution.status),
            )
            .with_code("WF-STATE-005"));
        }
        tracing::info!(execution_id = %execution.id, "execution resumed");
        execution.status = ExecutionStatus::Running;
        execution.log_event("execution resumed", None, None, None);
        self.persist(execution)?;

        let waiting = execution
            .current_node_id
            .as_deref()
            .map(|id| execution.node_status(id) == NodeStatus::Waiting)
            .unwrap_or(false);
        if waiting {
            return Ok(());
        }
        self.drive(execution).await
    }

    /// Fail a WAITING human task whose configured deadline has passed.
    ///
    /// The engine runs no clock of its own; hosts sweep waiting
    /// executions and call this with the current time. Before the
    /// deadline, or without a configured timeout, the call is a
    /// conflict and the execution is untouched.
    pub fn expire_human_task(
        &self,
        execution: &mut WorkflowExecution,
        node_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.check_waiting_on(execution, node_id)?;

        let node = self.snapshot_node(execution, node_id)?;
        let config = HumanTaskConfig::parse(&node.config)?;
        let waiting_since = execution.waiting_since.unwrap_or(execution.started_at);
        let deadline = config.deadline(waiting_since).ok_or_else(|| {
            EngineError::new(
                ErrorCategory::StateConflictError,
                format!("human task {} has no configured timeout", node_id),
            )
            .with_code("WF-HUMAN-002")
        })?;
        if now < deadline {
            return Err(EngineError::new(
                ErrorCategory::StateConflictError,
                format!("human task {} deadline has not passed", node_id),
            )
            .with_code("WF-HUMAN-003")
            .with_context("deadline", deadline.to_rfc3339()));
        }

        tracing::warn!(
            execution_id = %execution.id,
            node_id = %node_id,
            "human task timed out"
        );
        execution.log_event(
            "human task expired",
            Some(node_id),
            Some(NodeStatus::Error),
            Some(json!({ "deadline": deadline.to_rfc3339() })),
        );
        self.fail(
            execution,
            Some(node_id),
            &EngineError::new(
                ErrorCategory::TimeoutError,
                format!("human task {} timed out", node_id),
            )
            .with_code("WF-HUMAN-004"),
        )
    }

    /// Drive the execution forward until it reaches END, fails, or
    /// suspends on a HUMAN node.
    async fn drive(&self, execution: &mut WorkflowExecution) -> Result<(), EngineError> {
        while execution.status == ExecutionStatus::Running {
            let node_id = match execution.current_node_id.clone() {
                Some(id) => id,
                None => break,
            };
            let node = match self.snapshot_node(execution, &node_id) {
                Ok(node) => node,
                Err(err) => {
                    self.fail(execution, Some(&node_id), &err)?;
                    break;
                }
            };

            tracing::debug!(
                execution_id = %execution.id,
                node_id = %node.id,
                kind = %node.kind,
                "activating node"
            );

            match node.kind {
                NodeKind::Start => self.run_passthrough(execution, &node)?,
                NodeKind::End => {
                    self.complete_at_end(execution, &node)?;
                    break;
                }
                NodeKind::Human => {
                    self.suspend_on_human(execution, &node)?;
                    break;
                }
                NodeKind::Decision => {
                    if !self.run_decision(execution, &node)? {
                        break;
                    }
                }
                kind if kind.is_automated() => {
                    if !self.run_automated(execution, &node).await? {
                        break;
                    }
                }
                kind => {
                    let err = EngineError::new(
                        ErrorCategory::InternalError,
                        format!("unhandled node kind {}", kind),
                    );
                    self.fail(execution, Some(&node.id), &err)?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// START carries no work; it completes immediately and hands off.
    fn run_passthrough(
        &self,
        execution: &mut WorkflowExecution,
        node: &Node,
    ) -> Result<(), EngineError> {
        execution.set_node_status(&node.id, NodeStatus::Running);
        execution.log_event("node started", Some(&node.id), Some(NodeStatus::Running), None);
        execution.set_node_status(&node.id, NodeStatus::Completed);
        execution.log_event(
            "node completed",
            Some(&node.id),
            Some(NodeStatus::Completed),
            None,
        );
        self.advance(execution, node)
    }

    fn complete_at_end(
        &self,
        execution: &mut WorkflowExecution,
        node: &Node,
    ) -> Result<(), EngineError> {
        execution.set_node_status(&node.id, NodeStatus::Running);
        execution.log_event("node started", Some(&node.id), Some(NodeStatus::Running), None);
        execution.set_node_status(&node.id, NodeStatus::Completed);
        execution.log_event(
            "node completed",
            Some(&node.id),
            Some(NodeStatus::Completed),
            None,
        );
        execution.status = ExecutionStatus::Completed;
        execution.completed_at = Some(Utc::now());
        execution.current_node_id = None;
        execution.log_event("execution completed", None, None, None);
        tracing::info!(execution_id = %execution.id, "execution completed");
        self.persist(execution)
    }

    fn suspend_on_human(
        &self,
        execution: &mut WorkflowExecution,
        node: &Node,
    ) -> Result<(), EngineError> {
        if let Err(err) = HumanTaskConfig::parse(&node.config) {
            self.fail(execution, Some(&node.id), &err)?;
            return Ok(());
        }
        execution.set_node_status(&node.id, NodeStatus::Waiting);
        execution.waiting_since = Some(Utc::now());
        execution.log_event(
            "human task waiting",
            Some(&node.id),
            Some(NodeStatus::Waiting),
            None,
        );
        self.notifier.human_task_waiting(execution, node);
        self.persist(execution)
    }

    /// Returns true when traversal should keep going.
    async fn run_automated(
        &self,
        execution: &mut WorkflowExecution,
        node: &Node,
    ) -> Result<bool, EngineError> {
        execution.set_node_status(&node.id, NodeStatus::Running);
        execution.log_event("node started", Some(&node.id), Some(NodeStatus::Running), None);
        self.persist(execution)?;

        let executor = match self.executors.get(node.kind) {
            Some(executor) => executor,
            None => {
                let err = EngineError::new(
                    ErrorCategory::ExecutorError,
                    format!("no executor registered for kind {}", node.kind),
                )
                .with_code("WF-EXEC-001");
                self.fail(execution, Some(&node.id), &err)?;
                return Ok(false);
            }
        };

        let input = execution.context.clone();
        let result = executor.execute(node, &input).await;

        // A host may have cancelled through a reloaded handle while the
        // executor ran; a stale result must not advance the run.
        if execution.status != ExecutionStatus::Running {
            return Ok(false);
        }

        match result {
            Ok(output) => {
                execution
                    .node_results
                    .insert(node.id.clone(), output.clone());
                if output.is_object() {
                    apply_patch(&mut execution.context, &output);
                }
                execution.set_node_status(&node.id, NodeStatus::Completed);
                execution.log_event(
                    "node completed",
                    Some(&node.id),
                    Some(NodeStatus::Completed),
                    None,
                );
                self.advance(execution, node)?;
                Ok(execution.status == ExecutionStatus::Running)
            }
            Err(err) => {
                self.fail(execution, Some(&node.id), &err)?;
                Ok(false)
            }
        }
    }

    /// Returns true when traversal should keep going.
    fn run_decision(
        &self,
        execution: &mut WorkflowExecution,
        node: &Node,
    ) -> Result<bool, EngineError> {
        execution.set_node_status(&node.id, NodeStatus::Running);
        execution.log_event("node started", Some(&node.id), Some(NodeStatus::Running), None);

        let spec = match DecisionSpec::parse(&node.config) {
            Ok(spec) => spec,
            Err(err) => {
                self.fail(execution, Some(&node.id), &err)?;
                return Ok(false);
            }
        };

        let results = results_value(execution);
        let outcome = match self.rules.evaluate(&spec, &execution.context, &results) {
            Ok(flag) => flag,
            Err(err) => {
                self.fail(execution, Some(&node.id), &err)?;
                return Ok(false);
            }
        };

        execution
            .node_results
            .insert(node.id.clone(), Value::Bool(outcome));
        execution.set_node_status(&node.id, NodeStatus::Completed);
        execution.log_event(
            "node completed",
            Some(&node.id),
            Some(NodeStatus::Completed),
            Some(json!({ "result": outcome })),
        );

        let taken_handle = if outcome { "true" } else { "false" };
        let untaken_handle = if outcome { "false" } else { "true" };
        let taken = self.edge_target(execution, &node.id, taken_handle);
        let untaken = self.edge_target(execution, &node.id, untaken_handle);

        let taken = match taken {
            Some(target) => target,
            None => {
                let err = EngineError::new(
                    ErrorCategory::ExecutorError,
                    format!(
                        "decision node {} has no outgoing edge for handle {}",
                        node.id, taken_handle
                    ),
                )
                .with_code("WF-EXEC-004");
                self.fail(execution, Some(&node.id), &err)?;
                return Ok(false);
            }
        };

        // Only the immediate untaken target is skipped, and only while
        // untouched; a node reachable from both branches keeps its state.
        if let Some(skipped) = untaken {
            if execution.node_status(&skipped) == NodeStatus::Idle {
                execution.set_node_status(&skipped, NodeStatus::Skipped);
                execution.log_event(
                    "branch skipped",
                    Some(&skipped),
                    Some(NodeStatus::Skipped),
                    None,
                );
            }
        }

        execution.current_node_id = Some(taken);
        self.persist(execution)?;
        Ok(true)
    }

    /// Move `current_node_id` along the first outgoing edge, or fail
    /// the execution when a non-END node dead-ends.
    fn advance(&self, execution: &mut WorkflowExecution, node: &Node) -> Result<(), EngineError> {
        match self.next_target(execution, &node.id) {
            Some(next) => {
                execution.current_node_id = Some(next);
                self.persist(execution)
            }
            None => self.fail(
                execution,
                Some(&node.id),
                &EngineError::new(
                    ErrorCategory::ExecutorError,
                    format!("node {} has no outgoing edge", node.id),
                )
                .with_code("WF-EXEC-003"),
            ),
        }
    }

    fn next_target(&self, execution: &WorkflowExecution, node_id: &str) -> Option<String> {
        execution
            .snapshot
            .outgoing_edges(node_id)
            .first()
            .map(|edge| edge.target.clone())
    }

    fn edge_target(
        &self,
        execution: &WorkflowExecution,
        node_id: &str,
        handle: &str,
    ) -> Option<String> {
        execution
            .snapshot
            .outgoing_edges(node_id)
            .iter()
            .find(|edge| edge.source_handle.as_deref() == Some(handle))
            .map(|edge| edge.target.clone())
    }

    fn snapshot_node(
        &self,
        execution: &WorkflowExecution,
        node_id: &str,
    ) -> Result<Node, EngineError> {
        execution.snapshot.node(node_id).cloned().ok_or_else(|| {
            EngineError::new(
                ErrorCategory::NotFoundError,
                format!("node {} not found in execution snapshot", node_id),
            )
            .with_code("WF-EXEC-002")
        })
    }

    /// Shared precondition for submit and expiry: the execution must be
    /// RUNNING and pinned on `node_id`, and the node must be WAITING.
    fn check_waiting_on(
        &self,
        execution: &WorkflowExecution,
        node_id: &str,
    ) -> Result<(), EngineError> {
        if execution.status != ExecutionStatus::Running {
            return Err(EngineError::new(
                ErrorCategory::StateConflictError,
                format!("execution is not running (status {})", execution.status),
            )
            .with_code("WF-STATE-001"));
        }
        if execution.current_node_id.as_deref() != Some(node_id) {
            return Err(EngineError::new(
                ErrorCategory::StateConflictError,
                format!("execution is not positioned on node {}", node_id),
            )
            .with_code("WF-STATE-002")
            .with_context(
                "current_node_id",
                execution.current_node_id.clone().unwrap_or_default(),
            ));
        }
        if execution.node_status(node_id) != NodeStatus::Waiting {
            return Err(EngineError::new(
                ErrorCategory::StateConflictError,
                format!(
                    "node {} is not waiting (status {})",
                    node_id,
                    execution.node_status(node_id)
                ),
            )
            .with_code("WF-STATE-003"));
        }
        Ok(())
    }

    /// Mark a node ERROR (when attributable), fail the execution, and
    /// retain the failure summary for diagnostics. The failing node
    /// stays pinned in `current_node_id` for post-mortems.
    fn fail(
        &self,
        execution: &mut WorkflowExecution,
        node_id: Option<&str>,
        err: &EngineError,
    ) -> Result<(), EngineError> {
        if let Some(id) = node_id {
            execution.set_node_status(id, NodeStatus::Error);
            execution.log_event(
                "node failed",
                Some(id),
                Some(NodeStatus::Error),
                Some(json!({ "code": err.code, "message": err.message })),
            );
        }
        execution.status = ExecutionStatus::Failed;
        execution.completed_at = Some(Utc::now());
        execution.record_failure(node_id, &err.code, &err.message);
        execution.log_event("execution failed", None, None, None);
        tracing::error!(
            execution_id = %execution.id,
            code = %err.code,
            "execution failed: {}",
            err.message
        );
        self.persist(execution)
    }

    fn persist(&self, execution: &WorkflowExecution) -> Result<(), EngineError> {
        if let Some(store) = &self.store {
            store.save(execution)?;
        }
        Ok(())
    }
}

/// Accumulated node results exposed to rule evaluation, keyed by node id.
fn results_value(execution: &WorkflowExecution) -> Value {
    let mut map = Map::new();
    for (node_id, result) in &execution.node_results {
        map.insert(node_id.clone(), result.clone());
    }
    Value::Object(map)
}

/// Recursive merge: object fields merge key by key, everything else
/// replaces.
fn apply_patch(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match target_map.get_mut(key) {
                    Some(existing) => apply_patch(existing, value),
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target_value, patch_value) => {
            *target_value = patch_value.clone();
        }
    }
}
