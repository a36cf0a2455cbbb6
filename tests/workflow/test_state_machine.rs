use serde_json::json;
use weft::core::workflow::{
    EchoExecutor, Engine, ExecutionStatus, ExecutorRegistry, NodeStatus, WorkflowExecution,
    WorkflowGraph,
};

fn linear_graph() -> WorkflowGraph {
    WorkflowGraph::from_json_str(
        r#"{
            "id": "wf-linear", "name": "linear",
            "nodes": [
                {"id": "start", "type": "START"},
                {"id": "work", "type": "SYSTEM", "config": {"output": {"done": true}}},
                {"id": "end", "type": "END"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "work"},
                {"id": "e2", "source": "work", "target": "end"}
            ]
        }"#,
    )
    .unwrap()
}

fn human_graph() -> WorkflowGraph {
    WorkflowGraph::from_json_str(
        r#"{
            "id": "wf-human", "name": "review",
            "nodes": [
                {"id": "start", "type": "START"},
                {"id": "review", "type": "HUMAN", "config": {}},
                {"id": "end", "type": "END"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "review"},
                {"id": "e2", "source": "review", "target": "end"}
            ]
        }"#,
    )
    .unwrap()
}

fn echo_engine() -> Engine {
    Engine::builder().executors(EchoExecutor::registry()).build()
}

#[tokio::test]
async fn linear_run_completes_with_deterministic_log() {
    let engine = echo_engine();
    let execution = engine.start(&linear_graph(), json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(execution.completed_at.is_some());
    assert!(execution.current_node_id.is_none());
    for node in ["start", "work", "end"] {
        assert_eq!(execution.node_status(node), NodeStatus::Completed);
    }

    let messages: Vec<&str> = execution
        .log
        .iter()
        .map(|entry| entry.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "execution created",
            "node started",
            "node completed",
            "node started",
            "node completed",
            "node started",
            "node completed",
            "execution completed",
        ]
    );
}

#[tokio::test]
async fn object_input_seeds_context_and_outputs_merge() {
    let engine = echo_engine();
    let execution = engine
        .start(&linear_graph(), json!({"amount": 250}))
        .await
        .unwrap();

    assert_eq!(execution.input, json!({"amount": 250}));
    assert_eq!(execution.context, json!({"amount": 250, "done": true}));
    assert_eq!(execution.node_results["work"], json!({"done": true}));
}

#[tokio::test]
async fn non_object_input_leaves_context_empty() {
    let engine = echo_engine();
    let execution = engine.start(&linear_graph(), json!(42)).await.unwrap();
    assert_eq!(execution.input, json!(42));
    assert_eq!(execution.context, json!({"done": true}));
}

#[tokio::test]
async fn invalid_graph_is_rejected_before_any_state_exists() {
    let graph = WorkflowGraph::from_json_str(
        r#"{"id": "wf", "name": "bad", "nodes": [{"id": "a", "type": "SYSTEM"}], "edges": []}"#,
    )
    .unwrap();
    let engine = echo_engine();
    let err = engine.start(&graph, json!({})).await.unwrap_err();
    assert_eq!(err.code, "WF-VAL-001");
    assert!(err.message.contains("workflow validation failed"));
}

#[tokio::test]
async fn missing_executor_fails_the_execution() {
    let engine = Engine::builder().executors(ExecutorRegistry::new()).build();
    let execution = engine.start(&linear_graph(), json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.node_status("work"), NodeStatus::Error);
    assert_eq!(execution.current_node_id.as_deref(), Some("work"));
    let failure = execution.failure.as_ref().expect("failure summary");
    assert_eq!(failure.code, "WF-EXEC-001");
    assert_eq!(failure.node_id.as_deref(), Some("work"));
    assert_eq!(execution.log.last().unwrap().message, "execution failed");
}

#[tokio::test]
async fn dead_end_node_fails_and_first_edge_wins() {
    // START has two outgoing edges; the first in declaration order leads
    // to a SYSTEM node with no exit, the second to END (keeping the
    // graph valid). Traversal must take the first edge and then fail.
    let graph = WorkflowGraph::from_json_str(
        r#"{
            "id": "wf", "name": "dead-end",
            "nodes": [
                {"id": "start", "type": "START"},
                {"id": "stuck", "type": "SYSTEM"},
                {"id": "end", "type": "END"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "stuck"},
                {"id": "e2", "source": "start", "target": "end"}
            ]
        }"#,
    )
    .unwrap();
    let engine = echo_engine();
    let execution = engine.start(&graph, json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.failure.as_ref().unwrap().code, "WF-EXEC-003");
    assert_eq!(execution.node_status("stuck"), NodeStatus::Error);
    assert_eq!(execution.node_status("end"), NodeStatus::Idle);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let engine = echo_engine();
    let mut execution = engine.start(&human_graph(), json!({})).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Running);

    engine.cancel(&mut execution).unwrap();
    assert_eq!(execution.status, ExecutionStatus::Cancelled);
    assert!(execution.completed_at.is_some());
    assert_eq!(execution.log.last().unwrap().message, "execution cancelled");

    let log_len = execution.log.len();
    engine.cancel(&mut execution).unwrap();
    assert_eq!(execution.status, ExecutionStatus::Cancelled);
    assert_eq!(execution.log.len(), log_len);
}

#[tokio::test]
async fn cancel_after_completion_is_a_no_op() {
    let engine = echo_engine();
    let mut execution = engine.start(&linear_graph(), json!({})).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);

    let before = serde_json::to_value(&execution).unwrap();
    engine.cancel(&mut execution).unwrap();
    assert_eq!(serde_json::to_value(&execution).unwrap(), before);
}

#[tokio::test]
async fn pause_and_resume_preserve_a_waiting_task() {
    let engine = echo_engine();
    let mut execution = engine.start(&human_graph(), json!({})).await.unwrap();
    assert_eq!(execution.node_status("review"), NodeStatus::Waiting);

    engine.pause(&mut execution).unwrap();
    assert_eq!(execution.status, ExecutionStatus::Paused);

    // Submissions are conflicts while paused.
    let err = engine
        .submit_human_task(&mut execution, "review", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, "WF-STATE-001");

    engine.resume(&mut execution).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Running);
    assert_eq!(execution.node_status("review"), NodeStatus::Waiting);

    engine
        .submit_human_task(&mut execution, "review", json!({"approved": true}))
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn pause_requires_running_and_resume_requires_paused() {
    let engine = echo_engine();
    let mut completed = engine.start(&linear_graph(), json!({})).await.unwrap();
    assert_eq!(
        engine.pause(&mut completed).unwrap_err().code,
        "WF-STATE-004"
    );

    let mut waiting = engine.start(&human_graph(), json!({})).await.unwrap();
    let err = engine.resume(&mut waiting).await.unwrap_err();
    assert_eq!(err.code, "WF-STATE-005");
}

#[tokio::test]
async fn cancel_works_from_paused() {
    let engine = echo_engine();
    let mut execution = engine.start(&human_graph(), json!({})).await.unwrap();
    engine.pause(&mut execution).unwrap();
    engine.cancel(&mut execution).unwrap();
    assert_eq!(execution.status, ExecutionStatus::Cancelled);
}

#[tokio::test]
async fn definition_hash_is_recorded_on_the_execution() {
    let graph = linear_graph();
    let expected = graph.definition_hash().unwrap();
    let engine = echo_engine();
    let execution = engine.start(&graph, json!({})).await.unwrap();
    assert_eq!(execution.definition_hash, expected);
    assert_eq!(execution.workflow_id, "wf-linear");
    assert_eq!(execution.workflow_name, "linear");
}

#[tokio::test]
async fn system_node_without_configured_output_echoes_the_context() {
    let graph = WorkflowGraph::from_json_str(
        r#"{
            "id": "wf-echo", "name": "echo",
            "nodes": [
                {"id": "start", "type": "START"},
                {"id": "system", "type": "SYSTEM"},
                {"id": "end", "type": "END"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "system"},
                {"id": "e2", "source": "system", "target": "end"}
            ]
        }"#,
    )
    .unwrap();
    let engine = echo_engine();
    let execution = engine.start(&graph, json!({"x": 1})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.node_results["system"], json!({"x": 1}));
    assert_eq!(execution.log.len(), 8);
}

#[tokio::test]
async fn resume_re_enters_activation_at_the_current_node() {
    // State shaped like a reload after a crash mid-step: the run was
    // persisted right after "node started" on the SYSTEM node.
    let graph = linear_graph();
    let hash = graph.definition_hash().unwrap();
    let mut execution = WorkflowExecution::new(graph, hash, json!({}));
    execution.status = ExecutionStatus::Running;
    execution.current_node_id = Some("work".to_string());
    execution
        .node_statuses
        .insert("start".to_string(), NodeStatus::Completed);
    execution
        .node_statuses
        .insert("work".to_string(), NodeStatus::Running);

    let engine = echo_engine();
    engine.pause(&mut execution).unwrap();
    engine.resume(&mut execution).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.node_status("work"), NodeStatus::Completed);
    assert_eq!(execution.node_status("end"), NodeStatus::Completed);
}

#[tokio::test]
async fn snapshot_shields_the_run_from_later_graph_edits() {
    let mut graph = linear_graph();
    let engine = echo_engine();
    let execution = engine.start(&graph, json!({})).await.unwrap();

    graph.name = "renamed".to_string();
    assert_eq!(execution.snapshot.name, "linear");
}
