use serde_json::json;
use std::sync::Arc;
use weft::core::workflow::{
    DecisionSpec, EchoExecutor, Engine, EngineBuilder, ExecutionStatus, NodeStatus, RuleEvaluator,
    WorkflowGraph,
};
use weft::core::EngineError;

fn approval_graph(decision_config: &str) -> WorkflowGraph {
    let text = format!(
        r#"{{
            "id": "wf-order", "name": "order approval",
            "nodes": [
                {{"id": "start", "type": "START"}},
                {{"id": "check", "type": "DECISION", "config": {}}},
                {{"id": "approve", "type": "SYSTEM", "config": {{"output": {{"outcome": "approved"}}}}}},
                {{"id": "reject", "type": "SYSTEM", "config": {{"output": {{"outcome": "rejected"}}}}}},
                {{"id": "end", "type": "END"}}
            ],
            "edges": [
                {{"id": "e1", "source": "start", "target": "check"}},
                {{"id": "e2", "source": "check", "target": "approve", "sourceHandle": "true"}},
                {{"id": "e3", "source": "check", "target": "reject", "sourceHandle": "false"}},
                {{"id": "e4", "source": "approve", "target": "end"}},
                {{"id": "e5", "source": "reject", "target": "end"}}
            ]
        }}"#,
        decision_config
    );
    WorkflowGraph::from_json_str(&text).unwrap()
}

fn echo_engine() -> Engine {
    Engine::builder().executors(EchoExecutor::registry()).build()
}

#[tokio::test]
async fn true_branch_runs_and_false_branch_is_skipped() {
    let engine = echo_engine();
    let graph = approval_graph(r#"{"expression": "context.amount > 100"}"#);
    let execution = engine.start(&graph, json!({"amount": 250})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.node_results["check"], json!(true));
    assert_eq!(execution.node_status("approve"), NodeStatus::Completed);
    assert_eq!(execution.node_status("reject"), NodeStatus::Skipped);
    assert_eq!(execution.context["outcome"], json!("approved"));

    let skipped = execution.log_for_node("reject");
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].message, "branch skipped");

    let decision_done = execution
        .log_for_node("check")
        .into_iter()
        .find(|entry| entry.message == "node completed")
        .expect("decision completion entry");
    assert_eq!(decision_done.data, Some(json!({"result": true})));
}

#[tokio::test]
async fn false_branch_runs_and_true_branch_is_skipped() {
    let engine = echo_engine();
    let graph = approval_graph(r#"{"expression": "context.amount > 100"}"#);
    let execution = engine.start(&graph, json!({"amount": 50})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.node_results["check"], json!(false));
    assert_eq!(execution.node_status("reject"), NodeStatus::Completed);
    assert_eq!(execution.node_status("approve"), NodeStatus::Skipped);
    assert_eq!(execution.context["outcome"], json!("rejected"));
}

#[tokio::test]
async fn non_boolean_expression_fails_without_coercion() {
    let engine = echo_engine();
    let graph = approval_graph(r#"{"expression": "context.amount + 1"}"#);
    let execution = engine.start(&graph, json!({"amount": 250})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.failure.as_ref().unwrap().code, "WF-EXPR-002");
    assert_eq!(execution.node_status("check"), NodeStatus::Error);
}

#[tokio::test]
async fn broken_expression_fails_the_execution() {
    let engine = echo_engine();
    let graph = approval_graph(r#"{"expression": "context.amount >"}"#);
    let execution = engine.start(&graph, json!({"amount": 250})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.failure.as_ref().unwrap().code, "WF-EXPR-001");
}

#[tokio::test]
async fn decision_config_must_pick_one_mechanism() {
    let engine = echo_engine();
    for config in [
        r#"{}"#,
        r#"{"expression": "true", "rule": "credit-check"}"#,
        r#"{"expression": "   "}"#,
    ] {
        let execution = engine
            .start(&approval_graph(config), json!({}))
            .await
            .unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed, "config {}", config);
        assert_eq!(execution.failure.as_ref().unwrap().code, "WF-EXPR-003");
    }
}

#[tokio::test]
async fn named_rule_without_host_evaluator_fails() {
    let engine = echo_engine();
    let graph = approval_graph(r#"{"rule": "credit-check"}"#);
    let execution = engine.start(&graph, json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.failure.as_ref().unwrap().code, "WF-EXPR-004");
}

struct StaticRules {
    verdict: bool,
}

impl RuleEvaluator for StaticRules {
    fn evaluate(
        &self,
        spec: &DecisionSpec,
        _context: &serde_json::Value,
        _results: &serde_json::Value,
    ) -> Result<bool, EngineError> {
        match spec {
            DecisionSpec::Rule(_) => Ok(self.verdict),
            DecisionSpec::Expression(_) => Ok(self.verdict),
        }
    }
}

#[tokio::test]
async fn host_rule_evaluator_resolves_named_rules() {
    let engine = EngineBuilder::new()
        .executors(EchoExecutor::registry())
        .rule_evaluator(Arc::new(StaticRules { verdict: true }))
        .build();
    let graph = approval_graph(r#"{"rule": "credit-check"}"#);
    let execution = engine.start(&graph, json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.node_status("approve"), NodeStatus::Completed);
    assert_eq!(execution.node_status("reject"), NodeStatus::Skipped);
}

#[tokio::test]
async fn expression_can_read_prior_node_results() {
    let graph = WorkflowGraph::from_json_str(
        r#"{
            "id": "wf-results", "name": "result gated",
            "nodes": [
                {"id": "start", "type": "START"},
                {"id": "score", "type": "SYSTEM", "config": {"output": {"score": 80}}},
                {"id": "check", "type": "DECISION", "config": {"expression": "results.score.score >= 75"}},
                {"id": "pass", "type": "SYSTEM"},
                {"id": "fail", "type": "SYSTEM"},
                {"id": "end", "type": "END"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "score"},
                {"id": "e2", "source": "score", "target": "check"},
                {"id": "e3", "source": "check", "target": "pass", "sourceHandle": "true"},
                {"id": "e4", "source": "check", "target": "fail", "sourceHandle": "false"},
                {"id": "e5", "source": "pass", "target": "end"},
                {"id": "e6", "source": "fail", "target": "end"}
            ]
        }"#,
    )
    .unwrap();
    let engine = echo_engine();
    let execution = engine.start(&graph, json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.node_status("pass"), NodeStatus::Completed);
    assert_eq!(execution.node_status("fail"), NodeStatus::Skipped);
}

#[tokio::test]
async fn shared_tail_still_runs_after_a_provisional_skip() {
    // Both branches feed the same tail node. The untaken edge marks it
    // SKIPPED at decision time, but the taken path flows through it and
    // the run overwrites the marker.
    let graph = WorkflowGraph::from_json_str(
        r#"{
            "id": "wf-join", "name": "rejoin",
            "nodes": [
                {"id": "start", "type": "START"},
                {"id": "check", "type": "DECISION", "config": {"expression": "context.go"}},
                {"id": "side", "type": "SYSTEM"},
                {"id": "tail", "type": "SYSTEM"},
                {"id": "end", "type": "END"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "check"},
                {"id": "e2", "source": "check", "target": "side", "sourceHandle": "true"},
                {"id": "e3", "source": "check", "target": "tail", "sourceHandle": "false"},
                {"id": "e4", "source": "side", "target": "tail"},
                {"id": "e5", "source": "tail", "target": "end"}
            ]
        }"#,
    )
    .unwrap();
    let engine = echo_engine();
    let execution = engine.start(&graph, json!({"go": true})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.node_status("side"), NodeStatus::Completed);
    assert_eq!(execution.node_status("tail"), NodeStatus::Completed);
    assert!(execution
        .log_for_node("tail")
        .iter()
        .any(|entry| entry.message == "branch skipped"));
}
