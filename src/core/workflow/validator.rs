use crate::core::workflow::graph::{NodeKind, WorkflowGraph};
use std::collections::{HashMap, HashSet, VecDeque};

/// Outcome of structural validation. Every check runs and every failure
/// is collected; callers get the complete picture in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a workflow graph structurally. Deterministic: the same graph
/// always yields the same errors in the same order.
pub fn validate(graph: &WorkflowGraph) -> ValidationResult {
    let mut errors = Vec::new();

    if graph.nodes.is_empty() {
        errors.push("workflow must define at least one node".to_string());
    }

    let start_count = graph
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Start)
        .count();
    match start_count {
        0 => {
            if !graph.nodes.is_empty() {
                errors.push("workflow must define a START node".to_string());
            }
        }
        1 => {}
        many => errors.push(format!(
            "workflow must define exactly one START node, found {}",
            many
        )),
    }

    if !graph.nodes.is_empty() && graph.end_nodes().is_empty() {
        errors.push("workflow must define at least one END node".to_string());
    }

    let mut seen_node_ids = HashSet::new();
    for node in &graph.nodes {
        if !seen_node_ids.insert(node.id.as_str()) {
            errors.push(format!("duplicate node id: {}", node.id));
        }
    }

    let mut seen_edge_ids = HashSet::new();
    for edge in &graph.edges {
        if !seen_edge_ids.insert(edge.id.as_str()) {
            errors.push(format!("duplicate edge id: {}", edge.id));
        }
        if !seen_node_ids.contains(edge.source.as_str()) {
            errors.push(format!(
                "edge {} references unknown source node: {}",
                edge.id, edge.source
            ));
        }
        if !seen_node_ids.contains(edge.target.as_str()) {
            errors.push(format!(
                "edge {} references unknown target node: {}",
                edge.id, edge.target
            ));
        }
    }

    if start_count == 1 {
        let reachable = reachable_from_start(graph);
        for node in &graph.nodes {
            if node.kind == NodeKind::Start {
                continue;
            }
            if !reachable.contains(node.id.as_str()) {
                errors.push(format!(
                    "node {} is not reachable from the START node",
                    node.id
                ));
            }
        }
    }

    for node in &graph.nodes {
        if node.kind != NodeKind::Decision {
            continue;
        }
        let outgoing = graph.outgoing_edges(&node.id);
        if outgoing.len() != 2 {
            errors.push(format!(
                "decision node {} must have exactly 2 outgoing edges, found {}",
                node.id,
                outgoing.len()
            ));
            continue;
        }
        let handles: HashSet<&str> = outgoing
            .iter()
            .filter_map(|edge| edge.source_handle.as_deref())
            .collect();
        if !(handles.contains("true") && handles.contains("false")) {
            errors.push(format!(
                "decision node {} must label its outgoing edges with handles true and false",
                node.id
            ));
        }
    }

    ValidationResult::from_errors(errors)
}

/// Forward breadth-first traversal over the edge list, starting at the
/// unique START node.
fn reachable_from_start(graph: &WorkflowGraph) -> HashSet<&str> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();
    if let Some(start) = graph.start_node() {
        reachable.insert(start.id.as_str());
        queue.push_back(start.id.as_str());
    }
    while let Some(current) = queue.pop_front() {
        if let Some(targets) = adjacency.get(current) {
            for target in targets {
                if reachable.insert(target) {
                    queue.push_back(target);
                }
            }
        }
    }
    reachable
}
