use crate::core::workflow::graph::{Edge, WorkflowGraph};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::fmt;

/// Node weight carrying display information for DOT rendering.
struct GraphNode {
    id: String,
    kind: String,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\n{}", self.id, self.kind)
    }
}

/// Edge weight carrying a formatted label.
struct EdgeData {
    label: String,
}

impl fmt::Display for EdgeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

fn build_graph(workflow: &WorkflowGraph) -> DiGraph<GraphNode, EdgeData> {
    let mut graph = DiGraph::new();
    let mut node_map: HashMap<&str, NodeIndex> = HashMap::new();

    for node in &workflow.nodes {
        let idx = graph.add_node(GraphNode {
            id: node.id.clone(),
            kind: node.kind.as_str().to_string(),
        });
        node_map.insert(node.id.as_str(), idx);
    }

    for edge in &workflow.edges {
        if let (Some(&from), Some(&to)) = (
            node_map.get(edge.source.as_str()),
            node_map.get(edge.target.as_str()),
        ) {
            let label = format_edge_label(edge);
            graph.add_edge(from, to, EdgeData { label });
        }
    }

    graph
}

/// Render the workflow graph as a Graphviz DOT string using petgraph.
pub fn graph_to_dot(workflow: &WorkflowGraph) -> String {
    let graph = build_graph(workflow);
    format!("{}", Dot::new(&graph))
}

fn format_edge_label(edge: &Edge) -> String {
    match &edge.source_handle {
        Some(handle) => escape_label(&truncate(handle, 40)),
        None => String::new(),
    }
}

fn truncate(value: &str, limit: usize) -> String {
    if value.len() <= limit {
        value.to_string()
    } else {
        format!("{}...", &value[..limit])
    }
}

fn escape_label(value: &str) -> String {
    value.replace('\"', "\\\"")
}
