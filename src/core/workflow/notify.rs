use crate::core::workflow::execution::WorkflowExecution;
use crate::core::workflow::graph::Node;

/// Capability invoked exactly once each time an execution suspends on a
/// HUMAN node. Hosts route this to task inboxes, chat, or email.
pub trait NotificationSink: Send + Sync + 'static {
    fn human_task_waiting(&self, execution: &WorkflowExecution, node: &Node);
}

/// Default sink that surfaces suspensions through the tracing pipeline.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        TracingNotifier
    }
}

impl NotificationSink for TracingNotifier {
    fn human_task_waiting(&self, execution: &WorkflowExecution, node: &Node) {
        tracing::info!(
            execution_id = %execution.id,
            node_id = %node.id,
            node_name = %node.display_name(),
            "human task waiting for input"
        );
    }
}
