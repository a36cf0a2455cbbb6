pub mod dot;
pub mod execution;
pub mod executor;
pub mod expression;
pub mod graph;
pub mod human;
pub mod notify;
pub mod rules;
pub mod state_machine;
pub mod store;
pub mod validator;

pub use execution::{ExecutionStatus, LogEntry, NodeStatus, WorkflowExecution};
pub use executor::{EchoExecutor, ExecutorRegistry, ExecutorRegistryBuilder, NodeExecutor};
pub use graph::{Edge, Node, NodeKind, WorkflowGraph};
pub use notify::{NotificationSink, TracingNotifier};
pub use rules::{DecisionSpec, ExpressionRuleEvaluator, RuleEvaluator};
pub use state_machine::{Engine, EngineBuilder};
pub use store::{ExecutionStore, ExecutionSummary, FileExecutionStore};
pub use validator::{validate, ValidationResult};
