#![allow(clippy::result_large_err)] // Executor trait and registry return EngineError directly for structured diagnostics without boxing.

use crate::core::error::EngineError;
use crate::core::workflow::graph::{Node, NodeKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait implemented by hosts to carry out the work of automated nodes
/// (SYSTEM, AI, DATABASE, MAIL, REST_CALL, AGENT, CUSTOM).
///
/// The engine awaits `execute` with the accumulated context as input
/// and records whatever it returns as the node's result.
#[async_trait]
pub trait NodeExecutor: Send + Sync + 'static {
    /// Node kind this executor serves.
    fn kind(&self) -> NodeKind;

    /// Execute the node against the accumulated context.
    async fn execute(&self, node: &Node, input: &Value) -> Result<Value, EngineError>;
}

/// Builder used to register executors before execution.
pub struct ExecutorRegistryBuilder {
    executors: HashMap<NodeKind, Arc<dyn NodeExecutor>>,
}

impl Default for ExecutorRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorRegistryBuilder {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    pub fn register<T: NodeExecutor>(&mut self, executor: T) -> &mut Self {
        let kind = executor.kind();
        if self.executors.contains_key(&kind) {
            panic!("duplicate executor registered for kind: {}", kind);
        }
        self.executors.insert(kind, Arc::new(executor));
        self
    }

    /// Register one executor instance for every automated node kind.
    /// Panics when any of those kinds already has an executor.
    pub fn register_for_all_automated(&mut self, executor: Arc<dyn NodeExecutor>) -> &mut Self {
        for kind in [
            NodeKind::System,
            NodeKind::Ai,
            NodeKind::Database,
            NodeKind::Mail,
            NodeKind::RestCall,
            NodeKind::Agent,
            NodeKind::Custom,
        ] {
            if self.executors.contains_key(&kind) {
                panic!("duplicate executor registered for kind: {}", kind);
            }
            self.executors.insert(kind, executor.clone());
        }
        self
    }

    pub fn build(self) -> ExecutorRegistry {
        ExecutorRegistry {
            inner: Arc::new(self.executors),
        }
    }
}

/// Immutable registry available during workflow execution.
#[derive(Clone)]
pub struct ExecutorRegistry {
    inner: Arc<HashMap<NodeKind, Arc<dyn NodeExecutor>>>,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        ExecutorRegistryBuilder::new().build()
    }

    pub fn builder() -> ExecutorRegistryBuilder {
        ExecutorRegistryBuilder::new()
    }

    pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn NodeExecutor>> {
        self.inner.get(&kind).cloned()
    }
}

/// Executor that returns the node's configured `output` value when
/// present, otherwise echoes its input unchanged. Serves demos, the CLI
/// host, and tests.
pub struct EchoExecutor {
    kind: NodeKind,
}

impl EchoExecutor {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind }
    }

    /// A registry serving every automated kind with echo behavior.
    pub fn registry() -> ExecutorRegistry {
        let mut builder = ExecutorRegistry::builder();
        builder.register_for_all_automated(Arc::new(EchoExecutor::new(NodeKind::System)));
        builder.build()
    }
}

#[async_trait]
impl NodeExecutor for EchoExecutor {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    async fn execute(&self, node: &Node, input: &Value) -> Result<Value, EngineError> {
        if let Some(output) = node.config.get("output") {
            return Ok(output.clone());
        }
        Ok(input.clone())
    }
}
