#![allow(clippy::result_large_err)] // Rule evaluation returns EngineError for consistent diagnostics.

use crate::core::error::EngineError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::expression::{EvaluationContext, ExpressionEngine};
use serde_json::Value;

/// How a DECISION node decides: an inline expression or a named rule
/// resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionSpec {
    Expression(String),
    Rule(String),
}

impl DecisionSpec {
    /// Parse a DECISION node's config. Exactly one of `expression` or
    /// `rule` must be present and non-empty.
    pub fn parse(config: &Value) -> Result<Self, EngineError> {
        let expression = config
            .get("expression")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let rule = config
            .get("rule")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (expression, rule) {
            (Some(expr), None) => Ok(DecisionSpec::Expression(expr.to_string())),
            (None, Some(name)) => Ok(DecisionSpec::Rule(name.to_string())),
            (Some(_), Some(_)) => Err(EngineError::new(
                ErrorCategory::ValidationError,
                "decision config must set either expression or rule, not both",
            )
            .with_code("WF-EXPR-003")),
            (None, None) => Err(EngineError::new(
                ErrorCategory::ValidationError,
                "decision config requires a non-empty expression or rule",
            )
            .with_code("WF-EXPR-003")),
        }
    }
}

/// Capability that turns a decision spec plus run data into a boolean.
/// Results are never coerced; anything non-boolean is an error.
pub trait RuleEvaluator: Send + Sync + 'static {
    fn evaluate(
        &self,
        spec: &DecisionSpec,
        context: &Value,
        results: &Value,
    ) -> Result<bool, EngineError>;
}

/// Default evaluator backed by the locked-down expression engine.
/// Named rules require a host-injected evaluator and error here.
pub struct ExpressionRuleEvaluator {
    engine: ExpressionEngine,
}

impl Default for ExpressionRuleEvaluator {
    fn default() -> Self {
        Self {
            engine: ExpressionEngine::default(),
        }
    }
}

impl ExpressionRuleEvaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleEvaluator for ExpressionRuleEvaluator {
    fn evaluate(
        &self,
        spec: &DecisionSpec,
        context: &Value,
        results: &Value,
    ) -> Result<bool, EngineError> {
        match spec {
            DecisionSpec::Expression(expr) => {
                let ctx = EvaluationContext::new(context.clone(), results.clone());
                let value = self.engine.evaluate(expr, &ctx)?;
                match value {
                    Value::Bool(flag) => Ok(flag),
                    other => Err(EngineError::new(
                        ErrorCategory::ExpressionError,
                        format!(
                            "decision expression must evaluate to a boolean, got {}",
                            value_kind(&other)
                        ),
                    )
                    .with_code("WF-EXPR-002")
                    .with_context("expression", expr.clone())),
                }
            }
            DecisionSpec::Rule(name) => Err(EngineError::new(
                ErrorCategory::ValidationError,
                "named rules require a host-provided rule evaluator",
            )
            .with_code("WF-EXPR-004")
            .with_context("rule", name.clone())),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
