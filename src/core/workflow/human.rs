#![allow(clippy::result_large_err)] // Human task config parsing returns EngineError for consistent diagnostics.

use crate::core::error::EngineError;
use crate::core::types::ErrorCategory;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Parsed configuration of a HUMAN node: an opaque form schema shown to
/// the responder, an optional timeout, and an optional assignee hint.
#[derive(Debug, Clone, PartialEq)]
pub struct HumanTaskConfig {
    pub form: Option<Value>,
    pub timeout_minutes: Option<u64>,
    pub assignee: Option<String>,
}

impl HumanTaskConfig {
    pub fn parse(config: &Value) -> Result<Self, EngineError> {
        let form = config.get("form").cloned();

        let timeout_minutes = match config.get("timeoutMinutes") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let minutes = value.as_u64().filter(|m| *m >= 1).ok_or_else(|| {
                    EngineError::new(
                        ErrorCategory::ValidationError,
                        "timeoutMinutes must be a positive integer",
                    )
                    .with_code("WF-HUMAN-001")
                })?;
                Some(minutes)
            }
        };

        let assignee = match config.get("assignee") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let name = value
                    .as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        EngineError::new(
                            ErrorCategory::ValidationError,
                            "assignee must be a non-empty string",
                        )
                        .with_code("WF-HUMAN-001")
                    })?;
                Some(name.to_string())
            }
        };

        Ok(Self {
            form,
            timeout_minutes,
            assignee,
        })
    }

    /// Instant at which a task waiting since `waiting_since` expires,
    /// when a timeout is configured.
    pub fn deadline(&self, waiting_since: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.timeout_minutes
            .map(|minutes| waiting_since + Duration::minutes(minutes as i64))
    }
}
