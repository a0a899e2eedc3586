//! Pipeline steps.
//!
//! A step holds only construction-time configuration and is reused by every
//! run of its action; all per-run state lives in the [`ExecuteInput`].

mod cached;
mod map;
mod request;
mod validate;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{context::ExecuteInput, error::ActionError};

pub use cached::{CachedRequest, KeyFn, ValueFn};
pub use map::MapInput;
pub use request::{AutocompleteFn, PerformFn, PerformOutput, Request, RequestContext, RequestExtension, RequestFn};
pub use validate::Validate;

pub const MAP_COMPLETED: &str = "MapInput completed";
pub const VALIDATE_COMPLETED: &str = "Validate completed";
pub const REQUEST_COMPLETED: &str = "Request completed";
pub const REQUEST_NO_OP: &str = "no-op";
pub const CACHE_HIT: &str = "cache hit";
pub const CACHE_MISS: &str = "cache miss";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    MapInput,
    Validate,
    Request,
    CachedRequest,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MapInput => "MapInput",
            Self::Validate => "Validate",
            Self::Request => "Request",
            Self::CachedRequest => "CachedRequest",
        };
        f.write_str(name)
    }
}

/// What a successful step produced: an outcome label and an optional value.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub label: String,
    pub value: Value,
}

impl StepOutput {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Value::Null,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed,
}

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Step name, e.g. `perform` or `cachedFields.organizationId`.
    pub step: String,
    pub kind: StepKind,
    pub status: StepStatus,
    /// Outcome label for successful steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Value produced by request steps; `null` otherwise.
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn succeeded(step: &dyn Step, output: StepOutput) -> Self {
        Self {
            step: step.name(),
            kind: step.kind(),
            status: StepStatus::Succeeded,
            output: Some(output.label),
            value: output.value,
            error: None,
        }
    }

    pub fn failed(step: &dyn Step, error: &ActionError) -> Self {
        Self {
            step: step.name(),
            kind: step.kind(),
            status: StepStatus::Failed,
            output: None,
            value: Value::Null,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// The unit of pipeline execution.
#[async_trait]
pub trait Step: Send + Sync {
    fn kind(&self) -> StepKind;

    fn name(&self) -> String {
        self.kind().to_string()
    }

    async fn execute_step(&self, input: &mut ExecuteInput) -> Result<StepOutput, ActionError>;
}
