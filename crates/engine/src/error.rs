use actionkit_util::http::HttpError;
use thiserror::Error;

use crate::{
    mapping::MappingError,
    step::StepResult,
    validate::{SchemaError, ValidationErrors},
};

/// Failure of a single step, or of an autocomplete lookup.
#[derive(Debug, Error)]
pub enum ActionError {
    /// One or more field constraints were violated. Every violation is reported.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A compiled schema could not be turned into a validator.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The declarative mapping could not be applied to the payload.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// An author callback (perform, cached value, autocomplete) failed.
    #[error("{step}: {source:#}")]
    Call {
        step: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ActionError {
    pub fn call(step: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Call {
            step: step.into(),
            source,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// The HTTP failure behind a call error, if the callback failed on a request.
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            Self::Call { source, .. } => source.chain().find_map(|cause| cause.downcast_ref::<HttpError>()),
            _ => None,
        }
    }

    /// Returns the untouched callback error for call failures.
    pub fn into_call_error(self) -> Result<anyhow::Error, Self> {
        match self {
            Self::Call { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}

/// Terminal error of [`crate::Action::execute`].
///
/// Carries the ordered outcome of every step that ran, the failing one last.
#[derive(Debug, Error)]
#[error("{} step failed", .results.last().map(|result| result.step.as_str()).unwrap_or("action"))]
pub struct ExecutionError {
    #[source]
    pub error: ActionError,
    pub results: Vec<StepResult>,
}

impl ExecutionError {
    pub fn into_inner(self) -> ActionError {
        self.error
    }
}
