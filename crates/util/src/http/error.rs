use actionkit_types::HttpMethod;
use serde_json::Value;
use thiserror::Error;

/// Failures raised while issuing a call through a [`crate::http::RequestClient`].
#[derive(Debug, Error)]
pub enum HttpError {
    /// The remote answered with a non-2xx status.
    #[error("{method} {url} failed with status {status}")]
    Status {
        status: u16,
        method: HttpMethod,
        url: String,
        body: Value,
    },

    #[error("{method} {url} could not be sent: {message}")]
    Transport { method: HttpMethod, url: String, message: String },

    #[error("{method} {url} timed out")]
    Timeout { method: HttpMethod, url: String },

    #[error("{method} {url} returned an unreadable body: {message}")]
    Decode { method: HttpMethod, url: String, message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl HttpError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 404 answer: the remote resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true when `error` (or any error in its chain) is a 404 [`HttpError`].
    pub fn is_not_found_error(error: &anyhow::Error) -> bool {
        error
            .chain()
            .filter_map(|cause| cause.downcast_ref::<HttpError>())
            .any(HttpError::is_not_found)
    }
}
