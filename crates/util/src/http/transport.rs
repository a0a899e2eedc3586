//! The seam between request clients and the network.

use std::time::{Duration, Instant};

use actionkit_types::{Headers, HttpRequest, HttpResponse};
use async_trait::async_trait;
use reqwest::{Client, Method, header};
use tracing::{debug, warn};

use super::{HttpError, parse_response_body};
use crate::redact::redact_sensitive;

/// Sends one fully resolved request and returns the decoded response.
///
/// Implementations return `Ok` for every response the remote produced, whatever
/// its status; status handling belongs to the request client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, HttpError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|error| HttpError::invalid_request(format!("build http client: {error}")))?;
        Ok(Self { http })
    }

    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|error| HttpError::invalid_request(error.to_string()))?;

        let mut builder = self.http.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|error| {
            warn!(
                method = %request.method,
                url = %redact_sensitive(&request.url),
                error = %error,
                duration_ms = start.elapsed().as_millis(),
                "http request could not be sent"
            );
            if error.is_timeout() {
                HttpError::Timeout {
                    method: request.method,
                    url: request.url.clone(),
                }
            } else {
                HttpError::Transport {
                    method: request.method,
                    url: request.url.clone(),
                    message: error.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string())))
            .collect();
        let content_type = headers.get(header::CONTENT_TYPE.as_str()).cloned();
        let text = response.text().await.map_err(|error| HttpError::Decode {
            method: request.method,
            url: url.clone(),
            message: error.to_string(),
        })?;
        let body = parse_response_body(&text, content_type.as_deref(), status).map_err(|error| HttpError::Decode {
            method: request.method,
            url: url.clone(),
            message: error.to_string(),
        })?;

        debug!(
            method = %request.method,
            url = %redact_sensitive(&url),
            status,
            duration_ms = start.elapsed().as_millis(),
            "http request completed"
        );
        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
        })
    }
}
