//! The request-issuing handle passed to action callbacks.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use actionkit_types::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{HttpError, HttpTransport, RequestDescriptor, ResponseChannel, ResponseDescriptor, ResponseEvent};
use crate::redact::redact_headers;

/// Issues calls on behalf of a single step.
///
/// Carries the default options produced by the destination's request
/// extension. Every completed call is published on the client's
/// [`ResponseChannel`] before its status is checked.
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn HttpTransport>,
    defaults: RequestOptions,
    channel: ResponseChannel,
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("defaults", &self.defaults.prefix_url)
            .field("channel", &self.channel)
            .finish()
    }
}

impl RequestClient {
    pub fn new(transport: Arc<dyn HttpTransport>, defaults: RequestOptions) -> Self {
        Self {
            transport,
            defaults,
            channel: ResponseChannel::new(),
        }
    }

    /// Publishes response events on `channel` instead of a private one.
    pub fn with_channel(mut self, channel: ResponseChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn channel(&self) -> &ResponseChannel {
        &self.channel
    }

    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    pub fn request(&self, method: HttpMethod, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            method,
            url: url.into(),
            options: RequestOptions::default(),
            query: Vec::new(),
            body: None,
            error: None,
        }
    }

    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(HttpMethod::Get, url)
    }

    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(HttpMethod::Post, url)
    }

    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(HttpMethod::Put, url)
    }

    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(HttpMethod::Patch, url)
    }

    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(HttpMethod::Delete, url)
    }
}

/// Per-call options layered over the client defaults.
#[must_use = "a request does nothing until `send` is awaited"]
pub struct RequestBuilder {
    client: RequestClient,
    method: HttpMethod,
    url: String,
    options: RequestOptions,
    query: Vec<(String, String)>,
    body: Option<Value>,
    error: Option<HttpError>,
}

impl RequestBuilder {
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.options = self.options.with_header(name, value);
        self
    }

    pub fn query<K, V>(mut self, pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: ToString,
    {
        self.query
            .extend(pairs.iter().map(|(key, value)| (key.as_ref().to_string(), value.to_string())));
        self
    }

    /// Sets a JSON body. Serialization failures surface from [`RequestBuilder::send`].
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = Some(value),
            Err(error) => self.error = Some(HttpError::invalid_request(format!("serialize body: {error}"))),
        }
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.options = self.options.with_basic_auth(username, password);
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.options = self.options.with_bearer_token(token);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Sends the call and returns the response when its status is 2xx.
    pub async fn send(self) -> Result<HttpResponse, HttpError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let RequestBuilder {
            client,
            method,
            url,
            options,
            query,
            body,
            ..
        } = self;
        let options = client.defaults.merged_with(&options);
        let request = build_request(method, &url, &options, query, body)?;
        let request_descriptor = RequestDescriptor {
            method,
            url: request.url.clone(),
            headers: redact_headers(&request.headers),
        };

        debug!(method = %method, url = %request.url, "http request started");
        let start = Instant::now();
        let response = client.transport.send(request).await?;
        let duration = start.elapsed();

        client.channel.publish(&ResponseEvent {
            request: request_descriptor,
            response: ResponseDescriptor {
                status: response.status,
                headers: redact_headers(&response.headers),
                body: response.body.clone(),
            },
            duration,
        });

        if !response.is_success() {
            debug!(
                method = %method,
                url = %response.url,
                status = response.status,
                duration_ms = duration.as_millis(),
                "http request returned error status"
            );
            return Err(HttpError::Status {
                status: response.status,
                method,
                url: response.url,
                body: response.body,
            });
        }
        Ok(response)
    }
}

fn build_request(
    method: HttpMethod,
    url: &str,
    options: &RequestOptions,
    query: Vec<(String, String)>,
    body: Option<Value>,
) -> Result<HttpRequest, HttpError> {
    let resolved = resolve_url(url, options.prefix_url.as_deref())?;
    let mut request = HttpRequest::new(method, resolved);
    request.headers = options.headers.clone();
    if !request.headers.contains_key("authorization") {
        if let Some(token) = &options.bearer_token {
            request.headers.insert("authorization".into(), format!("Bearer {token}"));
        } else if let Some(username) = &options.username {
            let password = options.password.as_deref().unwrap_or_default();
            let encoded = STANDARD.encode(format!("{username}:{password}"));
            request.headers.insert("authorization".into(), format!("Basic {encoded}"));
        }
    }
    if body.is_some() && !request.headers.contains_key("content-type") {
        request.headers.insert("content-type".into(), "application/json".into());
    }
    request.query = query;
    request.body = body;
    request.timeout = options.timeout;
    Ok(request)
}

/// Joins a relative `url` onto `prefix_url`; absolute URLs are used as given.
fn resolve_url(url: &str, prefix_url: Option<&str>) -> Result<String, HttpError> {
    let candidate = match prefix_url {
        Some(prefix) if !is_absolute(url) => {
            format!("{}/{}", prefix.trim_end_matches('/'), url.trim_start_matches('/'))
        }
        _ => url.to_string(),
    };
    Url::parse(&candidate)
        .map(|parsed| parsed.to_string())
        .map_err(|error| HttpError::invalid_request(format!("invalid url '{candidate}': {error}")))
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<HttpRequest>>,
        status: u16,
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let url = request.url.clone();
            self.sent.lock().expect("sent lock").push(request);
            let mut response = HttpResponse {
                url,
                ..HttpResponse::new(self.status, json!({ "ok": self.status < 300 }))
            };
            response.headers.insert("set-cookie".into(), "session=abc".into());
            response.headers.insert("content-type".into(), "application/json".into());
            Ok(response)
        }
    }

    fn client(status: u16, defaults: RequestOptions) -> (RequestClient, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport {
            status,
            ..Default::default()
        });
        (RequestClient::new(transport.clone(), defaults), transport)
    }

    #[tokio::test]
    async fn applies_defaults_and_prefix_url() {
        let defaults = RequestOptions::default()
            .with_prefix_url("https://track.example.com/api/v1/")
            .with_basic_auth("site", "key")
            .with_header("Accept", "application/json");
        let (client, transport) = client(200, defaults);

        let response = client
            .put("/customers/42")
            .json(&json!({ "email": "ann@example.com" }))
            .query(&[("source", "actions")])
            .send()
            .await
            .expect("send");

        assert_eq!(response.body, json!({ "ok": true }));
        let sent = transport.sent.lock().expect("sent lock");
        let request = &sent[0];
        assert_eq!(request.url, "https://track.example.com/api/v1/customers/42");
        assert_eq!(request.headers["authorization"], "Basic c2l0ZTprZXk=");
        assert_eq!(request.headers["content-type"], "application/json");
        assert_eq!(request.query, vec![("source".to_string(), "actions".to_string())]);
    }

    #[tokio::test]
    async fn per_call_auth_overrides_defaults() {
        let (client, transport) = client(200, RequestOptions::default().with_basic_auth("site", "key"));

        client.get("https://api.example.com/me").bearer_auth("t0k").send().await.expect("send");

        let sent = transport.sent.lock().expect("sent lock");
        assert_eq!(sent[0].headers["authorization"], "Bearer t0k");
    }

    #[tokio::test]
    async fn per_call_basic_auth_overrides_default_bearer_token() {
        let (client, transport) = client(200, RequestOptions::default().with_bearer_token("default-token"));

        client.get("https://api.example.com/me").basic_auth("u", "p").send().await.expect("send");

        let sent = transport.sent.lock().expect("sent lock");
        assert_eq!(sent[0].headers["authorization"], "Basic dTpw");
    }

    #[tokio::test]
    async fn mixed_case_default_header_yields_single_authorization() {
        let mut defaults = RequestOptions::default().with_basic_auth("site", "key");
        defaults.headers.insert("Authorization".into(), "Bearer ext".into());
        let (client, transport) = client(200, defaults);

        client
            .get("https://api.example.com/me")
            .header("X-Trace", "1")
            .send()
            .await
            .expect("send");

        let sent = transport.sent.lock().expect("sent lock");
        let authorization: Vec<_> = sent[0]
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(authorization, ["Bearer ext"]);
        assert_eq!(sent[0].headers["x-trace"], "1");
    }

    #[tokio::test]
    async fn publishes_redacted_event_before_failing_on_status() {
        let (client, _) = client(404, RequestOptions::default().with_bearer_token("secret"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        client.channel().subscribe(Arc::new(move |event: &ResponseEvent| {
            sink.lock().expect("sink lock").push(event.clone());
        }));

        let error = client.get("https://api.example.com/persons/9").send().await.expect_err("404");

        assert!(error.is_not_found());
        let events = seen.lock().expect("seen lock");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].response.status, 404);
        assert_eq!(events[0].request.headers["authorization"], crate::redact::REDACTED);
        assert_eq!(events[0].response.headers["set-cookie"], crate::redact::REDACTED);
        assert_eq!(events[0].response.headers["content-type"], "application/json");
    }

    /// Serves one raw body, decoded the way `ReqwestTransport` decodes it.
    struct RawBodyTransport {
        status: u16,
        content_type: &'static str,
        body: &'static str,
    }

    #[async_trait]
    impl HttpTransport for RawBodyTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let body = crate::http::parse_response_body(self.body, Some(self.content_type), self.status).map_err(|error| {
                HttpError::Decode {
                    method: request.method,
                    url: request.url.clone(),
                    message: error.to_string(),
                }
            })?;
            let mut response = HttpResponse::new(self.status, body);
            response.url = request.url;
            response.headers.insert("content-type".into(), self.content_type.into());
            Ok(response)
        }
    }

    #[tokio::test]
    async fn html_not_found_page_labelled_json_is_still_a_404() {
        let transport = Arc::new(RawBodyTransport {
            status: 404,
            content_type: "application/json",
            body: "<html>Not Found</html>",
        });
        let client = RequestClient::new(transport, RequestOptions::default());
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        client.channel().subscribe(Arc::new(move |event: &ResponseEvent| {
            sink.lock().expect("sink lock").push(event.response.status);
        }));

        let error = client.get("https://api.example.com/persons/9").send().await.expect_err("404");

        assert!(error.is_not_found());
        assert!(HttpError::is_not_found_error(&anyhow::Error::new(error)));
        assert_eq!(*statuses.lock().expect("statuses lock"), vec![404]);
    }

    #[tokio::test]
    async fn rejects_relative_url_without_prefix() {
        let (client, transport) = client(200, RequestOptions::default());

        let error = client.get("/persons").send().await.expect_err("relative url");

        assert!(matches!(error, HttpError::InvalidRequest { .. }));
        assert!(transport.sent.lock().expect("sent lock").is_empty());
    }
}
