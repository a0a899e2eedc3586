//! Transport-neutral HTTP descriptors.
//!
//! These types describe outbound calls and their responses without tying the
//! data model to a particular HTTP client. The `actionkit-util` crate maps them
//! onto `reqwest`.

use std::{fmt, time::Duration};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header map with lowercase names, preserving insertion order.
pub type Headers = IndexMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial call options.
///
/// Returned by a destination's request extension and merged as defaults under
/// the options of every call issued through a request client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Base URL prepended to relative request URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_url: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: Headers,
    /// Basic auth user name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic auth password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "duration_millis")]
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Sets basic auth credentials, replacing any bearer token.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self.bearer_token = None;
        self
    }

    /// Sets a bearer token, replacing any basic auth credentials.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self.username = None;
        self.password = None;
        self
    }

    fn has_credentials(&self) -> bool {
        self.bearer_token.is_some() || self.username.is_some() || self.password.is_some()
    }

    pub fn with_prefix_url(mut self, prefix_url: impl Into<String>) -> Self {
        self.prefix_url = Some(prefix_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Layers `overrides` on top of `self`; values present in `overrides` win.
    ///
    /// Header names are lowercased on both sides. Credentials are taken as a
    /// unit: when `overrides` carries any, the default credentials and the
    /// default `authorization` header are dropped.
    pub fn merged_with(&self, overrides: &RequestOptions) -> RequestOptions {
        let mut headers = lowercase_names(&self.headers);
        let credentials = if overrides.has_credentials() {
            headers.shift_remove("authorization");
            overrides
        } else {
            self
        };
        headers.extend(lowercase_names(&overrides.headers));
        RequestOptions {
            prefix_url: overrides.prefix_url.clone().or_else(|| self.prefix_url.clone()),
            headers,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            bearer_token: credentials.bearer_token.clone(),
            timeout: overrides.timeout.or(self.timeout),
        }
    }
}

fn lowercase_names(headers: &Headers) -> Headers {
    headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect()
}

/// A fully resolved outbound call, as handed to a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub query: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "duration_millis")]
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }
}

/// A completed response.
///
/// `body` holds parsed JSON when the payload is JSON, the raw text otherwise,
/// and `null` for empty bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            url: String::new(),
            headers: Headers::new(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_u64(duration.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_prefers_override_values_and_keeps_defaults() {
        let defaults = RequestOptions::default()
            .with_basic_auth("site", "key")
            .with_header("Accept", "application/json")
            .with_prefix_url("https://track.example.com");
        let overrides = RequestOptions::default().with_header("accept", "text/plain").with_bearer_token("token");

        let merged = defaults.merged_with(&overrides);

        assert_eq!(merged.username, None);
        assert_eq!(merged.bearer_token.as_deref(), Some("token"));
        assert_eq!(merged.headers.get("accept").map(String::as_str), Some("text/plain"));
        assert_eq!(merged.prefix_url.as_deref(), Some("https://track.example.com"));
    }

    #[test]
    fn merge_keeps_default_credentials_when_overrides_have_none() {
        let defaults = RequestOptions::default().with_basic_auth("site", "key");
        let overrides = RequestOptions::default().with_header("x-trace", "1");

        let merged = defaults.merged_with(&overrides);

        assert_eq!(merged.username.as_deref(), Some("site"));
        assert_eq!(merged.password.as_deref(), Some("key"));
    }

    #[test]
    fn merge_lowercases_header_names_from_literals_and_serde() {
        let mut defaults: RequestOptions =
            serde_json::from_value(json!({ "headers": { "Content-Type": "text/csv" } })).expect("deserialize");
        defaults.headers.insert("X-Api-Version".into(), "1".into());
        let overrides = RequestOptions {
            headers: Headers::from([("CONTENT-TYPE".to_string(), "application/json".to_string())]),
            ..RequestOptions::default()
        };

        let merged = defaults.merged_with(&overrides);

        assert_eq!(merged.headers.len(), 2);
        assert_eq!(merged.headers["content-type"], "application/json");
        assert_eq!(merged.headers["x-api-version"], "1");
    }

    #[test]
    fn per_call_credentials_drop_default_authorization_header() {
        let defaults = RequestOptions::default().with_header("Authorization", "Token abc");
        let overrides = RequestOptions::default().with_basic_auth("u", "p");

        let merged = defaults.merged_with(&overrides);

        assert!(!merged.headers.contains_key("authorization"));
        assert_eq!(merged.username.as_deref(), Some("u"));
    }

    #[test]
    fn options_round_trip_timeout_as_millis() {
        let options = RequestOptions::default().with_timeout(Duration::from_millis(1500));
        let value = serde_json::to_value(&options).expect("serialize");
        assert_eq!(value, json!({ "timeout": 1500 }));
        let back: RequestOptions = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn response_header_lookup_is_case_insensitive() {
        let mut response = HttpResponse::new(200, Value::Null);
        response.headers.insert("content-type".into(), "application/json".into());
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert!(response.is_success());
    }
}
