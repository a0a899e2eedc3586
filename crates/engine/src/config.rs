//! Engine-wide tunables read from the environment.

use std::{env, sync::Arc, time::Duration};

use actionkit_util::http::{HttpError, HttpTransport, ReqwestTransport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CACHE_MAX_KEYS_ENV: &str = "ACTIONKIT_CACHE_MAX_KEYS";
pub const HTTP_TIMEOUT_ENV: &str = "ACTIONKIT_HTTP_TIMEOUT_SECS";
pub const USER_AGENT_ENV: &str = "ACTIONKIT_USER_AGENT";

pub const DEFAULT_CACHE_MAX_KEYS: usize = 1000;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of every cached-field store.
    pub cache_max_keys: usize,
    #[serde(with = "duration_secs")]
    pub http_timeout: Duration,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_max_keys: DEFAULT_CACHE_MAX_KEYS,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

impl EngineConfig {
    /// Reads overrides from `ACTIONKIT_*` variables, keeping defaults for unset
    /// or blank ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = non_blank_var(CACHE_MAX_KEYS_ENV) {
            config.cache_max_keys = raw
                .parse::<usize>()
                .ok()
                .filter(|keys| *keys > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: CACHE_MAX_KEYS_ENV,
                    value: raw.clone(),
                    expected: "a positive integer",
                })?;
        }
        if let Some(raw) = non_blank_var(HTTP_TIMEOUT_ENV) {
            let seconds = raw
                .parse::<u64>()
                .ok()
                .filter(|seconds| *seconds > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: HTTP_TIMEOUT_ENV,
                    value: raw.clone(),
                    expected: "a positive number of seconds",
                })?;
            config.http_timeout = Duration::from_secs(seconds);
        }
        if let Some(user_agent) = non_blank_var(USER_AGENT_ENV) {
            config.user_agent = user_agent;
        }
        Ok(config)
    }

    /// Builds the default network transport for this configuration.
    pub fn transport(&self) -> Result<Arc<dyn HttpTransport>, HttpError> {
        Ok(Arc::new(ReqwestTransport::new(self.http_timeout, &self.user_agent)?))
    }
}

fn default_user_agent() -> String {
    format!("actionkit/{}", env!("CARGO_PKG_VERSION"))
}

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
