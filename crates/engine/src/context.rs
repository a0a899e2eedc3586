//! Per-run execution context.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// The value bag threaded through one pipeline run.
///
/// Created fresh by the caller for every invocation. The map step replaces
/// `payload`; cached-request steps fill `cached_fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteInput {
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Value>,
    #[serde(default)]
    pub cached_fields: Map<String, Value>,
    /// Pagination cursor for autocomplete lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

impl ExecuteInput {
    pub fn new(settings: Value, payload: Value) -> Self {
        Self {
            settings,
            payload,
            ..Default::default()
        }
    }

    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    pub fn settings_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.settings)
    }

    /// A resolved cached field. Fields resolved as absent read as `None`.
    pub fn cached_field(&self, name: &str) -> Option<&Value> {
        self.cached_fields.get(name).filter(|value| !value.is_null())
    }

    pub fn field(&self, field: ExecuteField) -> &Value {
        match field {
            ExecuteField::Payload => &self.payload,
            ExecuteField::Settings => &self.settings,
        }
    }

    pub fn field_mut(&mut self, field: ExecuteField) -> &mut Value {
        match field {
            ExecuteField::Payload => &mut self.payload,
            ExecuteField::Settings => &mut self.settings,
        }
    }
}

/// The part of the context a validate step checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecuteField {
    Payload,
    Settings,
}

impl fmt::Display for ExecuteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload => f.write_str("payload"),
            Self::Settings => f.write_str("settings"),
        }
    }
}
