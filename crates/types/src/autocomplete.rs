//! Autocomplete responses returned by dynamic field resolvers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One selectable option for a dynamic field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteItem {
    pub label: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompletePagination {
    /// Opaque cursor to request the next page, when more results exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    #[serde(default)]
    pub data: Vec<AutocompleteItem>,
    #[serde(default)]
    pub pagination: AutocompletePagination,
}

impl AutocompleteResponse {
    /// Response used when no resolver is registered for a field.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
