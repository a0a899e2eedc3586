//! # Actionkit Engine
//!
//! The Actionkit Engine turns a destination's declarative action definitions
//! (input fields, cached lookups and a perform callback) into a fixed,
//! fail-fast step pipeline and runs it once per incoming event.
//!
//! ## Key Features
//!
//! - **Schema Compiler**: Field definitions compile into a closed JSON schema and back
//! - **Coercing Validation**: Loosely typed input is normalized, then every violation is reported at once
//! - **Mapping Kit**: `@path`, `@template`, `@literal` and `@if` directives reshape events into payloads
//! - **Cached Lookups**: TTL-bounded per-field stores with opt-in negative caching
//! - **Response Observation**: Every outbound call is republished on the owning action's channel
//!
//! ## Usage
//!
//! ```rust
//! use actionkit_engine::parse_fields_file;
//!
//! let temp_dir = tempfile::tempdir()?;
//! let fields_path = temp_dir.path().join("fields.yaml");
//! std::fs::write(&fields_path, r#"
//! email:
//!   type: string
//!   required: true
//! "#)?;
//!
//! let fields = parse_fields_file(&fields_path)?;
//! let schema = actionkit_engine::compile(&fields);
//! assert_eq!(schema.required, vec!["email".to_string()]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`schema`**: field definitions to compiled schema and back
//! - **`validate`**: coercion pass and constraint checks
//! - **`mapping`**: declarative payload mapping
//! - **`step`** / **`pipeline`**: the step contract and sequential runner
//! - **`action`** / **`destination`**: orchestration over compiled pipelines

use std::{fs, path::Path};

use actionkit_types::FieldDefinitions;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod action;
pub mod cache;
pub mod config;
pub mod context;
pub mod destination;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod schema;
pub mod step;
pub mod validate;

pub use action::{Action, ActionDefinition, ActionRuntime, CachedFieldDefinition};
pub use cache::{CacheLookup, CacheStore};
pub use config::{ConfigError, EngineConfig};
pub use context::{ExecuteField, ExecuteInput};
pub use destination::{AuthScheme, Authentication, Destination, DestinationDefinition, DestinationError, Preset};
pub use error::{ActionError, ExecutionError};
pub use mapping::{MappingError, default_mapping, transform, validate_mapping};
pub use pipeline::{PipelineRun, Steps};
pub use schema::{compile, decompile};
pub use step::{PerformOutput, RequestFn, Step, StepKind, StepOutput, StepResult, StepStatus};
pub use validate::{SchemaError, SchemaValidator, ValidationErrors, validate};

/// Loads a field definition map from a YAML or JSON file.
///
/// # Errors
///
/// Fails when the file cannot be read or does not describe a field map.
pub fn parse_fields_file(file_path: impl AsRef<Path>) -> Result<FieldDefinitions> {
    parse_document_file(file_path)
}

/// Loads any YAML or JSON document, e.g. an event, payload or mapping.
pub fn parse_value_file(file_path: impl AsRef<Path>) -> Result<Value> {
    parse_document_file(file_path)
}

fn parse_document_file<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("Failed to read {}", file_path.display()))?;
    // YAML is a superset of JSON, so one parser covers both formats.
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", file_path.display()))
}
