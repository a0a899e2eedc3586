//! Destinations: a named group of actions sharing settings, authentication
//! and a request extension.

use std::{future::Future, mem, sync::Arc};

use actionkit_types::{FieldDefinitions, JsonSchema, RequestOptions};
use actionkit_util::http::{RequestClient, ResponseObserver};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    action::{Action, ActionDefinition, ActionRuntime},
    context::{ExecuteField, ExecuteInput},
    error::{ActionError, ExecutionError},
    schema::compile,
    step::{PerformFn, PerformOutput, RequestExtension, Step, StepResult, Validate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Basic,
    Custom,
    OAuth2,
}

/// How a destination authenticates and which settings it needs to do so.
#[derive(Clone)]
pub struct Authentication {
    pub scheme: AuthScheme,
    /// Settings fields, validated before every action run.
    pub fields: FieldDefinitions,
    /// Call confirming that the supplied settings are accepted.
    pub test_authentication: Option<PerformFn>,
}

impl Authentication {
    pub fn new(scheme: AuthScheme, fields: FieldDefinitions) -> Self {
        Self {
            scheme,
            fields,
            test_authentication: None,
        }
    }

    pub fn test_authentication<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn(RequestClient, ExecuteInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<PerformOutput>> + Send + 'static,
    {
        self.test_authentication = Some(Arc::new(check));
        self
    }
}

/// A ready-made subscription offered when a destination is first connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    pub subscribe: String,
    pub partner_action: String,
    pub mapping: Value,
}

#[derive(Clone, Default)]
pub struct DestinationDefinition {
    pub name: String,
    pub slug: Option<String>,
    pub authentication: Option<Authentication>,
    /// Default call options shared by every action of the destination.
    pub extend_request: Option<RequestExtension>,
    pub actions: IndexMap<String, ActionDefinition>,
    pub presets: Vec<Preset>,
}

impl DestinationDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    pub fn extend_request<F>(mut self, extend: F) -> Self
    where
        F: Fn(&ExecuteInput) -> RequestOptions + Send + Sync + 'static,
    {
        self.extend_request = Some(Arc::new(extend));
        self
    }

    pub fn action(mut self, key: impl Into<String>, action: ActionDefinition) -> Self {
        self.actions.insert(key.into(), action);
        self
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        self.presets.push(preset);
        self
    }
}

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination has no action named '{0}'")]
    UnknownAction(String),

    #[error("invalid settings: {0}")]
    Settings(#[source] ActionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("authentication failed: {0}")]
    Authentication(#[source] ActionError),
}

/// A destination with every action compiled.
pub struct Destination {
    name: String,
    slug: Option<String>,
    authentication: Option<Authentication>,
    settings: Option<Validate>,
    actions: IndexMap<String, Action>,
    presets: Vec<Preset>,
    runtime: ActionRuntime,
}

impl Destination {
    pub fn new(definition: DestinationDefinition, runtime: ActionRuntime) -> Self {
        let DestinationDefinition {
            name,
            slug,
            authentication,
            extend_request,
            actions,
            presets,
        } = definition;
        let runtime = match extend_request {
            Some(extend) => runtime.with_request_extension(Some(extend)),
            None => runtime,
        };
        let settings = authentication
            .as_ref()
            .map(|authentication| Validate::new(ExecuteField::Settings, compile(&authentication.fields)));
        let actions: IndexMap<String, Action> = actions
            .into_iter()
            .map(|(key, action)| (key, Action::new(action, runtime.clone())))
            .collect();
        debug!(destination = %name, actions = actions.len(), "destination compiled");

        Self {
            name,
            slug,
            authentication,
            settings,
            actions,
            presets,
            runtime,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    /// Compiled settings schema, when the destination declares authentication.
    pub fn settings_schema(&self) -> Option<&JsonSchema> {
        self.settings.as_ref().map(Validate::schema)
    }

    /// Coerces and checks `settings` in place.
    pub async fn validate_settings(&self, settings: &mut Value) -> Result<(), DestinationError> {
        let mut input = ExecuteInput::new(mem::take(settings), Value::Null);
        let result = self.check_settings(&mut input).await;
        *settings = input.settings;
        result
    }

    /// Validates the run's settings, then executes the action named `key`.
    pub async fn execute_action(&self, key: &str, input: &mut ExecuteInput) -> Result<Vec<StepResult>, DestinationError> {
        let action = self
            .actions
            .get(key)
            .ok_or_else(|| DestinationError::UnknownAction(key.to_string()))?;
        self.check_settings(input).await?;
        info!(destination = %self.name, action = key, "executing action");
        Ok(action.execute(input).await?)
    }

    /// Runs the authentication check against `settings`.
    ///
    /// Succeeds without a call when the destination declares no check.
    pub async fn test_authentication(&self, settings: Value) -> Result<(), DestinationError> {
        let mut input = ExecuteInput::new(settings, Value::Null);
        self.check_settings(&mut input).await?;
        let Some(check) = self.authentication.as_ref().and_then(|auth| auth.test_authentication.as_ref()) else {
            return Ok(());
        };
        let step = "testAuthentication";
        let result = self.runtime.request_context().call(step, check.as_ref(), &input).await;
        result
            .map(|_| ())
            .map_err(|error| DestinationError::Authentication(ActionError::call(step, error)))
    }

    /// Subscribes `observer` to the responses of every action.
    pub fn subscribe(&self, observer: Arc<dyn ResponseObserver>) {
        for action in self.actions.values() {
            action.subscribe(Arc::clone(&observer));
        }
    }

    pub fn action(&self, key: &str) -> Option<&Action> {
        self.actions.get(key)
    }

    pub fn action_keys(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    async fn check_settings(&self, input: &mut ExecuteInput) -> Result<(), DestinationError> {
        if let Some(settings) = &self.settings {
            settings.execute_step(input).await.map_err(DestinationError::Settings)?;
        }
        Ok(())
    }
}
