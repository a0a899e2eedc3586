//! The Action orchestrator.
//!
//! An [`ActionDefinition`] is what a destination author declares: fields, a
//! perform callback, cached-field lookups and autocomplete resolvers. An
//! [`Action`] is that declaration compiled once into a fixed step pipeline and
//! reused for every run.

use std::{future::Future, sync::Arc, time::Duration};

use actionkit_types::{AutocompleteResponse, FieldDefinitions, JsonSchema, RequestOptions};
use actionkit_util::http::{HttpError, HttpTransport, RequestClient, ResponseChannel, ResponseObserver};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    cache::CacheStore,
    config::{DEFAULT_CACHE_MAX_KEYS, EngineConfig},
    context::{ExecuteField, ExecuteInput},
    error::{ActionError, ExecutionError},
    pipeline::Steps,
    schema::compile,
    step::{
        AutocompleteFn, CachedRequest, KeyFn, MapInput, PerformFn, PerformOutput, Request, RequestContext,
        RequestExtension, StepResult, Validate, ValueFn,
    },
};

/// Name of the terminal request step.
pub const PERFORM_STEP: &str = "perform";

/// One `cachedFields` entry: how to key, resolve and retain a lookup.
#[derive(Clone)]
pub struct CachedFieldDefinition {
    pub key: KeyFn,
    pub ttl: Duration,
    pub value: ValueFn,
    /// Also cache "not found" results.
    pub negative: bool,
}

impl CachedFieldDefinition {
    pub fn new<K, F, Fut>(key: K, ttl: Duration, value: F) -> Self
    where
        K: Fn(&ExecuteInput) -> String + Send + Sync + 'static,
        F: Fn(RequestClient, ExecuteInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        Self {
            key: Arc::new(key),
            ttl,
            value: Arc::new(value),
            negative: false,
        }
    }

    pub fn negative(mut self, negative: bool) -> Self {
        self.negative = negative;
        self
    }
}

/// An action as declared by a destination.
#[derive(Clone, Default)]
pub struct ActionDefinition {
    pub title: String,
    pub description: String,
    pub recommended: bool,
    /// Event subscription used when the action is enabled without one.
    pub default_subscription: Option<String>,
    pub hidden: bool,
    pub fields: Option<FieldDefinitions>,
    pub autocomplete_fields: IndexMap<String, AutocompleteFn>,
    pub cached_fields: IndexMap<String, CachedFieldDefinition>,
    pub perform: Option<PerformFn>,
}

impl ActionDefinition {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn recommended(mut self, recommended: bool) -> Self {
        self.recommended = recommended;
        self
    }

    pub fn default_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.default_subscription = Some(subscription.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn fields(mut self, fields: FieldDefinitions) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn perform<F, Fut>(mut self, perform: F) -> Self
    where
        F: Fn(RequestClient, ExecuteInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<PerformOutput>> + Send + 'static,
    {
        self.perform = Some(Arc::new(perform));
        self
    }

    pub fn autocomplete<F, Fut>(mut self, field: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(RequestClient, ExecuteInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<AutocompleteResponse>> + Send + 'static,
    {
        self.autocomplete_fields.insert(field.into(), Arc::new(resolver));
        self
    }

    pub fn cached_field(mut self, name: impl Into<String>, definition: CachedFieldDefinition) -> Self {
        self.cached_fields.insert(name.into(), definition);
        self
    }
}

/// Shared collaborators every action of a destination is built with.
#[derive(Clone)]
pub struct ActionRuntime {
    transport: Arc<dyn HttpTransport>,
    extend_request: Option<RequestExtension>,
    cache_max_keys: usize,
}

impl ActionRuntime {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            extend_request: None,
            cache_max_keys: DEFAULT_CACHE_MAX_KEYS,
        }
    }

    /// A runtime backed by the network transport described by `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, HttpError> {
        Ok(Self::new(config.transport()?).with_cache_max_keys(config.cache_max_keys))
    }

    pub fn with_extend_request<F>(mut self, extend: F) -> Self
    where
        F: Fn(&ExecuteInput) -> RequestOptions + Send + Sync + 'static,
    {
        self.extend_request = Some(Arc::new(extend));
        self
    }

    pub fn with_request_extension(mut self, extend: Option<RequestExtension>) -> Self {
        self.extend_request = extend;
        self
    }

    pub fn with_cache_max_keys(mut self, cache_max_keys: usize) -> Self {
        self.cache_max_keys = cache_max_keys;
        self
    }

    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(Arc::clone(&self.transport), self.extend_request.clone())
    }
}

/// A compiled, executable action.
pub struct Action {
    definition: ActionDefinition,
    schema: Option<JsonSchema>,
    steps: Steps,
    runtime: ActionRuntime,
    channel: ResponseChannel,
}

impl Action {
    /// Compiles `definition` into its step pipeline:
    /// map, validate (when fields exist), one cached request per cached
    /// field in declaration order, then perform.
    pub fn new(definition: ActionDefinition, runtime: ActionRuntime) -> Self {
        let channel = ResponseChannel::new();
        let schema = definition.fields.as_ref().map(compile);

        let mut steps = Steps::new();
        steps.push(MapInput);
        if let Some(schema) = &schema {
            steps.push(Validate::new(ExecuteField::Payload, schema.clone()));
        }
        for (name, cached) in &definition.cached_fields {
            let step = CachedRequest::new(
                name.as_str(),
                Arc::clone(&cached.key),
                Arc::clone(&cached.value),
                cached.negative,
                CacheStore::new(cached.ttl, runtime.cache_max_keys),
                runtime.request_context(),
            );
            step.channel().forward_to(&channel);
            steps.push(step);
        }
        if let Some(perform) = &definition.perform {
            let step = Request::new(PERFORM_STEP, runtime.request_context(), Arc::clone(perform));
            step.channel().forward_to(&channel);
            steps.push(step);
        }
        debug!(action = %definition.title, steps = ?steps.names(), "action compiled");

        Self {
            definition,
            schema,
            steps,
            runtime,
            channel,
        }
    }

    /// Runs the pipeline against `input`.
    ///
    /// On failure the error carries every outcome up to and including the
    /// failing step.
    pub async fn execute(&self, input: &mut ExecuteInput) -> Result<Vec<StepResult>, ExecutionError> {
        let run = self.steps.execute(input).await;
        match run.error {
            None => {
                info!(action = %self.definition.title, steps = run.results.len(), "action executed");
                Ok(run.results)
            }
            Some(error) => Err(ExecutionError {
                error,
                results: run.results,
            }),
        }
    }

    /// Runs the autocomplete resolver registered for `field`.
    ///
    /// Unregistered fields resolve to an empty response.
    pub async fn execute_autocomplete(
        &self,
        field: &str,
        input: &ExecuteInput,
    ) -> Result<AutocompleteResponse, ActionError> {
        let Some(resolver) = self.definition.autocomplete_fields.get(field) else {
            debug!(action = %self.definition.title, field, "no autocomplete resolver registered");
            return Ok(AutocompleteResponse::empty());
        };
        let step = format!("autocompleteFields.{field}");
        let context = self.runtime.request_context();
        context.channel().forward_to(&self.channel);
        let result = context.call(&step, resolver.as_ref(), input).await;
        result.map_err(|error| ActionError::call(step, error))
    }

    /// Receives every response observed by this action's request steps.
    pub fn subscribe(&self, observer: Arc<dyn ResponseObserver>) {
        self.channel.subscribe(observer);
    }

    pub fn channel(&self) -> &ResponseChannel {
        &self.channel
    }

    /// Compiled payload schema, when the action declares fields.
    pub fn schema(&self) -> Option<&JsonSchema> {
        self.schema.as_ref()
    }

    pub fn fields(&self) -> Option<&FieldDefinitions> {
        self.definition.fields.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.definition.title
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    pub fn is_recommended(&self) -> bool {
        self.definition.recommended
    }

    pub fn is_hidden(&self) -> bool {
        self.definition.hidden
    }

    pub fn default_subscription(&self) -> Option<&str> {
        self.definition.default_subscription.as_deref()
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.names()
    }

    pub fn autocomplete_fields(&self) -> impl Iterator<Item = &str> {
        self.definition.autocomplete_fields.keys().map(String::as_str)
    }
}
