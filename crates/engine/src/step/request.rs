use std::{future::Future, sync::Arc, time::Instant};

use actionkit_types::{AutocompleteResponse, HttpResponse, RequestOptions};
use actionkit_util::http::{HttpTransport, RequestClient, ResponseChannel};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{REQUEST_COMPLETED, REQUEST_NO_OP, Step, StepKind, StepOutput};
use crate::{context::ExecuteInput, error::ActionError};

/// An author callback that issues calls through a [`RequestClient`].
///
/// Implemented for every `Fn(RequestClient, ExecuteInput) -> impl Future`, so
/// plain async closures can be registered directly.
#[async_trait]
pub trait RequestFn<T>: Send + Sync {
    async fn call(&self, request: RequestClient, input: ExecuteInput) -> anyhow::Result<T>;
}

#[async_trait]
impl<T, F, Fut> RequestFn<T> for F
where
    F: Fn(RequestClient, ExecuteInput) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    async fn call(&self, request: RequestClient, input: ExecuteInput) -> anyhow::Result<T> {
        (self)(request, input).await
    }
}

pub type PerformFn = Arc<dyn RequestFn<PerformOutput>>;
pub type AutocompleteFn = Arc<dyn RequestFn<AutocompleteResponse>>;

/// Destination-level hook producing default call options for a run.
pub type RequestExtension = Arc<dyn Fn(&ExecuteInput) -> RequestOptions + Send + Sync>;

/// What a perform callback returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PerformOutput {
    /// Nothing to report; the step succeeds as a no-op.
    #[default]
    None,
    /// A response whose body becomes the step value.
    Response(HttpResponse),
    Json(Value),
}

impl From<()> for PerformOutput {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<HttpResponse> for PerformOutput {
    fn from(response: HttpResponse) -> Self {
        Self::Response(response)
    }
}

impl From<Value> for PerformOutput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Builds per-run request clients for one step.
///
/// Applies the request extension to the run's context and publishes every
/// completed call on the step's channel.
#[derive(Clone)]
pub struct RequestContext {
    transport: Arc<dyn HttpTransport>,
    extend_request: Option<RequestExtension>,
    channel: ResponseChannel,
}

impl RequestContext {
    pub fn new(transport: Arc<dyn HttpTransport>, extend_request: Option<RequestExtension>) -> Self {
        Self {
            transport,
            extend_request,
            channel: ResponseChannel::new(),
        }
    }

    pub fn channel(&self) -> &ResponseChannel {
        &self.channel
    }

    pub fn client(&self, input: &ExecuteInput) -> RequestClient {
        let defaults = self.extend_request.as_ref().map(|extend| extend(input)).unwrap_or_default();
        RequestClient::new(Arc::clone(&self.transport), defaults).with_channel(self.channel.clone())
    }

    /// Runs `callback` with a fresh client and a snapshot of the context.
    pub async fn call<T>(&self, step: &str, callback: &dyn RequestFn<T>, input: &ExecuteInput) -> anyhow::Result<T> {
        let start = Instant::now();
        let result = callback.call(self.client(input), input.clone()).await;
        debug!(
            step,
            ok = result.is_ok(),
            duration_ms = start.elapsed().as_millis(),
            "request callback finished"
        );
        result
    }
}

/// Runs the action's perform callback.
pub struct Request {
    name: String,
    context: RequestContext,
    perform: PerformFn,
}

impl Request {
    pub fn new(name: impl Into<String>, context: RequestContext, perform: PerformFn) -> Self {
        Self {
            name: name.into(),
            context,
            perform,
        }
    }

    pub fn channel(&self) -> &ResponseChannel {
        self.context.channel()
    }
}

#[async_trait]
impl Step for Request {
    fn kind(&self) -> StepKind {
        StepKind::Request
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn execute_step(&self, input: &mut ExecuteInput) -> Result<StepOutput, ActionError> {
        let output = self
            .context
            .call(&self.name, self.perform.as_ref(), input)
            .await
            .map_err(|error| ActionError::call(&self.name, error))?;
        Ok(match output {
            PerformOutput::None => StepOutput::label(REQUEST_NO_OP),
            PerformOutput::Response(response) => StepOutput::label(REQUEST_COMPLETED).with_value(response.body),
            PerformOutput::Json(value) => StepOutput::label(REQUEST_COMPLETED).with_value(value),
        })
    }
}
