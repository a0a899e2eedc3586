use std::sync::Arc;

use actionkit_util::http::{HttpError, ResponseChannel};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{CACHE_HIT, CACHE_MISS, RequestContext, RequestFn, Step, StepKind, StepOutput};
use crate::{
    cache::{CacheLookup, CacheStore},
    context::ExecuteInput,
    error::ActionError,
};

/// Derives the cache key for a run.
pub type KeyFn = Arc<dyn Fn(&ExecuteInput) -> String + Send + Sync>;

/// Resolves a cached field on a miss. `Ok(None)` means "absent".
pub type ValueFn = Arc<dyn RequestFn<Option<Value>>>;

/// Resolves one cached field and stores it under `cached_fields[as_field]`.
///
/// Absent results are cached only when `negative` is set. A resolver failing
/// with a 404 counts as absent; any other failure fails the step.
pub struct CachedRequest {
    as_field: String,
    key: KeyFn,
    value: ValueFn,
    negative: bool,
    cache: CacheStore,
    context: RequestContext,
}

impl CachedRequest {
    pub fn new(
        as_field: impl Into<String>,
        key: KeyFn,
        value: ValueFn,
        negative: bool,
        cache: CacheStore,
        context: RequestContext,
    ) -> Self {
        Self {
            as_field: as_field.into(),
            key,
            value,
            negative,
            cache,
            context,
        }
    }

    pub fn as_field(&self) -> &str {
        &self.as_field
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn channel(&self) -> &ResponseChannel {
        self.context.channel()
    }

    async fn resolve(&self, input: &ExecuteInput) -> Result<Option<Value>, ActionError> {
        let step = self.name();
        let result = self.context.call(&step, self.value.as_ref(), input).await;
        match result {
            Ok(value) => Ok(value.filter(|value| !value.is_null())),
            Err(error) if HttpError::is_not_found_error(&error) => {
                debug!(step = %step, "resolver answered 404; treating value as absent");
                Ok(None)
            }
            Err(error) => Err(ActionError::call(step, error)),
        }
    }
}

#[async_trait]
impl Step for CachedRequest {
    fn kind(&self) -> StepKind {
        StepKind::CachedRequest
    }

    fn name(&self) -> String {
        format!("cachedFields.{}", self.as_field)
    }

    async fn execute_step(&self, input: &mut ExecuteInput) -> Result<StepOutput, ActionError> {
        let key = (self.key)(input);
        if let CacheLookup::Hit(value) = self.cache.get(&key) {
            debug!(field = %self.as_field, key = %key, present = value.is_some(), "cache hit");
            input.cached_fields.insert(self.as_field.clone(), value.unwrap_or(Value::Null));
            return Ok(StepOutput::label(CACHE_HIT));
        }

        let value = self.resolve(input).await?;
        if value.is_some() || self.negative {
            self.cache.set(key.clone(), value.clone());
        }
        debug!(field = %self.as_field, key = %key, present = value.is_some(), "cache miss");
        let value = value.unwrap_or(Value::Null);
        input.cached_fields.insert(self.as_field.clone(), value.clone());
        Ok(StepOutput::label(CACHE_MISS).with_value(value))
    }
}
