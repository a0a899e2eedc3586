use actionkit_types::JsonSchema;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Step, StepKind, StepOutput, VALIDATE_COMPLETED};
use crate::{
    context::{ExecuteField, ExecuteInput},
    error::ActionError,
    validate::{SchemaError, SchemaValidator, validate},
};

/// Coerces and checks one part of the context against a compiled schema.
///
/// The validator is built once, up front. A schema that cannot be built fails
/// every run of the step with [`ActionError::Schema`].
#[derive(Debug, Clone)]
pub struct Validate {
    field: ExecuteField,
    schema: JsonSchema,
    validator: Result<SchemaValidator, SchemaError>,
}

impl Validate {
    pub fn new(field: ExecuteField, schema: JsonSchema) -> Self {
        let validator = SchemaValidator::new(schema.clone());
        if let Err(error) = &validator {
            warn!(field = %field, error = %error, "schema rejected by validator");
        }
        Self { field, schema, validator }
    }

    pub fn schema(&self) -> &JsonSchema {
        &self.schema
    }
}

#[async_trait]
impl Step for Validate {
    fn kind(&self) -> StepKind {
        StepKind::Validate
    }

    fn name(&self) -> String {
        format!("validate {}", self.field)
    }

    async fn execute_step(&self, input: &mut ExecuteInput) -> Result<StepOutput, ActionError> {
        let validator = self.validator.as_ref().map_err(|error| ActionError::Schema(error.clone()))?;
        validate(validator, input.field_mut(self.field)).map_err(|errors| {
            debug!(field = %self.field, error_count = errors.len(), "validation failed");
            ActionError::Validation(errors)
        })?;
        Ok(StepOutput::label(VALIDATE_COMPLETED))
    }
}
