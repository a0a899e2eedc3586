use async_trait::async_trait;

use super::{MAP_COMPLETED, Step, StepKind, StepOutput};
use crate::{context::ExecuteInput, error::ActionError, mapping::transform};

/// Applies the context's mapping, if any, replacing the payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapInput;

#[async_trait]
impl Step for MapInput {
    fn kind(&self) -> StepKind {
        StepKind::MapInput
    }

    async fn execute_step(&self, input: &mut ExecuteInput) -> Result<StepOutput, ActionError> {
        if let Some(mapping) = &input.mapping {
            input.payload = transform(mapping, &input.payload)?;
        }
        Ok(StepOutput::label(MAP_COMPLETED))
    }
}
