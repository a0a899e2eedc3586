//! Ordered, fail-fast step execution.

use std::time::Instant;

use tracing::{debug, warn};

use crate::{
    context::ExecuteInput,
    error::ActionError,
    step::{Step, StepResult},
};

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Results of the steps that ran, in order. A failing step is last.
    pub results: Vec<StepResult>,
    pub error: Option<ActionError>,
}

impl PipelineRun {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// An ordered list of steps, fixed once the owning action is built.
#[derive(Default)]
pub struct Steps {
    steps: Vec<Box<dyn Step>>,
}

impl Steps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: impl Step + 'static) {
        self.steps.push(Box::new(step));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Runs every step in order against `input`, stopping at the first failure.
    pub async fn execute(&self, input: &mut ExecuteInput) -> PipelineRun {
        let mut results = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let step = step.as_ref();
            let start = Instant::now();
            match step.execute_step(input).await {
                Ok(output) => {
                    debug!(
                        step = %step.name(),
                        kind = %step.kind(),
                        output = %output.label,
                        duration_ms = start.elapsed().as_millis(),
                        "step completed"
                    );
                    results.push(StepResult::succeeded(step, output));
                }
                Err(error) => {
                    warn!(
                        step = %step.name(),
                        kind = %step.kind(),
                        duration_ms = start.elapsed().as_millis(),
                        error = %error,
                        "step failed"
                    );
                    results.push(StepResult::failed(step, &error));
                    return PipelineRun {
                        results,
                        error: Some(error),
                    };
                }
            }
        }
        PipelineRun { results, error: None }
    }
}
