//! Click a task's templates in order: the generic quest flow.

use tracing::debug;

use super::{ExecutionContext, ExecutionOutcome, TaskExecutor};
use crate::error::Result;

/// Clicks each of the task's `template_paths` in turn, recapturing the
/// window between steps. Any template that cannot be found fails the
/// attempt.
pub struct TemplateSequenceExecutor;

impl TaskExecutor for TemplateSequenceExecutor {
    fn name(&self) -> &'static str {
        "template-sequence"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<ExecutionOutcome> {
        let task = ctx.task;
        if task.template_paths.is_empty() {
            return Ok(ExecutionOutcome::failed(format!(
                "task {} has no templates configured",
                task.name
            )));
        }

        for (step, template) in task.template_paths.iter().enumerate() {
            let Some(point) = ctx.vision.find(&ctx.frame, template) else {
                return Ok(ExecutionOutcome::failed(format!(
                    "step {} template {} not found",
                    step + 1,
                    template.display()
                )));
            };
            debug!("{} step {}: {}", task.name, step + 1, template.display());
            ctx.click(point)?;
            ctx.recapture()?;
        }

        Ok(ExecutionOutcome::Completed { reschedule: None })
    }
}
