//! Timed gift box: open it, then read when the next one is ready.

use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

use super::{ExecutionContext, ExecutionOutcome, TaskExecutor};
use crate::config::GiftConfig;
use crate::error::Result;
use crate::scheduler::CooldownUpdate;
use crate::vision::Point;

/// Opens the timed gift box and reschedules from the countdown shown
/// afterwards.
pub struct GiftExecutor {
    config: GiftConfig,
}

impl GiftExecutor {
    /// Executor using the templates and timer layout in `config`.
    pub fn new(config: GiftConfig) -> Self {
        Self { config }
    }

    fn padding(&self) -> Duration {
        let (min, max) = (self.config.padding_min_secs, self.config.padding_max_secs);
        let secs = if max > min {
            rand::thread_rng().gen_range(min..max)
        } else {
            min
        };
        Duration::from_secs(secs)
    }
}

impl TaskExecutor for GiftExecutor {
    fn name(&self) -> &'static str {
        "gift"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<ExecutionOutcome> {
        let Some(gift_box) = ctx.vision.find(&ctx.frame, &self.config.gift_box) else {
            return Ok(ExecutionOutcome::failed("gift box not found"));
        };
        ctx.click(gift_box)?;
        ctx.recapture()?;

        let Some(open_button) = ctx.vision.find(&ctx.frame, &self.config.open_button) else {
            return Ok(ExecutionOutcome::failed("open button not found"));
        };
        ctx.click(open_button)?;
        ctx.recapture()?;

        let Some(icon) = ctx.vision.find(&ctx.frame, &self.config.cooldown_icon) else {
            debug!("no cooldown icon after opening gift for {}", ctx.task.name);
            return Ok(ExecutionOutcome::Completed { reschedule: None });
        };

        let cooldown = ctx.vision.read_cooldown(
            &ctx.frame,
            icon,
            Point::new(self.config.cooldown_offset_x, self.config.cooldown_offset_y),
            self.config.cooldown_width,
            self.config.cooldown_height,
        );

        let now = ctx.now();
        let update = if cooldown.is_zero() {
            info!(
                "cannot read gift cooldown for {}, retrying in {}s",
                ctx.task.name, ctx.task.fallback_cooldown_secs
            );
            CooldownUpdate::fallback(now, ctx.task)
        } else {
            CooldownUpdate::observed(now, cooldown, self.padding())
        };
        Ok(ExecutionOutcome::Completed {
            reschedule: Some(update),
        })
    }
}
