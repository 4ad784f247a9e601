//! Category-specific task logic.
//!
//! The engine hands each attempt to the [`TaskExecutor`] registered for the
//! task's category, after popups have been cleared.

mod gift;
mod sequence;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::accounts::Account;
use crate::clock::Clock;
use crate::config::AutomationConfig;
use crate::error::Result;
use crate::platform::{InputService, WindowDriver, WindowTarget};
use crate::scheduler::{CooldownUpdate, GameTask, TaskCategory};
use crate::vision::{Frame, Point, Vision};

pub use gift::GiftExecutor;
pub use sequence::TemplateSequenceExecutor;

/// Everything an executor may touch during one attempt.
pub struct ExecutionContext<'a> {
    pub task: &'a GameTask,
    pub account: &'a Account,
    pub target: WindowTarget,
    /// Latest capture of the window, popups already dismissed.
    pub frame: Frame,
    pub vision: &'a Vision,
    pub input: &'a InputService,
    pub window: &'a dyn WindowDriver,
    pub clock: &'a dyn Clock,
    /// Wait after a click before the screen is captured again.
    pub settle_delay: Duration,
}

impl ExecutionContext<'_> {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Click a client-area point on the target window.
    ///
    /// # Errors
    ///
    /// Returns an error when the input cannot be delivered.
    pub fn click(&self, point: Point) -> Result<()> {
        self.input.click(&self.target, point)
    }

    /// Wait for the settle delay, then replace `frame` with a fresh capture.
    ///
    /// # Errors
    ///
    /// Returns an error when the window cannot be captured.
    pub fn recapture(&mut self) -> Result<&Frame> {
        self.clock.sleep(self.settle_delay);
        self.frame = self.window.capture(self.target.handle)?;
        Ok(&self.frame)
    }
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The action was performed. `reschedule` carries the next due time
    /// when the executor read one from the screen.
    Completed { reschedule: Option<CooldownUpdate> },
    /// The screen did not look as expected.
    Failed { reason: String },
}

impl ExecutionOutcome {
    /// Failed attempt with a human-readable `reason`.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Performs the in-game action for one task category.
pub trait TaskExecutor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Run one attempt.
    ///
    /// # Errors
    ///
    /// Errors are treated as a failed attempt by the engine.
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<ExecutionOutcome>;
}

/// Category to executor dispatch table.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<TaskCategory, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gift opens gift boxes; Admin and Guild click their templates in
    /// order. Quest has no built-in executor.
    pub fn with_defaults(config: &AutomationConfig) -> Self {
        let mut registry = Self::new();
        let sequence: Arc<dyn TaskExecutor> = Arc::new(TemplateSequenceExecutor);
        registry.register(
            TaskCategory::Gift,
            Arc::new(GiftExecutor::new(config.gift.clone())),
        );
        registry.register(TaskCategory::Admin, sequence.clone());
        registry.register(TaskCategory::Guild, sequence);
        registry
    }

    /// Register `executor` for `category`, replacing any previous one.
    pub fn register(&mut self, category: TaskCategory, executor: Arc<dyn TaskExecutor>) {
        self.executors.insert(category, executor);
    }

    /// Executor registered for `category`, if any.
    pub fn get(&self, category: TaskCategory) -> Option<&Arc<dyn TaskExecutor>> {
        self.executors.get(&category)
    }
}
