//! The engine loop.
//!
//! One iteration walks `Idle -> SelectTask -> SelectAccount -> AcquireWindow
//! -> CaptureFrame -> ResolvePopups -> Dispatch -> UpdateState`. The worker
//! thread repeats iterations until told to stop, waiting between them when
//! idle or after an error.

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::events::EventSink;
use super::stores::{EngineCommand, Stores};
use crate::accounts::Account;
use crate::clock::Clock;
use crate::error::Result;
use crate::executor::{ExecutionContext, ExecutionOutcome, ExecutorRegistry};
use crate::platform::{InputService, WindowDriver, WindowTarget};
use crate::popup::{PopupOutcome, PopupResolver};
use crate::scheduler::{AttemptRecord, CooldownUpdate, GameTask};
use crate::vision::{Frame, Vision};

/// Messages from the control side to the worker thread.
pub(crate) enum Control {
    Stop,
    Command(EngineCommand),
}

/// Why an iteration did not attempt anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    /// Every task is disabled or not yet due.
    NoEligibleTask,
    /// A task is due but no account is active.
    NoActiveAccount,
}

/// What one iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// Nothing was attempted.
    Idle(IdleReason),
    /// One task was attempted and its outcome recorded.
    Attempted { task_name: String, success: bool },
}

/// Loop timing and debug options.
#[derive(Debug, Clone)]
pub(crate) struct LoopSettings {
    pub idle_poll: Duration,
    pub error_cooldown: Duration,
    pub settle_delay: Duration,
    pub debug_screenshots: Option<PathBuf>,
}

/// Everything an iteration needs except the collections it mutates.
pub(crate) struct Runner {
    pub settings: LoopSettings,
    pub window: Arc<dyn WindowDriver>,
    pub clock: Arc<dyn Clock>,
    pub vision: Vision,
    pub input: InputService,
    pub popups: PopupResolver,
    pub executors: ExecutorRegistry,
    pub events: EventSink,
}

/// How the attempt part of an iteration ended.
enum Attempt {
    Succeeded(Option<CooldownUpdate>),
    Failed(String),
}

impl Runner {
    /// Run one iteration against `stores`.
    ///
    /// Attempt failures are recorded on the task. An `Err` means the
    /// attempt hit an unexpected error; it has already been recorded as a
    /// failure and the caller should back off.
    pub fn run_iteration(&self, stores: &mut Stores) -> Result<Iteration> {
        let now = self.clock.now();

        let Some(task) = stores.scheduler.next_eligible(now).cloned() else {
            return Ok(Iteration::Idle(IdleReason::NoEligibleTask));
        };
        let Some(account) = stores.rotator.next_active().cloned() else {
            return Ok(Iteration::Idle(IdleReason::NoActiveAccount));
        };
        stores.rotator.mark_used(&account.id, now);

        self.events.info(format!(
            "executing task: {} for account: {}",
            task.name, account.name
        ));

        let (attempt, unexpected) = match self.attempt(&task, &account) {
            Ok(attempt) => (attempt, None),
            Err(e) => (Attempt::Failed(e.to_string()), Some(e)),
        };

        let finished = self.clock.now();
        let success = match attempt {
            Attempt::Succeeded(reschedule) => {
                stores.scheduler.record_success(&task.id, finished, reschedule);
                true
            }
            Attempt::Failed(reason) => {
                self.events
                    .warn(format!("task {} failed: {reason}", task.name));
                if let AttemptRecord::Exhausted { max_retries } =
                    stores.scheduler.record_failure(&task.id, finished)
                {
                    self.events.warn(format!(
                        "{} failed after {max_retries} attempts and has been disabled",
                        task.name
                    ));
                }
                false
            }
        };
        self.events.task_completed(&task.name, success);

        match unexpected {
            Some(e) => Err(e),
            None => Ok(Iteration::Attempted {
                task_name: task.name,
                success,
            }),
        }
    }

    /// AcquireWindow through Dispatch.
    fn attempt(&self, task: &GameTask, account: &Account) -> Result<Attempt> {
        let Some(handle) = self.window.find_window(&account.window_title) else {
            return Ok(Attempt::Failed(format!(
                "window not found: {}",
                account.window_title
            )));
        };
        if !self.window.bring_to_front(handle) {
            return Ok(Attempt::Failed(format!(
                "failed to bring window to front: {}",
                account.window_title
            )));
        }
        let target = WindowTarget {
            handle,
            scale_factor: account.scale_factor,
        };

        self.clock.sleep(self.settings.settle_delay);
        let frame = self.window.capture(handle)?;

        let frame = match self.popups.drain(&target, frame)? {
            PopupOutcome::Clear { frame, .. } => frame,
            PopupOutcome::Stuck { frame, .. } => {
                self.save_debug_screenshot(&frame, "popup_fail");
                return Ok(Attempt::Failed("failed to handle popups".to_owned()));
            }
        };

        let Some(executor) = self.executors.get(task.category) else {
            return Ok(Attempt::Failed(format!(
                "unknown task category: {}",
                task.category
            )));
        };

        let mut ctx = ExecutionContext {
            task,
            account,
            target,
            frame,
            vision: &self.vision,
            input: &self.input,
            window: self.window.as_ref(),
            clock: self.clock.as_ref(),
            settle_delay: self.settings.settle_delay,
        };
        Ok(match executor.execute(&mut ctx)? {
            ExecutionOutcome::Completed { reschedule } => Attempt::Succeeded(reschedule),
            ExecutionOutcome::Failed { reason } => {
                Attempt::Failed(format!("{}: {reason}", executor.name()))
            }
        })
    }

    fn save_debug_screenshot(&self, frame: &Frame, context: &str) {
        let Some(root) = &self.settings.debug_screenshots else {
            return;
        };
        let local = self.clock.now().with_timezone(&chrono::Local);
        let path = root
            .join(local.format("%Y%m%d").to_string())
            .join(format!("{}_{context}.png", local.format("%H%M%S")));
        match frame.save_png(&path) {
            Ok(()) => self
                .events
                .info(format!("saved debug screenshot {}", path.display())),
            Err(e) => self
                .events
                .warn(format!("failed to save debug screenshot: {e}")),
        }
    }

    pub fn apply(&self, stores: &mut Stores, command: EngineCommand) {
        let description = command.to_string();
        match stores.apply(command) {
            Ok(true) => self.events.info(format!("applied: {description}")),
            Ok(false) => self
                .events
                .warn(format!("{description}: no such record")),
            Err(e) => self.events.error(format!("{description} failed: {e}")),
        }
    }
}

/// Worker thread body. Returns the stores once stopped.
pub(crate) fn run_worker(runner: Arc<Runner>, stores: Stores, control_rx: Receiver<Control>) -> Stores {
    let mut stores = stores;
    loop {
        loop {
            match control_rx.try_recv() {
                Ok(Control::Command(command)) => runner.apply(&mut stores, command),
                Ok(Control::Stop) | Err(TryRecvError::Disconnected) => return stores,
                Err(TryRecvError::Empty) => break,
            }
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| runner.run_iteration(&mut stores)));
        let wait = match result {
            Ok(Ok(Iteration::Attempted { .. })) => None,
            Ok(Ok(Iteration::Idle(_))) => Some(runner.settings.idle_poll),
            Ok(Err(e)) => {
                runner.events.error(format!("engine error: {e}"));
                Some(runner.settings.error_cooldown)
            }
            Err(payload) => {
                runner
                    .events
                    .error(format!("engine panic: {}", panic_message(payload.as_ref())));
                Some(runner.settings.error_cooldown)
            }
        };

        if let Some(duration) = wait
            && !wait_for_control(&runner, &mut stores, &control_rx, duration)
        {
            return stores;
        }
    }
}

/// Block for up to `duration`. A command cuts the wait short so its effect
/// is seen on the next iteration. Returns `false` when the worker must stop.
fn wait_for_control(
    runner: &Runner,
    stores: &mut Stores,
    control_rx: &Receiver<Control>,
    duration: Duration,
) -> bool {
    match control_rx.recv_timeout(duration) {
        Ok(Control::Command(command)) => {
            runner.apply(stores, command);
            true
        }
        Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => false,
        Err(RecvTimeoutError::Timeout) => true,
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
