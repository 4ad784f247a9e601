//! Game task definitions and their run-state.
//!
//! Defines [`GameTask`], its [`TaskPriority`] and [`TaskCategory`], and the
//! [`CooldownUpdate`] an executor hands back after reading an on-screen
//! timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::clock::add_duration;

/// Default consecutive failures before a task is disabled.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default wait used when the cooldown timer cannot be read (10 minutes).
pub const DEFAULT_FALLBACK_COOLDOWN_SECS: u64 = 600;

/// Selection priority. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Run only when nothing more important is due.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Always preferred over due lower-priority tasks.
    High,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}

/// What kind of in-game action a task performs; selects the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// Story/daily quest.
    Quest,
    /// Guild quest or donation.
    Guild,
    /// Timed gift box.
    Gift,
    /// Admin/management quest.
    Admin,
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quest => f.write_str("quest"),
            Self::Guild => f.write_str("guild"),
            Self::Gift => f.write_str("gift"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

/// Rescheduling decided by an executor from what it saw on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownUpdate {
    /// When the task becomes eligible again.
    pub next_run: DateTime<Utc>,
    /// Cooldown read from the screen, if any.
    pub cooldown: Option<Duration>,
    /// Whether the timer was unreadable and a fallback was used.
    pub needs_recheck: bool,
}

impl CooldownUpdate {
    /// A cooldown read from the screen, padded by `padding`.
    pub fn observed(now: DateTime<Utc>, cooldown: Duration, padding: Duration) -> Self {
        Self {
            next_run: add_duration(now, cooldown.saturating_add(padding)),
            cooldown: Some(cooldown),
            needs_recheck: false,
        }
    }

    /// The timer could not be read; retry after the task's fallback cooldown.
    pub fn fallback(now: DateTime<Utc>, task: &GameTask) -> Self {
        Self {
            next_run: add_duration(now, task.fallback_cooldown()),
            cooldown: None,
            needs_recheck: true,
        }
    }
}

/// A schedulable in-game action with priority, due time and retry state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameTask {
    /// Unique task identifier.
    pub id: String,
    /// Human-readable task name.
    pub name: String,
    /// Executor selector.
    pub category: TaskCategory,
    /// Selection priority.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Earliest time the task may run.
    #[serde(default = "Utc::now")]
    pub next_run: DateTime<Utc>,
    /// Time of the last attempt (epoch = never).
    #[serde(default = "never")]
    pub last_run: DateTime<Utc>,
    /// Whether the task is considered for selection.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Consecutive failures since the last success.
    #[serde(default)]
    pub retry_count: u32,
    /// Consecutive failures that disable the task.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Last cooldown read from the screen, in seconds.
    #[serde(default)]
    pub cooldown_secs: u64,
    /// Wait used when the cooldown cannot be read, in seconds.
    #[serde(default = "default_fallback_cooldown_secs")]
    pub fallback_cooldown_secs: u64,
    /// Delay before retrying after a failure, in seconds (0 = next iteration).
    #[serde(default)]
    pub retry_backoff_secs: u64,
    /// Set when the last reschedule used the fallback cooldown.
    #[serde(default)]
    pub needs_recheck: bool,
    /// Template images used by the executor, in click order.
    #[serde(default)]
    pub template_paths: Vec<PathBuf>,
}

fn never() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_fallback_cooldown_secs() -> u64 {
    DEFAULT_FALLBACK_COOLDOWN_SECS
}

impl GameTask {
    /// Create an enabled task, due immediately, with a fresh id.
    pub fn new(name: impl Into<String>, category: TaskCategory) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            category,
            priority: TaskPriority::default(),
            next_run: Utc::now(),
            last_run: never(),
            enabled: true,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            cooldown_secs: 0,
            fallback_cooldown_secs: DEFAULT_FALLBACK_COOLDOWN_SECS,
            retry_backoff_secs: 0,
            needs_recheck: false,
            template_paths: Vec::new(),
        }
    }

    /// Builder: set the priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: set the due time.
    pub fn with_next_run(mut self, next_run: DateTime<Utc>) -> Self {
        self.next_run = next_run;
        self
    }

    /// Builder: set the executor templates.
    pub fn with_templates(mut self, templates: Vec<PathBuf>) -> Self {
        self.template_paths = templates;
        self
    }

    /// Enabled and due at or before `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run <= now
    }

    /// Whether the task has ever been attempted.
    pub fn has_run(&self) -> bool {
        self.last_run > never()
    }

    /// Last observed cooldown.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Wait used when the cooldown cannot be read.
    pub fn fallback_cooldown(&self) -> Duration {
        Duration::from_secs(self.fallback_cooldown_secs)
    }

    /// Record a successful attempt.
    ///
    /// Applies the executor's reschedule when given; otherwise the task is
    /// due again after its last cooldown (or the fallback when none was
    /// ever observed).
    pub fn mark_success(&mut self, now: DateTime<Utc>, reschedule: Option<CooldownUpdate>) {
        self.last_run = now;
        self.retry_count = 0;

        match reschedule {
            Some(update) => {
                self.next_run = update.next_run;
                if let Some(cooldown) = update.cooldown {
                    self.cooldown_secs = cooldown.as_secs();
                }
                self.needs_recheck = update.needs_recheck;
            }
            None => {
                let wait = if self.cooldown_secs > 0 {
                    self.cooldown()
                } else {
                    self.fallback_cooldown()
                };
                self.next_run = add_duration(now, wait);
            }
        }
    }

    /// Record a failed attempt. Returns `true` when the retry budget is
    /// exhausted and the task has been disabled.
    pub fn mark_failure(&mut self, now: DateTime<Utc>) -> bool {
        self.last_run = now;
        self.retry_count = self.retry_count.saturating_add(1);

        if self.retry_backoff_secs > 0 {
            self.next_run = add_duration(now, Duration::from_secs(self.retry_backoff_secs));
        }

        if self.retry_count >= self.max_retries {
            self.enabled = false;
            return true;
        }
        false
    }

    /// Enable or disable by hand. Enabling clears the failure streak.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.retry_count = 0;
        }
    }

    /// Bring a record edited outside the scheduler back within its invariants.
    pub(crate) fn normalize(&mut self) {
        self.max_retries = self.max_retries.max(1);
        if self.enabled && self.retry_count >= self.max_retries {
            self.enabled = false;
        }
    }
}
