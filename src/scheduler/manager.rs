//! Task scheduler: eligibility, priority selection and run-state persistence.
//!
//! The scheduler owns the task collection. Selection never mutates; every
//! mutation rewrites the whole collection to disk before returning.

use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::error::{AutomationError, Result};
use crate::scheduler::tasks::{CooldownUpdate, GameTask};
use crate::store;

/// How a recorded attempt left the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptRecord {
    /// Success recorded; failure streak cleared.
    Succeeded,
    /// Failure recorded; the task stays enabled.
    WillRetry {
        /// Failures so far.
        retry_count: u32,
        /// Failures that disable the task.
        max_retries: u32,
    },
    /// Failure recorded and the retry budget is spent; the task is disabled.
    Exhausted {
        /// Failures that disabled the task.
        max_retries: u32,
    },
    /// The task was removed while the attempt ran.
    Missing,
}

/// Ordered collection of tasks with their run-state.
pub struct TaskScheduler {
    /// Registered tasks, in insertion order.
    tasks: Vec<GameTask>,
    /// Path to the persisted collection (None = memory only).
    state_path: Option<PathBuf>,
}

impl TaskScheduler {
    /// Create an empty scheduler persisting to `state_path`.
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            tasks: Vec::new(),
            state_path: Some(state_path.into()),
        }
    }

    /// Create a scheduler that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            tasks: Vec::new(),
            state_path: None,
        }
    }

    /// Path of the persisted collection, if any.
    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    /// Replace the in-memory collection with the persisted one.
    ///
    /// Read or parse failures are logged and leave an empty collection.
    pub fn load_all(&mut self) {
        let Some(path) = &self.state_path else {
            return;
        };

        match store::load_collection::<GameTask>(path) {
            Ok(mut tasks) => {
                for task in &mut tasks {
                    task.normalize();
                }
                debug!("loaded {} tasks from {}", tasks.len(), path.display());
                self.tasks = tasks;
            }
            Err(e) => {
                warn!("cannot load tasks, starting empty: {e}");
                self.tasks = Vec::new();
            }
        }
    }

    /// Registered tasks in insertion order.
    pub fn tasks(&self) -> &[GameTask] {
        &self.tasks
    }

    /// Look up a task by id.
    pub fn get(&self, task_id: &str) -> Option<&GameTask> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Tasks ordered by due time, for display.
    pub fn by_next_run(&self) -> Vec<&GameTask> {
        let mut tasks: Vec<&GameTask> = self.tasks.iter().collect();
        tasks.sort_by_key(|t| t.next_run);
        tasks
    }

    /// The highest-priority enabled task due at `now`, earliest due first
    /// among equal priorities. Remaining ties go to insertion order.
    pub fn next_eligible(&self, now: DateTime<Utc>) -> Option<&GameTask> {
        self.tasks
            .iter()
            .filter(|t| t.is_eligible(now))
            .min_by_key(|t| (Reverse(t.priority), t.next_run))
    }

    /// Record a successful attempt and persist.
    pub fn record_success(
        &mut self,
        task_id: &str,
        now: DateTime<Utc>,
        reschedule: Option<CooldownUpdate>,
    ) -> AttemptRecord {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            warn!("task {task_id} vanished before its success could be recorded");
            return AttemptRecord::Missing;
        };
        task.mark_success(now, reschedule);
        self.save_state();
        AttemptRecord::Succeeded
    }

    /// Record a failed attempt and persist. Disables the task once its
    /// retry budget is spent.
    pub fn record_failure(&mut self, task_id: &str, now: DateTime<Utc>) -> AttemptRecord {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            warn!("task {task_id} vanished before its failure could be recorded");
            return AttemptRecord::Missing;
        };
        let record = if task.mark_failure(now) {
            AttemptRecord::Exhausted {
                max_retries: task.max_retries,
            }
        } else {
            AttemptRecord::WillRetry {
                retry_count: task.retry_count,
                max_retries: task.max_retries,
            }
        };
        self.save_state();
        record
    }

    /// Add a task. Ids must be unique.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] for a duplicate id or when the
    /// collection cannot be persisted.
    pub fn add(&mut self, mut task: GameTask) -> Result<()> {
        if self.get(&task.id).is_some() {
            return Err(AutomationError::Store(format!(
                "task {} already exists",
                task.id
            )));
        }
        task.normalize();
        self.tasks.push(task);
        self.persist()
    }

    /// Remove a task. Returns `false` when no task has that id.
    ///
    /// # Errors
    ///
    /// Returns an error when the collection cannot be persisted.
    pub fn remove(&mut self, task_id: &str) -> Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Replace a task in place, keeping its position. Returns `false` when
    /// no task has that id.
    ///
    /// # Errors
    ///
    /// Returns an error when the collection cannot be persisted.
    pub fn update(&mut self, mut task: GameTask) -> Result<bool> {
        let Some(existing) = self.tasks.iter_mut().find(|t| t.id == task.id) else {
            return Ok(false);
        };
        task.normalize();
        *existing = task;
        self.persist()?;
        Ok(true)
    }

    /// Enable or disable a task by hand. Returns `false` when not found.
    ///
    /// # Errors
    ///
    /// Returns an error when the collection cannot be persisted.
    pub fn set_enabled(&mut self, task_id: &str, enabled: bool) -> Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            return Ok(false);
        };
        task.set_enabled(enabled);
        self.persist()?;
        Ok(true)
    }

    /// Write the whole collection to disk.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] when the write fails.
    pub fn persist(&self) -> Result<()> {
        match &self.state_path {
            Some(path) => store::save_collection(path, &self.tasks),
            None => Ok(()),
        }
    }

    fn save_state(&self) {
        if let Err(e) = self.persist() {
            error!("cannot persist task state: {e}");
        }
    }
}
