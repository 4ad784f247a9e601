//! Task scheduling.
//!
//! Picks the next task to run by priority and due time, and records the
//! outcome of every attempt (retry counting, circuit breaking after
//! `max_retries` consecutive failures).

pub mod manager;
pub mod tasks;

pub use manager::{AttemptRecord, TaskScheduler};
pub use tasks::{CooldownUpdate, GameTask, TaskCategory, TaskPriority};
