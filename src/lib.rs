//! Autogame: scheduled automation of emulated game sessions.
//!
//! The crate runs predefined in-game actions ("tasks") against one or more
//! emulator windows, rotating through accounts.
//!
//! # Architecture
//!
//! A single worker thread runs the engine loop:
//! scheduler → account rotator → window → capture → popup resolver →
//! task executor → run-state update.
//!
//! - **Scheduler**: picks the highest-priority due task, counts failures and
//!   disables a task after `max_retries` consecutive failures
//! - **Account rotator**: least-recently-used active account
//! - **Popup resolver**: dismisses modal overlays until the screen stops
//!   showing them or stops changing
//! - **Executors**: per-category game logic (gift boxes, template sequences)
//!
//! Window capture, input injection, template matching and text recognition
//! are external collaborators behind the traits in [`platform`] and
//! [`vision`].

pub mod accounts;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod platform;
pub mod popup;
pub mod scheduler;
pub mod store;
pub mod vision;

#[cfg(test)]
pub(crate) mod test_utils;

pub use accounts::{Account, AccountRotator};
pub use config::AutomationConfig;
pub use engine::{Backends, CommandStatus, Engine, EngineCommand, EngineEvent, Stores};
pub use error::{AutomationError, Result};
pub use scheduler::{GameTask, TaskCategory, TaskPriority, TaskScheduler};
