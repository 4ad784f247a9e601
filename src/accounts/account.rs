//! Account definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A game session bound to one emulator window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Title of the emulator window driving this account.
    pub window_title: String,
    /// Display scale applied to client coordinates before clicking.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Whether the account takes part in rotation.
    #[serde(default = "default_true")]
    pub active: bool,
    /// When an attempt last began on this account (epoch = never).
    #[serde(default = "never")]
    pub last_run: DateTime<Utc>,
}

fn default_scale_factor() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn never() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Account {
    /// Create an active, never-used account with a fresh id.
    pub fn new(name: impl Into<String>, window_title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            window_title: window_title.into(),
            scale_factor: default_scale_factor(),
            active: true,
            last_run: never(),
        }
    }

    /// Builder: set the display scale factor.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Whether the account has ever been used.
    pub fn has_run(&self) -> bool {
        self.last_run > never()
    }

    pub(crate) fn normalize(&mut self) {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            self.scale_factor = default_scale_factor();
        }
    }
}
