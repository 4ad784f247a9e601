//! Paced clicks and key presses against a target window.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{InputDriver, WindowDriver, WindowTarget};
use crate::clock::Clock;
use crate::config::InputConfig;
use crate::error::Result;
use crate::vision::Point;

/// Clicks in window client coordinates and waits a jittered delay after
/// every input so the game sees human-like pacing.
#[derive(Clone)]
pub struct InputService {
    window: Arc<dyn WindowDriver>,
    input: Arc<dyn InputDriver>,
    clock: Arc<dyn Clock>,
    click_delay_ms: u64,
    jitter_range_ms: u64,
}

impl InputService {
    pub fn new(
        window: Arc<dyn WindowDriver>,
        input: Arc<dyn InputDriver>,
        clock: Arc<dyn Clock>,
        config: &InputConfig,
    ) -> Self {
        Self {
            window,
            input,
            clock,
            click_delay_ms: config.click_delay_ms,
            jitter_range_ms: config.jitter_range_ms,
        }
    }

    /// Click a point in the target's client area, scaled by the account's
    /// display factor.
    ///
    /// # Errors
    ///
    /// Returns an error when the point cannot be mapped to the screen or
    /// the click cannot be injected.
    pub fn click(&self, target: &WindowTarget, client_point: Point) -> Result<()> {
        let scaled = client_point.scaled(target.scale_factor);
        let screen = self.window.client_to_screen(target.handle, scaled)?;
        debug!(
            "click at client ({}, {}) -> screen ({}, {})",
            scaled.x, scaled.y, screen.x, screen.y
        );
        self.click_screen(screen)
    }

    /// Click an absolute screen point.
    ///
    /// # Errors
    ///
    /// Returns an error when the click cannot be injected.
    pub fn click_screen(&self, screen_point: Point) -> Result<()> {
        self.input.click(screen_point)?;
        self.clock.sleep(self.jitter_delay());
        Ok(())
    }

    /// Press and release a virtual key.
    ///
    /// # Errors
    ///
    /// Returns an error when the key cannot be injected.
    pub fn send_key(&self, key_code: u16) -> Result<()> {
        self.input.send_key(key_code)?;
        self.clock.sleep(self.jitter_delay());
        Ok(())
    }

    /// Post-input delay: `click_delay ± jitter`, never negative.
    pub fn jitter_delay(&self) -> Duration {
        let base = i64::try_from(self.click_delay_ms).unwrap_or(i64::MAX);
        let jitter = i64::try_from(self.jitter_range_ms).unwrap_or(i64::MAX);
        let offset = if jitter == 0 {
            0
        } else {
            rand::thread_rng().gen_range(-jitter..=jitter)
        };
        let millis = base.saturating_add(offset).max(0);
        Duration::from_millis(millis.unsigned_abs())
    }
}
