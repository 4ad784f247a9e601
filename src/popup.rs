//! Popup convergence: dismiss transient dialogs until the screen is stable.
//!
//! Each pass scans the dismiss templates in order and clicks the first one
//! found. A click that changes the frame is progress and costs nothing; a
//! click that leaves the frame unchanged counts towards `max_attempts`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::PopupConfig;
use crate::error::Result;
use crate::platform::{InputService, WindowDriver, WindowTarget};
use crate::vision::{Frame, Point, Vision};

/// Cheap perceptual fingerprint: frame size plus a diagonal pixel sample.
///
/// Visually different frames can collide; this is a stuck detector, not
/// an equality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSignature(u64);

impl FrameSignature {
    /// Signature of `frame` using `samples` diagonal pixels.
    pub fn of(frame: &Frame, samples: u32) -> Self {
        let mut hasher = DefaultHasher::new();
        let (width, height) = (frame.width(), frame.height());
        width.hash(&mut hasher);
        height.hash(&mut hasher);

        let n = u64::from(samples.max(1));
        for i in 0..n {
            let x = (i * u64::from(width) / n) as u32;
            let y = (i * u64::from(height) / n) as u32;
            if let Some(rgba) = frame.pixel(x, y) {
                rgba.hash(&mut hasher);
            }
        }
        Self(hasher.finish())
    }
}

/// Result of a drain.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupOutcome {
    /// No dismiss template is visible on `frame`.
    Clear { frame: Frame, dismissed: u32 },
    /// Gave up: either `attempts` clicks had no visible effect or the
    /// dismissal cap was reached.
    Stuck {
        attempts: u32,
        dismissed: u32,
        frame: Frame,
    },
}

impl PopupOutcome {
    /// Whether the screen ended free of popups.
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Clear { .. })
    }

    /// The last captured frame.
    pub fn frame(&self) -> &Frame {
        match self {
            Self::Clear { frame, .. } | Self::Stuck { frame, .. } => frame,
        }
    }
}

/// Tuning for [`PopupResolver`].
#[derive(Debug, Clone)]
pub struct PopupSettings {
    /// Dismiss templates in scan order.
    pub templates: Vec<PathBuf>,
    /// Clicks without visible effect before giving up.
    pub max_attempts: u32,
    /// Wait after every dismiss click.
    pub base_delay: Duration,
    /// Extra wait per click already counted as stuck.
    pub per_attempt_delay: Duration,
    /// Pixels sampled for [`FrameSignature`].
    pub signature_samples: u32,
    /// Cap on dismiss clicks in one drain.
    pub max_dismissals: u32,
}

impl From<&PopupConfig> for PopupSettings {
    fn from(config: &PopupConfig) -> Self {
        Self {
            templates: config.templates.clone(),
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            per_attempt_delay: Duration::from_millis(config.per_attempt_delay_ms),
            signature_samples: config.signature_samples,
            max_dismissals: config.max_dismissals.max(1),
        }
    }
}

/// Clears modal popups from a window before task logic runs.
pub struct PopupResolver {
    settings: PopupSettings,
    vision: Vision,
    input: InputService,
    window: Arc<dyn WindowDriver>,
    clock: Arc<dyn Clock>,
}

impl PopupResolver {
    pub fn new(
        settings: PopupSettings,
        vision: Vision,
        input: InputService,
        window: Arc<dyn WindowDriver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            vision,
            input,
            window,
            clock,
        }
    }

    /// Dismiss popups on `target` starting from `frame`.
    ///
    /// # Errors
    ///
    /// Returns an error when a click or a recapture fails.
    pub fn drain(&self, target: &WindowTarget, frame: Frame) -> Result<PopupOutcome> {
        let mut frame = frame;
        let mut baseline = FrameSignature::of(&frame, self.settings.signature_samples);
        let mut stuck = 0u32;
        let mut dismissed = 0u32;

        loop {
            let Some((template, point)) = self.first_match(&frame) else {
                if dismissed > 0 {
                    debug!("popups cleared after {dismissed} dismissals");
                }
                return Ok(PopupOutcome::Clear { frame, dismissed });
            };

            if stuck >= self.settings.max_attempts || dismissed >= self.settings.max_dismissals {
                warn!(
                    "popup {} still showing after {dismissed} dismissals ({stuck} without effect)",
                    template.display()
                );
                return Ok(PopupOutcome::Stuck {
                    attempts: stuck,
                    dismissed,
                    frame,
                });
            }

            debug!(
                "dismissing popup {} at ({}, {})",
                template.display(),
                point.x,
                point.y
            );
            self.input.click(target, point)?;
            dismissed += 1;

            let extra = self.settings.per_attempt_delay.saturating_mul(stuck);
            self.clock
                .sleep(self.settings.base_delay.saturating_add(extra));

            frame = self.window.capture(target.handle)?;
            let signature = FrameSignature::of(&frame, self.settings.signature_samples);
            if signature == baseline {
                stuck += 1;
            } else {
                baseline = signature;
            }
        }
    }

    fn first_match(&self, frame: &Frame) -> Option<(&PathBuf, Point)> {
        self.settings
            .templates
            .iter()
            .find_map(|t| self.vision.find(frame, t).map(|p| (t, p)))
    }
}
