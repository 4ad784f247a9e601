//! Configuration types for the automation engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs;
use crate::error::{AutomationError, Result};

/// Top-level configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Engine loop timing.
    pub engine: EngineConfig,
    /// Synthetic input pacing.
    pub input: InputConfig,
    /// Template matching defaults.
    pub vision: VisionConfig,
    /// Popup convergence loop tuning.
    pub popup: PopupConfig,
    /// Gift task templates and cooldown reading layout.
    pub gift: GiftConfig,
    /// Where the task and account collections live.
    pub storage: StorageConfig,
    /// Debug screenshot capture.
    pub debug: DebugConfig,
}

/// Engine loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sleep when no task is eligible or no account is active.
    pub idle_poll_ms: u64,
    /// Sleep after an unhandled iteration error.
    pub error_cooldown_ms: u64,
    /// Delay between foregrounding a window and capturing it.
    pub settle_delay_ms: u64,
    /// How long `stop` waits for the worker to exit.
    pub stop_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: 2_000,
            error_cooldown_ms: 5_000,
            settle_delay_ms: 300,
            stop_timeout_ms: 1_000,
        }
    }
}

impl EngineConfig {
    /// Idle poll interval.
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Cooldown after an unhandled error.
    pub fn error_cooldown(&self) -> Duration {
        Duration::from_millis(self.error_cooldown_ms)
    }

    /// Settle delay before a capture.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Bounded wait for worker shutdown.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Synthetic input pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Base delay after every click or key press.
    pub click_delay_ms: u64,
    /// Uniform jitter applied around `click_delay_ms` (±).
    pub jitter_range_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            click_delay_ms: 200,
            jitter_range_ms: 50,
        }
    }
}

/// Template matching defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Minimum normalized match score for a template hit.
    pub match_threshold: f64,
    /// Root for relative template paths (None = `app_dirs::resources_dir()`).
    pub resources_dir: Option<PathBuf>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.85,
            resources_dir: None,
        }
    }
}

impl VisionConfig {
    /// Effective template root.
    pub fn resources_root(&self) -> PathBuf {
        self.resources_dir
            .clone()
            .unwrap_or_else(app_dirs::resources_dir)
    }
}

/// Popup convergence loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Dismiss templates, scanned in order; first hit wins.
    pub templates: Vec<PathBuf>,
    /// Number of no-change clicks tolerated before giving up.
    pub max_attempts: u32,
    /// Wait after a dismiss click before recapturing.
    pub base_delay_ms: u64,
    /// Extra wait per stuck attempt already counted.
    pub per_attempt_delay_ms: u64,
    /// Pixels sampled for the frame signature.
    pub signature_samples: u32,
    /// Hard cap on dismiss clicks in one drain, changing screen or not.
    pub max_dismissals: u32,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            templates: vec![
                PathBuf::from("Popup/CloseX.png"),
                PathBuf::from("Popup/Ok.png"),
                PathBuf::from("Popup/Cancel.png"),
                PathBuf::from("Popup/Claim.png"),
            ],
            max_attempts: 5,
            base_delay_ms: 300,
            per_attempt_delay_ms: 50,
            signature_samples: 10,
            max_dismissals: 50,
        }
    }
}

/// Gift task templates and cooldown layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GiftConfig {
    /// Gift box button template.
    pub gift_box: PathBuf,
    /// "Open" button template shown after the gift box is clicked.
    pub open_button: PathBuf,
    /// Icon next to the cooldown timer text.
    pub cooldown_icon: PathBuf,
    /// Horizontal offset of the timer text from the icon centre.
    pub cooldown_offset_x: i32,
    /// Vertical offset of the timer text from the icon centre.
    pub cooldown_offset_y: i32,
    /// Timer text region width.
    pub cooldown_width: u32,
    /// Timer text region height.
    pub cooldown_height: u32,
    /// Lower bound of the random padding added to a read cooldown.
    pub padding_min_secs: u64,
    /// Upper bound (exclusive) of the random padding.
    pub padding_max_secs: u64,
}

impl Default for GiftConfig {
    fn default() -> Self {
        Self {
            gift_box: PathBuf::from("Gift/giftbox.png"),
            open_button: PathBuf::from("Gift/open_button.png"),
            cooldown_icon: PathBuf::from("Gift/cooldown_icon.png"),
            cooldown_offset_x: 50,
            cooldown_offset_y: 0,
            cooldown_width: 100,
            cooldown_height: 30,
            padding_min_secs: 3,
            padding_max_secs: 10,
        }
    }
}

/// Where the task and account collections live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory override (None = `app_dirs::data_dir()`).
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Effective data directory.
    pub fn data_root(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(app_dirs::data_dir)
    }

    /// Task collection path.
    pub fn tasks_path(&self) -> PathBuf {
        self.data_root().join(app_dirs::TASKS_FILE)
    }

    /// Account collection path.
    pub fn accounts_path(&self) -> PathBuf {
        self.data_root().join(app_dirs::ACCOUNTS_FILE)
    }
}

/// Debug screenshot capture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Save the last frame when popups cannot be resolved.
    pub enabled: bool,
    /// Screenshot root (None = `app_dirs::debug_screenshots_dir()`).
    pub screenshot_dir: Option<PathBuf>,
}

impl DebugConfig {
    /// Effective screenshot root.
    pub fn screenshot_root(&self) -> PathBuf {
        self.screenshot_dir
            .clone()
            .unwrap_or_else(app_dirs::debug_screenshots_dir)
    }
}

impl AutomationConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AutomationError::Config(e.to_string()))
    }

    /// Load configuration, falling back to defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::from_file(path) {
            Ok(config) => Ok(config),
            Err(AutomationError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AutomationError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        app_dirs::config_file()
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.vision.match_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(AutomationError::Config(format!(
                "vision.match_threshold must be in (0, 1], got {threshold}"
            )));
        }
        if self.popup.max_attempts == 0 {
            return Err(AutomationError::Config(
                "popup.max_attempts must be at least 1".to_owned(),
            ));
        }
        if self.popup.templates.is_empty() {
            return Err(AutomationError::Config(
                "popup.templates must name at least one template".to_owned(),
            ));
        }
        if self.gift.padding_min_secs > self.gift.padding_max_secs {
            return Err(AutomationError::Config(format!(
                "gift padding range is inverted ({} > {})",
                self.gift.padding_min_secs, self.gift.padding_max_secs
            )));
        }
        Ok(())
    }
}
