//! Screen understanding: template matching and countdown reading.
//!
//! Matching and character recognition are provided by backends behind
//! [`TemplateMatcher`] and [`TextReader`]. [`Vision`] bundles both with the
//! configured match threshold and resources directory.

pub mod cooldown;
pub mod frame;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::VisionConfig;

pub use cooldown::parse_cooldown;
pub use frame::{Frame, Point, Region};

/// Locates template images inside a frame.
pub trait TemplateMatcher: Send + Sync {
    /// Centre of the best match scoring at least `threshold`.
    ///
    /// Returns `None` when nothing scores high enough or the template
    /// cannot be loaded.
    fn find_template(&self, frame: &Frame, template: &Path, threshold: f64) -> Option<Point>;

    /// Centres of every match scoring at least `threshold`.
    fn find_all(&self, frame: &Frame, template: &Path, threshold: f64) -> Vec<Point>;
}

/// Reads text from a frame.
pub trait TextReader: Send + Sync {
    /// Text inside `region` (whole frame when `None`). Unreadable input
    /// yields an empty string.
    fn extract_text(&self, frame: &Frame, region: Option<Region>) -> String;
}

/// Matcher and reader with their shared settings.
#[derive(Clone)]
pub struct Vision {
    matcher: Arc<dyn TemplateMatcher>,
    reader: Arc<dyn TextReader>,
    threshold: f64,
    resources_dir: PathBuf,
}

impl Vision {
    pub fn new(
        matcher: Arc<dyn TemplateMatcher>,
        reader: Arc<dyn TextReader>,
        config: &VisionConfig,
    ) -> Self {
        Self {
            matcher,
            reader,
            threshold: config.match_threshold,
            resources_dir: config.resources_root(),
        }
    }

    /// Absolute path of a template. Relative names resolve against the
    /// resources directory.
    pub fn resolve(&self, template: &Path) -> PathBuf {
        if template.is_absolute() {
            template.to_path_buf()
        } else {
            self.resources_dir.join(template)
        }
    }

    /// Find `template` at the default threshold.
    pub fn find(&self, frame: &Frame, template: &Path) -> Option<Point> {
        self.find_with_threshold(frame, template, self.threshold)
    }

    pub fn find_with_threshold(
        &self,
        frame: &Frame,
        template: &Path,
        threshold: f64,
    ) -> Option<Point> {
        self.matcher
            .find_template(frame, &self.resolve(template), threshold)
    }

    /// Every match of `template` at the default threshold.
    pub fn find_all(&self, frame: &Frame, template: &Path) -> Vec<Point> {
        self.matcher
            .find_all(frame, &self.resolve(template), self.threshold)
    }

    pub fn extract_text(&self, frame: &Frame, region: Option<Region>) -> String {
        self.reader.extract_text(frame, region)
    }

    /// Read a countdown from the box of `size` placed at `anchor + offset`.
    ///
    /// The box is binarised before recognition. Returns
    /// [`Duration::ZERO`] when the box is off-screen or the text cannot be
    /// parsed.
    pub fn read_cooldown(
        &self,
        frame: &Frame,
        anchor: Point,
        offset: Point,
        width: u32,
        height: u32,
    ) -> Duration {
        let region = Region::beside(anchor, offset, width, height);
        let Some(cropped) = frame.crop(region) else {
            debug!("cooldown region {region:?} is outside the frame");
            return Duration::ZERO;
        };

        let text = self.reader.extract_text(&cropped.binarized(), None);
        let cooldown = parse_cooldown(&text);
        debug!("cooldown text {text:?} parsed as {cooldown:?}");
        cooldown
    }
}
