//! Headless backends for hosts without a desktop or vision engine.

use std::path::Path;

use super::{InputDriver, Rect, WindowDriver, WindowHandle};
use crate::error::{AutomationError, Result};
use crate::vision::{Frame, Point, Region, TemplateMatcher, TextReader};

/// Desktop with no windows. Every window lookup misses, so every attempt
/// fails at window acquisition.
pub struct HeadlessDesktop;

impl WindowDriver for HeadlessDesktop {
    fn find_window(&self, _title: &str) -> Option<WindowHandle> {
        None
    }

    fn bring_to_front(&self, _handle: WindowHandle) -> bool {
        false
    }

    fn client_rect(&self, handle: WindowHandle) -> Result<Rect> {
        Err(AutomationError::Window(format!(
            "window {handle} is not available on a headless desktop"
        )))
    }

    fn capture(&self, handle: WindowHandle) -> Result<Frame> {
        Err(AutomationError::Window(format!(
            "cannot capture window {handle} on a headless desktop"
        )))
    }

    fn client_to_screen(&self, handle: WindowHandle, _point: Point) -> Result<Point> {
        Err(AutomationError::Window(format!(
            "window {handle} is not available on a headless desktop"
        )))
    }

    fn is_available(&self) -> bool {
        false
    }
}

impl InputDriver for HeadlessDesktop {
    fn click(&self, _screen_point: Point) -> Result<()> {
        Err(AutomationError::Input(
            "synthetic input is not supported on a headless desktop".to_owned(),
        ))
    }

    fn send_key(&self, _key_code: u16) -> Result<()> {
        Err(AutomationError::Input(
            "synthetic input is not supported on a headless desktop".to_owned(),
        ))
    }
}

/// Vision backend that never matches and never reads text.
pub struct NullVision;

impl TemplateMatcher for NullVision {
    fn find_template(&self, _frame: &Frame, _template: &Path, _threshold: f64) -> Option<Point> {
        None
    }

    fn find_all(&self, _frame: &Frame, _template: &Path, _threshold: f64) -> Vec<Point> {
        Vec::new()
    }
}

impl TextReader for NullVision {
    fn extract_text(&self, _frame: &Frame, _region: Option<Region>) -> String {
        String::new()
    }
}
