//! Shared helpers for integration tests.
//!
//! [`ArcadeWindow`] is a single emulator window with a fixed set of buttons
//! and a stack of overlays on top. While an overlay is showing, template
//! lookups only see overlays.

use autogame::clock::{Clock, add_duration};
use autogame::config::{DebugConfig, EngineConfig, InputConfig, StorageConfig, VisionConfig};
use autogame::engine::{Backends, Engine, EngineEvent, Stores};
use autogame::executor::ExecutorRegistry;
use autogame::platform::{InputDriver, Rect, WindowDriver, WindowHandle};
use autogame::vision::{Frame, Point, Region, TemplateMatcher, TextReader};
use autogame::{AutomationConfig, AutomationError};
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) const HANDLE: WindowHandle = WindowHandle(0x42);

/// Clock that only moves when slept on.
pub(crate) struct StepClock {
    now: Mutex<DateTime<Utc>>,
}

impl StepClock {
    pub(crate) fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = add_duration(*now, duration);
    }
}

struct Overlay {
    template: PathBuf,
    at: Point,
    sticky: bool,
}

pub(crate) struct ArcadeWindow {
    title: String,
    buttons: Vec<(PathBuf, Point)>,
    overlays: Mutex<Vec<Overlay>>,
    shade: Mutex<u8>,
    clicks: Mutex<Vec<Point>>,
}

impl ArcadeWindow {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            buttons: Vec::new(),
            overlays: Mutex::new(Vec::new()),
            shade: Mutex::new(10),
            clicks: Mutex::new(Vec::new()),
        }
    }

    /// A button that is always on the game screen.
    pub(crate) fn with_button(mut self, template: &str, at: Point) -> Self {
        self.buttons.push((PathBuf::from(template), at));
        self
    }

    /// An overlay that closes when clicked, unless `sticky`.
    pub(crate) fn with_overlay(self, template: &str, at: Point, sticky: bool) -> Self {
        self.overlays.lock().unwrap().push(Overlay {
            template: PathBuf::from(template),
            at,
            sticky,
        });
        self
    }

    pub(crate) fn clicks(&self) -> Vec<Point> {
        self.clicks.lock().unwrap().clone()
    }

    pub(crate) fn overlays_left(&self) -> usize {
        self.overlays.lock().unwrap().len()
    }
}

impl WindowDriver for ArcadeWindow {
    fn find_window(&self, title: &str) -> Option<WindowHandle> {
        (title == self.title).then_some(HANDLE)
    }

    fn bring_to_front(&self, handle: WindowHandle) -> bool {
        handle == HANDLE
    }

    fn client_rect(&self, _handle: WindowHandle) -> autogame::Result<Rect> {
        Ok(Rect {
            left: 0,
            top: 0,
            right: 32,
            bottom: 32,
        })
    }

    fn capture(&self, handle: WindowHandle) -> autogame::Result<Frame> {
        if handle != HANDLE {
            return Err(AutomationError::Window(format!("no window {handle}")));
        }
        let shade = *self.shade.lock().unwrap();
        Ok(Frame::solid(32, 32, [shade, shade, shade, 255]))
    }

    fn client_to_screen(&self, _handle: WindowHandle, point: Point) -> autogame::Result<Point> {
        Ok(point)
    }
}

impl InputDriver for ArcadeWindow {
    fn click(&self, screen_point: Point) -> autogame::Result<()> {
        self.clicks.lock().unwrap().push(screen_point);
        let mut overlays = self.overlays.lock().unwrap();
        if overlays
            .first()
            .is_some_and(|o| o.at == screen_point && !o.sticky)
        {
            overlays.remove(0);
            let mut shade = self.shade.lock().unwrap();
            *shade = shade.wrapping_add(20);
        }
        Ok(())
    }

    fn send_key(&self, _key_code: u16) -> autogame::Result<()> {
        Ok(())
    }
}

impl TemplateMatcher for ArcadeWindow {
    fn find_template(&self, _frame: &Frame, template: &Path, _threshold: f64) -> Option<Point> {
        let overlays = self.overlays.lock().unwrap();
        match overlays.first() {
            Some(top) => template.ends_with(&top.template).then_some(top.at),
            None => self
                .buttons
                .iter()
                .find(|(t, _)| template.ends_with(t))
                .map(|(_, at)| *at),
        }
    }

    fn find_all(&self, frame: &Frame, template: &Path, threshold: f64) -> Vec<Point> {
        self.find_template(frame, template, threshold)
            .into_iter()
            .collect()
    }
}

impl TextReader for ArcadeWindow {
    fn extract_text(&self, _frame: &Frame, _region: Option<Region>) -> String {
        String::new()
    }
}

/// Fast, jitter-free config rooted in `dir`.
pub(crate) fn test_config(dir: &Path) -> AutomationConfig {
    AutomationConfig {
        engine: EngineConfig {
            idle_poll_ms: 5,
            error_cooldown_ms: 5,
            settle_delay_ms: 0,
            stop_timeout_ms: 2000,
        },
        input: InputConfig {
            click_delay_ms: 0,
            jitter_range_ms: 0,
        },
        vision: VisionConfig {
            match_threshold: 0.85,
            resources_dir: Some(PathBuf::from("/res")),
        },
        storage: StorageConfig {
            data_dir: Some(dir.join("data")),
        },
        debug: DebugConfig {
            enabled: true,
            screenshot_dir: Some(dir.join("shots")),
        },
        ..AutomationConfig::default()
    }
}

/// Build an engine over `window` with on-disk stores from `config`.
pub(crate) fn engine_over(
    window: Arc<ArcadeWindow>,
    config: &AutomationConfig,
    executors: ExecutorRegistry,
) -> (Engine, mpsc::UnboundedReceiver<EngineEvent>) {
    let backends = Backends {
        window: window.clone(),
        input: window.clone(),
        matcher: window.clone(),
        reader: window,
        clock: Arc::new(StepClock::new()),
    };
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = Engine::new(config, backends, executors, Stores::open(&config.storage), tx);
    (engine, rx)
}

/// Drain all pending events into a Vec.
pub(crate) fn drain_events(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        events.push(evt);
    }
    events
}

/// Every file below `root`, depth first.
pub(crate) fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(files_under(&path));
        } else {
            files.push(path);
        }
    }
    files
}
