//! Shared test fakes: a hand-driven clock and a scripted emulator window.
//!
//! [`FakeDesktop`] models the game as a set of screens. Each screen has a
//! frame and buttons; clicking a button's point moves to another screen.
//! Template lookups see the buttons of the current screen.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::clock::{Clock, add_duration};
use crate::error::{AutomationError, Result};
use crate::platform::{InputDriver, Rect, WindowDriver, WindowHandle};
use crate::vision::{Frame, Point, Region, TemplateMatcher, TextReader};

/// Clock that only moves when slept on or set.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            slept: Mutex::new(Vec::new()),
        }
    }

    pub fn at_epoch() -> Self {
        Self::starting_at(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now = add_duration(*now, duration);
    }
}

struct Button {
    template: PathBuf,
    at: Point,
    leads_to: usize,
}

struct Screen {
    frame: Frame,
    buttons: Vec<Button>,
    text: String,
}

/// Scripted single-window desktop with vision.
pub struct FakeDesktop {
    title: String,
    focusable: bool,
    screens: Vec<Screen>,
    current: Mutex<usize>,
    clicks: Mutex<Vec<Point>>,
}

pub const FAKE_HANDLE: WindowHandle = WindowHandle(7);

impl FakeDesktop {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            focusable: true,
            screens: Vec::new(),
            current: Mutex::new(0),
            clicks: Mutex::new(Vec::new()),
        }
    }

    /// Add a screen filled with `shade`. Returns its index.
    pub fn screen(&mut self, shade: u8) -> usize {
        self.screens.push(Screen {
            frame: Frame::solid(64, 48, [shade, shade, shade, 255]),
            buttons: Vec::new(),
            text: String::new(),
        });
        self.screens.len() - 1
    }

    /// Show `template` at `at` on `screen`; clicking it moves to `leads_to`.
    pub fn button(&mut self, screen: usize, template: &str, at: Point, leads_to: usize) {
        self.screens[screen].buttons.push(Button {
            template: PathBuf::from(template),
            at,
            leads_to,
        });
    }

    /// Text read anywhere on `screen`.
    pub fn text(&mut self, screen: usize, text: &str) {
        self.screens[screen].text = text.to_owned();
    }

    pub fn refuse_focus(&mut self) {
        self.focusable = false;
    }

    pub fn current_screen(&self) -> usize {
        *self.current.lock().unwrap()
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn initial_frame(&self) -> Frame {
        self.screens[self.current_screen()].frame.clone()
    }

    fn check(&self, handle: WindowHandle) -> Result<()> {
        if handle == FAKE_HANDLE {
            Ok(())
        } else {
            Err(AutomationError::Window(format!("unknown window {handle}")))
        }
    }
}

impl WindowDriver for FakeDesktop {
    fn find_window(&self, title: &str) -> Option<WindowHandle> {
        (title == self.title).then_some(FAKE_HANDLE)
    }

    fn bring_to_front(&self, handle: WindowHandle) -> bool {
        self.focusable && handle == FAKE_HANDLE
    }

    fn client_rect(&self, handle: WindowHandle) -> Result<Rect> {
        self.check(handle)?;
        Ok(Rect {
            left: 0,
            top: 0,
            right: 64,
            bottom: 48,
        })
    }

    fn capture(&self, handle: WindowHandle) -> Result<Frame> {
        self.check(handle)?;
        Ok(self.initial_frame())
    }

    fn client_to_screen(&self, handle: WindowHandle, point: Point) -> Result<Point> {
        self.check(handle)?;
        Ok(point)
    }
}

impl InputDriver for FakeDesktop {
    fn click(&self, screen_point: Point) -> Result<()> {
        self.clicks.lock().unwrap().push(screen_point);
        let mut current = self.current.lock().unwrap();
        if let Some(button) = self.screens[*current]
            .buttons
            .iter()
            .find(|b| b.at == screen_point)
        {
            *current = button.leads_to;
        }
        Ok(())
    }

    fn send_key(&self, _key_code: u16) -> Result<()> {
        Ok(())
    }
}

impl TemplateMatcher for FakeDesktop {
    fn find_template(&self, _frame: &Frame, template: &Path, _threshold: f64) -> Option<Point> {
        self.screens[self.current_screen()]
            .buttons
            .iter()
            .find(|b| template.ends_with(&b.template))
            .map(|b| b.at)
    }

    fn find_all(&self, frame: &Frame, template: &Path, threshold: f64) -> Vec<Point> {
        self.find_template(frame, template, threshold)
            .into_iter()
            .collect()
    }
}

impl TextReader for FakeDesktop {
    fn extract_text(&self, _frame: &Frame, _region: Option<Region>) -> String {
        self.screens[self.current_screen()].text.clone()
    }
}
