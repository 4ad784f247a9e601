//! Window and input abstractions.
//!
//! The engine drives one emulator window at a time through
//! [`WindowDriver`] and [`InputDriver`]. OS backends implement these traits;
//! [`create_desktop`] returns `None` on hosts without one, and
//! [`HeadlessDesktop`] stands in where a driver is needed anyway.

mod input;
mod stub;

use std::sync::Arc;

use crate::error::Result;
use crate::vision::{Frame, Point};

pub use input::InputService;
pub use stub::{HeadlessDesktop, NullVision};

/// Opaque native window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Window rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// The window an attempt is driving, with the account's display scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowTarget {
    pub handle: WindowHandle,
    /// Multiplier applied to client points before they are clicked.
    pub scale_factor: f64,
}

/// Locates, focuses and captures emulator windows.
pub trait WindowDriver: Send + Sync {
    /// Find a top-level window by exact title.
    fn find_window(&self, title: &str) -> Option<WindowHandle>;

    /// Restore and focus the window. Returns `false` when the OS refuses.
    fn bring_to_front(&self, handle: WindowHandle) -> bool;

    /// Client area in screen coordinates.
    fn client_rect(&self, handle: WindowHandle) -> Result<Rect>;

    /// Capture the client area.
    fn capture(&self, handle: WindowHandle) -> Result<Frame>;

    /// Map a client-area point to screen coordinates.
    fn client_to_screen(&self, handle: WindowHandle, point: Point) -> Result<Point>;

    /// Whether this driver can reach real windows at all. The engine
    /// refuses to run tasks over a driver that cannot.
    fn is_available(&self) -> bool {
        true
    }
}

/// Synthetic mouse and keyboard input.
pub trait InputDriver: Send + Sync {
    /// Left-click at a screen point.
    fn click(&self, screen_point: Point) -> Result<()>;

    /// Press and release a virtual key.
    fn send_key(&self, key_code: u16) -> Result<()>;
}

/// The desktop backend for this host: `(window driver, input driver)`.
///
/// No OS backend is compiled into this build, so this is always `None`.
pub fn create_desktop() -> Option<(Arc<dyn WindowDriver>, Arc<dyn InputDriver>)> {
    None
}

/// The headless pair, for callers that need drivers without a desktop.
pub fn headless_desktop() -> (Arc<dyn WindowDriver>, Arc<dyn InputDriver>) {
    let desktop = Arc::new(HeadlessDesktop);
    let window: Arc<dyn WindowDriver> = desktop.clone();
    let input: Arc<dyn InputDriver> = desktop;
    (window, input)
}
