//! Captured window frames and screen geometry.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AutomationError, Result};

/// A point in pixels. Client or screen space depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Multiply both coordinates by `factor`, rounding to the nearest pixel.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x: (f64::from(self.x) * factor).round() as i32,
            y: (f64::from(self.y) * factor).round() as i32,
        }
    }
}

/// An axis-aligned rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region of `size` whose top-left corner is `anchor + offset`.
    pub fn beside(anchor: Point, offset: Point, width: u32, height: u32) -> Self {
        let origin = anchor.offset(offset.x, offset.y);
        Self::new(origin.x, origin.y, width, height)
    }
}

/// One captured image of a window's client area.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// A frame of a single colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// RGBA value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Copy of `region` clipped to the frame bounds. `None` when the
    /// region lies entirely outside.
    pub fn crop(&self, region: Region) -> Option<Frame> {
        let left = i64::from(region.x).max(0);
        let top = i64::from(region.y).max(0);
        let right = (i64::from(region.x) + i64::from(region.width)).min(i64::from(self.width()));
        let bottom =
            (i64::from(region.y) + i64::from(region.height)).min(i64::from(self.height()));
        if right <= left || bottom <= top {
            return None;
        }

        let view = image::imageops::crop_imm(
            &self.image,
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        );
        Some(Frame::new(view.to_image()))
    }

    /// Black-and-white copy tuned for digit recognition: luma, then a
    /// hard threshold at mid-grey.
    pub fn binarized(&self) -> Frame {
        let gray = image::imageops::grayscale(&self.image);
        let mut out = RgbaImage::new(gray.width(), gray.height());
        for (x, y, luma) in gray.enumerate_pixels() {
            let v = if luma.0[0] < 128 { 0 } else { 255 };
            out.put_pixel(x, y, Rgba([v, v, v, 255]));
        }
        Frame::new(out)
    }

    /// Write the frame as PNG, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Vision`] when encoding or writing fails.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| AutomationError::Vision(format!("cannot save {}: {e}", path.display())))
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}
