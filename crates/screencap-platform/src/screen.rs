use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Interface orientation of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    /// Device rotated so the top of the interface faces left (90° clockwise content rotation)
    LandscapeLeft,
    PortraitUpsideDown,
    /// Device rotated so the top of the interface faces right (90° counter-clockwise)
    LandscapeRight,
}

impl Orientation {
    /// Number of clockwise quarter turns from portrait.
    pub fn quarter_turns(self) -> u8 {
        match self {
            Orientation::Portrait => 0,
            Orientation::LandscapeLeft => 1,
            Orientation::PortraitUpsideDown => 2,
            Orientation::LandscapeRight => 3,
        }
    }
}

/// Size in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel size at the given scale, `None` on overflow.
    pub fn to_pixels(self, scale: u32) -> Option<(u32, u32)> {
        Some((self.width.checked_mul(scale)?, self.height.checked_mul(scale)?))
    }
}

/// Rectangle in screen points. The origin may be negative for partially off-screen content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersection with another rectangle, `None` when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = (self.x as i64).max(other.x as i64);
        let y0 = (self.y as i64).max(other.y as i64);
        let x1 = (self.x as i64 + self.width as i64).min(other.x as i64 + other.width as i64);
        let y1 = (self.y as i64 + self.height as i64).min(other.y as i64 + other.height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Raw screen frame data from a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Raw BGRA pixel data
    pub data: Vec<u8>,
    /// Stride (bytes per row)
    pub stride: u32,
    /// Pixels per point
    pub scale: u32,
    /// Orientation the pixel rows are laid out in
    pub orientation: Orientation,
}

impl ScreenFrame {
    /// Whether `data` holds at least `height` rows of `stride` bytes, each covering `width` pixels.
    pub fn is_complete(&self) -> bool {
        let row = self.width as u64 * 4;
        self.stride as u64 >= row
            && self.data.len() as u64 >= self.stride as u64 * self.height as u64
    }
}

/// The host display pipeline that owns the frame buffer.
#[async_trait]
pub trait RenderPipeline: Send + Sync {
    /// Wait until the pipeline reports no outstanding draw work.
    async fn flush_pending_draws(&mut self) -> Result<()>;

    /// Capture a complete copy of the current screen frame
    async fn capture_frame(&mut self) -> Result<ScreenFrame>;

    /// Current interface orientation
    fn interface_orientation(&self) -> Orientation;

    /// Screen pixels per point
    fn scale(&self) -> u32;

    /// Real status bar pixels, or `None` where the host does not expose them.
    async fn capture_status_bar(&mut self) -> Result<Option<ScreenFrame>> {
        Ok(None)
    }

    /// Whether `capture_status_bar` can ever return pixels on this host
    fn supports_status_bar_capture(&self) -> bool {
        false
    }
}
