//! Pixel surfaces: the caller-owned rendering context, the captured image handed back to
//! callers, and conversion of raw pipeline frames into RGBA rasters.

use image::{imageops, Rgba, RgbaImage};

use screencap_platform::screen::{Orientation, ScreenFrame, Size};

use crate::error::RenderError;

/// Fill of a freshly created context. Areas the screen content does not cover keep this value.
pub const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Immutable RGBA raster produced by a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pixels: RgbaImage,
    scale: u32,
    orientation: Orientation,
}

impl CapturedImage {
    pub(crate) fn new(pixels: RgbaImage, scale: u32, orientation: Orientation) -> Self {
        Self { pixels, scale, orientation }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Size in points. Pixel dimensions are always an exact multiple of the scale.
    pub fn point_size(&self) -> Size {
        Size::new(self.width() / self.scale, self.height() / self.scale)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Caller-owned drawing surface of a fixed point size and scale.
#[derive(Debug)]
pub struct RenderingContext {
    size: Size,
    scale: u32,
    canvas: RgbaImage,
    orientation: Orientation,
    closed: bool,
}

impl RenderingContext {
    /// Create a transparent context of `size` points at `scale` pixels per point.
    pub fn new(size: Size, scale: u32) -> Result<Self, RenderError> {
        let overflow = RenderError::DimensionOverflow {
            width: size.width,
            height: size.height,
            scale,
        };
        if scale == 0 {
            return Err(overflow);
        }
        let (width, height) = size.to_pixels(scale).ok_or(overflow)?;
        Ok(Self {
            size,
            scale,
            canvas: RgbaImage::from_pixel(width, height, CLEAR),
            orientation: Orientation::Portrait,
            closed: false,
        })
    }

    /// Create a context exactly covering `width` x `height` pixels.
    pub(crate) fn with_pixel_size(width: u32, height: u32, scale: u32) -> Result<Self, RenderError> {
        if scale == 0 || width % scale != 0 || height % scale != 0 {
            return Err(RenderError::UnalignedFrame { width, height, scale });
        }
        Self::new(Size::new(width / scale, height / scale), scale)
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// (width, height) in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    /// Mark the context as no longer drawable.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub(crate) fn canvas_mut(&mut self) -> Result<&mut RgbaImage, RenderError> {
        if self.closed {
            return Err(RenderError::ContextClosed);
        }
        Ok(&mut self.canvas)
    }

    /// Interface orientation of the last screen drawn into the context, `Portrait` before the
    /// first draw.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub(crate) fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Turn the drawn context into an image carrying the orientation of the last draw.
    pub fn into_image(self) -> Result<CapturedImage, RenderError> {
        if self.closed {
            return Err(RenderError::ContextClosed);
        }
        Ok(CapturedImage::new(self.canvas, self.scale, self.orientation))
    }
}

/// Convert a BGRA pipeline frame into an RGBA raster.
pub(crate) fn frame_to_rgba(frame: &ScreenFrame) -> Result<RgbaImage, RenderError> {
    if !frame.is_complete() {
        return Err(RenderError::IncompleteFrame {
            width: frame.width,
            height: frame.height,
        });
    }

    let mut rgba = Vec::with_capacity((frame.width as usize) * (frame.height as usize) * 4);
    for row in 0..frame.height {
        let row_start = (row as usize) * (frame.stride as usize);
        let row_end = row_start + (frame.width as usize) * 4;
        for px in frame.data[row_start..row_end].chunks_exact(4) {
            // BGRA -> RGBA
            rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
    }

    RgbaImage::from_raw(frame.width, frame.height, rgba).ok_or(RenderError::IncompleteFrame {
        width: frame.width,
        height: frame.height,
    })
}

/// Rotate a raster laid out in `from` so it reads upright in `to`.
pub(crate) fn reorient(image: RgbaImage, from: Orientation, to: Orientation) -> RgbaImage {
    let turns = (4 + to.quarter_turns() - from.quarter_turns()) % 4;
    match turns {
        0 => image,
        1 => imageops::rotate90(&image),
        2 => imageops::rotate180(&image),
        _ => imageops::rotate270(&image),
    }
}

/// Top-left offset that centers `inner` within `outer`, rounding toward negative infinity.
/// Negative offsets clip `inner` on the near edges.
pub(crate) fn centered_origin(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    (
        (outer.0 as i64 - inner.0 as i64).div_euclid(2),
        (outer.1 as i64 - inner.1 as i64).div_euclid(2),
    )
}
