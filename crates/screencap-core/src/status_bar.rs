//! Status bar layer for whole-screen captures.
//!
//! The strategy is chosen once when the [`Screenshotter`](crate::Screenshotter) is built. Hosts
//! that expose real status bar pixels use [`NativeStatusBar`]; everywhere else a local bar is
//! drawn by [`SynthesizedStatusBar`]. Synthesized output shows the current time and fixed
//! signal/battery indicators and can differ cosmetically from the system bar.

use async_trait::async_trait;
use chrono::{NaiveTime, Timelike};
use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use screencap_platform::screen::{Orientation, RenderPipeline};

use crate::raster;

const BAR_BACKGROUND: Rgba<u8> = Rgba([248, 248, 248, 255]);
const BAR_FOREGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// 3x5 glyphs, one byte per row, low three bits used (MSB on the left).
const GLYPH_COLON: [u8; 5] = [0b000, 0b010, 0b000, 0b010, 0b000];
const GLYPH_DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// How the status bar layer is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBarMode {
    /// Native when the pipeline supports it, synthesized otherwise
    #[default]
    Auto,
    Native,
    Synthesized,
}

/// Produces the status bar layer composited over the top of a screen capture.
#[async_trait]
pub trait StatusBarStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Render a `width` x `height` pixel bar laid out for `orientation`.
    async fn render(
        &self,
        pipeline: &mut dyn RenderPipeline,
        width: u32,
        height: u32,
        orientation: Orientation,
    ) -> RgbaImage;
}

/// Pick the strategy for this host.
pub fn select(mode: StatusBarMode, pipeline: &dyn RenderPipeline) -> Box<dyn StatusBarStrategy> {
    let strategy: Box<dyn StatusBarStrategy> = match mode {
        StatusBarMode::Auto if pipeline.supports_status_bar_capture() => {
            Box::new(NativeStatusBar::default())
        }
        StatusBarMode::Auto | StatusBarMode::Synthesized => {
            Box::new(SynthesizedStatusBar::default())
        }
        StatusBarMode::Native => Box::new(NativeStatusBar::default()),
    };
    info!("status bar strategy: {} (mode {:?})", strategy.name(), mode);
    strategy
}

/// Locally drawn status bar.
#[derive(Debug, Clone, Default)]
pub struct SynthesizedStatusBar {
    fixed_time: Option<NaiveTime>,
}

impl SynthesizedStatusBar {
    /// Always show `time` instead of the local wall clock.
    pub fn with_time(time: NaiveTime) -> Self {
        Self {
            fixed_time: Some(time),
        }
    }

    fn time(&self) -> NaiveTime {
        self.fixed_time
            .unwrap_or_else(|| chrono::Local::now().time())
    }

    /// Draw the bar. Glyph size follows the bar height so the layout scales with the screen.
    pub fn draw(&self, width: u32, height: u32) -> RgbaImage {
        let mut bar = RgbaImage::from_pixel(width, height, BAR_BACKGROUND);
        if width == 0 || height == 0 {
            return bar;
        }

        let unit = (height / 10).max(1);
        let glyph_top = height.saturating_sub(5 * unit) / 2;

        // clock, centered
        let time = self.time();
        let text = format!("{:02}:{:02}", time.hour(), time.minute());
        let text_width = text.len() as u32 * 4 * unit - unit;
        let mut x = width.saturating_sub(text_width) / 2;
        for ch in text.chars() {
            let glyph = match ch.to_digit(10) {
                Some(d) => &GLYPH_DIGITS[d as usize],
                None => &GLYPH_COLON,
            };
            draw_glyph(&mut bar, glyph, x, glyph_top, unit);
            x += 4 * unit;
        }

        // signal strength, left
        let baseline = glyph_top + 5 * unit;
        for i in 0..4u32 {
            let bar_height = (2 + i) * unit;
            fill_rect(
                &mut bar,
                2 * unit + i * 2 * unit,
                baseline.saturating_sub(bar_height),
                unit,
                bar_height,
                BAR_FOREGROUND,
            );
        }

        // battery, right
        let body_width = 10 * unit;
        let right = width.saturating_sub(3 * unit);
        let left = right.saturating_sub(body_width);
        fill_rect(&mut bar, left, glyph_top, body_width, 5 * unit, BAR_FOREGROUND);
        fill_rect(&mut bar, right, glyph_top + unit, unit, 3 * unit, BAR_FOREGROUND);

        bar
    }
}

#[async_trait]
impl StatusBarStrategy for SynthesizedStatusBar {
    fn name(&self) -> &'static str {
        "synthesized"
    }

    async fn render(
        &self,
        _pipeline: &mut dyn RenderPipeline,
        width: u32,
        height: u32,
        _orientation: Orientation,
    ) -> RgbaImage {
        self.draw(width, height)
    }
}

/// Status bar pixels taken from the host, falling back to a synthesized bar when the host
/// cannot provide them.
#[derive(Debug, Clone, Default)]
pub struct NativeStatusBar {
    fallback: SynthesizedStatusBar,
}

#[async_trait]
impl StatusBarStrategy for NativeStatusBar {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn render(
        &self,
        pipeline: &mut dyn RenderPipeline,
        width: u32,
        height: u32,
        orientation: Orientation,
    ) -> RgbaImage {
        let frame = match pipeline.capture_status_bar().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("host has no status bar snapshot, synthesizing");
                return self.fallback.draw(width, height);
            }
            Err(e) => {
                warn!("status bar capture failed, synthesizing: {:#}", e);
                return self.fallback.draw(width, height);
            }
        };

        let rgba = match raster::frame_to_rgba(&frame) {
            Ok(rgba) => raster::reorient(rgba, frame.orientation, orientation),
            Err(e) => {
                warn!("unusable status bar frame, synthesizing: {}", e);
                return self.fallback.draw(width, height);
            }
        };

        if rgba.width() < width || rgba.height() < height {
            warn!(
                "host status bar is {}x{}, smaller than the {}x{} slot, synthesizing",
                rgba.width(),
                rgba.height(),
                width,
                height
            );
            return self.fallback.draw(width, height);
        }
        if rgba.dimensions() == (width, height) {
            rgba
        } else {
            imageops::crop_imm(&rgba, 0, 0, width, height).to_image()
        }
    }
}

fn draw_glyph(img: &mut RgbaImage, glyph: &[u8; 5], x: u32, y: u32, unit: u32) {
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..3u32 {
            if bits & (0b100 >> col) != 0 {
                fill_rect(img, x + col * unit, y + row as u32 * unit, unit, unit, BAR_FOREGROUND);
            }
        }
    }
}

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = x.saturating_add(w).min(img.width());
    let y_end = y.saturating_add(h).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, color);
        }
    }
}
