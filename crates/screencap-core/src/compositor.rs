//! Whole-screen capture: synchronize with the display pipeline, center the screen in the
//! caller's context and put the status bar on top.

use image::{imageops, RgbaImage};
use tracing::debug;

use screencap_platform::screen::{Orientation, RenderPipeline};
use screencap_platform::target::AccessibilityResolver;

use crate::config::CaptureConfig;
use crate::error::RenderError;
use crate::raster::{self, CapturedImage, RenderingContext};
use crate::status_bar::{self, StatusBarStrategy};

/// Screen content rotated into the interface orientation.
pub(crate) struct ScreenContent {
    pub image: RgbaImage,
    pub scale: u32,
    pub orientation: Orientation,
}

/// Entry point for all captures. Owns the display pipeline handle; each call borrows it
/// mutably, so captures through one `Screenshotter` never overlap.
pub struct Screenshotter {
    pub(crate) pipeline: Box<dyn RenderPipeline>,
    pub(crate) accessibility: Option<Box<dyn AccessibilityResolver>>,
    status_bar: Box<dyn StatusBarStrategy>,
    status_bar_height: u32,
}

impl Screenshotter {
    /// Build a screenshotter over `pipeline`, choosing the status bar strategy from `config`.
    pub fn new(pipeline: Box<dyn RenderPipeline>, config: &CaptureConfig) -> Self {
        let status_bar = status_bar::select(config.status_bar, pipeline.as_ref());
        Self {
            pipeline,
            accessibility: None,
            status_bar,
            status_bar_height: config.status_bar_height,
        }
    }

    /// Resolve accessibility element targets through `resolver`.
    pub fn with_accessibility(mut self, resolver: Box<dyn AccessibilityResolver>) -> Self {
        self.accessibility = Some(resolver);
        self
    }

    /// Replace the status bar strategy chosen at construction.
    pub fn with_status_bar(mut self, strategy: Box<dyn StatusBarStrategy>) -> Self {
        self.status_bar = strategy;
        self
    }

    /// Screen pixels per point. Contexts passed to [`draw_screen`](Self::draw_screen) must
    /// use this scale.
    pub fn screen_scale(&self) -> u32 {
        self.pipeline.scale()
    }

    /// Draw the current screen into `context`, centered when the sizes differ.
    ///
    /// With `wait_for_updates` the call first waits for the pipeline to finish all pending
    /// draws; otherwise the screen is sampled as it is right now. Context pixels outside the
    /// screen content are left as they were. The status bar, when requested, is drawn last, over
    /// the top edge of the screen content.
    pub async fn draw_screen(
        &mut self,
        context: &mut RenderingContext,
        wait_for_updates: bool,
        include_status_bar: bool,
    ) -> Result<(), RenderError> {
        if context.is_closed() {
            return Err(RenderError::ContextClosed);
        }

        let content = self.render_screen(wait_for_updates).await?;
        if content.scale != context.scale() {
            return Err(RenderError::ScaleMismatch {
                context: context.scale(),
                screen: content.scale,
            });
        }

        self.composite(context, &content, include_status_bar).await
    }

    /// Image of the screen after pending updates, without the status bar.
    pub async fn capture_screen(&mut self) -> Result<CapturedImage, RenderError> {
        self.capture_screen_with_status_bar(false).await
    }

    /// Image of the screen after pending updates, optionally with the status bar on top.
    /// The image is oriented like the interface at the moment of capture.
    pub async fn capture_screen_with_status_bar(
        &mut self,
        include_status_bar: bool,
    ) -> Result<CapturedImage, RenderError> {
        self.capture_screen_with_options(true, include_status_bar).await
    }

    /// Image of the screen at its native size, choosing whether to wait for pending draws.
    pub async fn capture_screen_with_options(
        &mut self,
        wait_for_updates: bool,
        include_status_bar: bool,
    ) -> Result<CapturedImage, RenderError> {
        let content = self.render_screen(wait_for_updates).await?;
        let mut context = RenderingContext::with_pixel_size(
            content.image.width(),
            content.image.height(),
            content.scale,
        )?;
        self.composite(&mut context, &content, include_status_bar).await?;
        context.into_image()
    }

    /// Sample the screen, optionally after pending draws have landed.
    pub(crate) async fn render_screen(
        &mut self,
        wait_for_updates: bool,
    ) -> Result<ScreenContent, RenderError> {
        if wait_for_updates {
            self.pipeline
                .flush_pending_draws()
                .await
                .map_err(RenderError::Pipeline)?;
        }

        let orientation = self.pipeline.interface_orientation();
        let frame = self
            .pipeline
            .capture_frame()
            .await
            .map_err(RenderError::Pipeline)?;
        if frame.scale == 0 || frame.width % frame.scale != 0 || frame.height % frame.scale != 0 {
            return Err(RenderError::UnalignedFrame {
                width: frame.width,
                height: frame.height,
                scale: frame.scale,
            });
        }
        let image = raster::reorient(raster::frame_to_rgba(&frame)?, frame.orientation, orientation);

        debug!(
            "sampled {}x{} screen (scale {}, {:?}, after updates: {})",
            image.width(),
            image.height(),
            frame.scale,
            orientation,
            wait_for_updates
        );

        Ok(ScreenContent {
            image,
            scale: frame.scale,
            orientation,
        })
    }

    async fn composite(
        &mut self,
        context: &mut RenderingContext,
        content: &ScreenContent,
        include_status_bar: bool,
    ) -> Result<(), RenderError> {
        let (x, y) = raster::centered_origin(context.pixel_size(), content.image.dimensions());
        imageops::replace(context.canvas_mut()?, &content.image, x, y);

        if include_status_bar {
            let width = content.image.width();
            let height = self
                .status_bar_height
                .saturating_mul(content.scale)
                .min(content.image.height());
            let mut bar = self
                .status_bar
                .render(self.pipeline.as_mut(), width, height, content.orientation)
                .await;
            if bar.dimensions() != (width, height) {
                // never paint outside the bar slot
                bar = imageops::crop_imm(&bar, 0, 0, width, height).to_image();
            }
            imageops::overlay(context.canvas_mut()?, &bar, x, y);
        }

        context.set_orientation(content.orientation);
        Ok(())
    }
}
