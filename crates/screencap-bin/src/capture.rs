//! Captures against the local X11 display.

use anyhow::{Context, Result};
use tracing::info;

use screencap_core::config::CaptureConfig;
use screencap_core::{CapturedImage, RenderingContext, Screenshotter, VisualTarget};
use screencap_linux::screen::create_render_pipeline;
use screencap_platform::target::ElementId;

use crate::ScreenRequest;

pub async fn screen(config: &CaptureConfig, request: ScreenRequest) -> Result<CapturedImage> {
    let pipeline = create_render_pipeline()?;
    let mut shooter = Screenshotter::new(Box::new(pipeline), config);

    let image = match request.context_size {
        Some(size) => {
            let mut context = RenderingContext::new(size, shooter.screen_scale())
                .context("invalid context size")?;
            shooter
                .draw_screen(
                    &mut context,
                    request.wait_for_updates,
                    request.include_status_bar,
                )
                .await
                .context("failed to draw screen")?;
            context.into_image()?
        }
        None => shooter
            .capture_screen_with_options(request.wait_for_updates, request.include_status_bar)
            .await
            .context("failed to capture screen")?,
    };

    info!(
        "captured screen {}x{} ({:?})",
        image.width(),
        image.height(),
        image.orientation()
    );
    Ok(image)
}

pub async fn element(config: &CaptureConfig, window: &str) -> Result<CapturedImage> {
    let pipeline = create_render_pipeline()?;
    let resolver = pipeline.window_resolver();
    let mut shooter =
        Screenshotter::new(Box::new(pipeline), config).with_accessibility(Box::new(resolver));

    let target = VisualTarget::Element(ElementId::new(window));
    let image = shooter
        .snapshot_element(&target)
        .await
        .with_context(|| format!("failed to capture window {}", window))?;

    info!("captured window {} at {}x{}", window, image.width(), image.height());
    Ok(image)
}
