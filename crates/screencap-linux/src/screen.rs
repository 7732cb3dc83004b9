//! Display pipeline auto-detection for Linux.

use anyhow::{bail, Result};

pub use crate::screen_x11::X11RenderPipeline;

/// Detect the display server and return its render pipeline.
pub fn create_render_pipeline() -> Result<X11RenderPipeline> {
    // DISPLAY covers X11 and XWayland
    if let Ok(display_name) = std::env::var("DISPLAY") {
        tracing::info!("detected X11 display {}, using xcb render pipeline", display_name);
        return X11RenderPipeline::connect(Some(&display_name));
    }

    if std::env::var("WAYLAND_DISPLAY").is_ok() {
        bail!("pure Wayland sessions are not supported; run under XWayland with DISPLAY set");
    }

    bail!("no display server detected; set DISPLAY");
}
