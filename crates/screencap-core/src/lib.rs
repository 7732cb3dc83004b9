//! Screen and element capture for UI test harnesses.
//!
//! [`Screenshotter`] draws the screen into a [`RenderingContext`], captures whole-screen images
//! with an optional status bar, and snapshots single elements. [`persist::persist_image`] writes
//! any [`CapturedImage`] to disk as PNG.

pub mod compositor;
pub mod config;
pub mod error;
pub mod persist;
pub mod raster;
pub mod snapshot;
pub mod status_bar;

#[cfg(test)]
mod testing;

pub use compositor::Screenshotter;
pub use config::CaptureConfig;
pub use error::{CaptureError, InvalidTargetError, PersistenceError, RenderError};
pub use persist::persist_image;
pub use raster::{CapturedImage, RenderingContext};
pub use snapshot::VisualTarget;
pub use status_bar::{StatusBarMode, StatusBarStrategy};
