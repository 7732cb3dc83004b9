//! Error types for screencap-core.

use std::path::PathBuf;

use thiserror::Error;

/// The drawing surface could not be drawn into.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("rendering context is closed")]
    ContextClosed,

    #[error("context scale {context} does not match screen scale {screen}")]
    ScaleMismatch { context: u32, screen: u32 },

    #[error("{width}x{height} points at scale {scale} overflows pixel dimensions")]
    DimensionOverflow { width: u32, height: u32, scale: u32 },

    #[error("{width}x{height} pixel frame is not a whole number of points at scale {scale}")]
    UnalignedFrame { width: u32, height: u32, scale: u32 },

    #[error("display pipeline returned an incomplete {width}x{height} frame")]
    IncompleteFrame { width: u32, height: u32 },

    #[error("display pipeline failed: {0:#}")]
    Pipeline(#[source] anyhow::Error),
}

/// A snapshot target does not resolve to a drawable region.
#[derive(Error, Debug)]
pub enum InvalidTargetError {
    #[error("{0} has a zero-size frame")]
    ZeroSize(String),

    #[error("{0} is detached from the view hierarchy")]
    Detached(String),

    #[error("{0} lies entirely outside the screen")]
    OffScreen(String),

    #[error("could not resolve {target}: {source:#}")]
    Unresolved {
        target: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Directory creation, PNG encoding or file write failed. Nothing was written.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("invalid file name {0:?}")]
    InvalidFilename(String),

    #[error("failed to create directory {}: {source:#}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write {}: {source:#}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure of an element snapshot.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    InvalidTarget(#[from] InvalidTargetError),
}
