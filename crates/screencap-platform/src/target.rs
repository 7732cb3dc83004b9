use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::screen::{Rect, ScreenFrame};

/// Opaque reference to an accessibility element, meaningful only to the resolver that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A drawable node of the view hierarchy.
pub trait ViewNode: Send + Sync {
    /// Human-readable description for logs and errors
    fn describe(&self) -> String;

    /// Frame in screen points
    fn frame(&self) -> Rect;

    /// Whether the node is still part of a live hierarchy
    fn is_attached(&self) -> bool;

    /// Render the node's own content, clipped to its bounds, at `scale` pixels per point.
    /// The returned frame must be `frame().width * scale` by `frame().height * scale` pixels.
    fn render(&self, scale: u32) -> Result<ScreenFrame>;
}

/// Maps accessibility element references to drawable frames.
pub trait AccessibilityResolver: Send + Sync {
    /// Frame of the element in screen points, or `None` when the element is no longer on screen.
    fn accessibility_frame(&self, id: &ElementId) -> Result<Option<Rect>>;
}
