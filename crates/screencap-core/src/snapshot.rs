//! Snapshots of a single view node or accessibility element.

use std::sync::Arc;

use image::{imageops, RgbaImage};
use tracing::debug;

use screencap_platform::screen::{Orientation, Rect};
use screencap_platform::target::{AccessibilityResolver, ElementId, ViewNode};

use crate::compositor::Screenshotter;
use crate::error::{CaptureError, InvalidTargetError, RenderError};
use crate::raster::{self, CapturedImage};

/// What to snapshot.
#[derive(Clone)]
pub enum VisualTarget {
    /// A node that renders its own content
    View(Arc<dyn ViewNode>),
    /// An element known only to the accessibility resolver
    Element(ElementId),
}

impl VisualTarget {
    pub fn describe(&self) -> String {
        match self {
            VisualTarget::View(node) => node.describe(),
            VisualTarget::Element(id) => format!("accessibility element {}", id),
        }
    }

    /// Resolve to something the snapshotter can draw.
    fn resolve(
        &self,
        resolver: Option<&dyn AccessibilityResolver>,
        scale: u32,
    ) -> Result<Drawable, CaptureError> {
        match self {
            VisualTarget::View(node) => {
                if scale == 0 {
                    let frame = node.frame();
                    return Err(RenderError::UnalignedFrame {
                        width: frame.width,
                        height: frame.height,
                        scale,
                    }
                    .into());
                }
                if !node.is_attached() {
                    return Err(InvalidTargetError::Detached(node.describe()).into());
                }
                let frame = node.frame();
                if frame.is_empty() {
                    return Err(InvalidTargetError::ZeroSize(node.describe()).into());
                }
                let rendered = node.render(scale).map_err(|source| InvalidTargetError::Unresolved {
                    target: node.describe(),
                    source,
                })?;
                let expected = frame.size().to_pixels(scale).ok_or(RenderError::DimensionOverflow {
                    width: frame.width,
                    height: frame.height,
                    scale,
                })?;
                if (rendered.width, rendered.height) != expected || rendered.scale != scale {
                    return Err(RenderError::IncompleteFrame {
                        width: rendered.width,
                        height: rendered.height,
                    }
                    .into());
                }
                Ok(Drawable::Rendered {
                    image: raster::frame_to_rgba(&rendered)?,
                    orientation: rendered.orientation,
                })
            }
            VisualTarget::Element(id) => {
                let resolver = resolver.ok_or_else(|| InvalidTargetError::Unresolved {
                    target: self.describe(),
                    source: anyhow::anyhow!("no accessibility resolver configured"),
                })?;
                let frame = resolver
                    .accessibility_frame(id)
                    .map_err(|source| InvalidTargetError::Unresolved {
                        target: self.describe(),
                        source,
                    })?
                    .ok_or_else(|| InvalidTargetError::Detached(self.describe()))?;
                if frame.is_empty() {
                    return Err(InvalidTargetError::ZeroSize(self.describe()).into());
                }
                Ok(Drawable::ScreenRegion(frame))
            }
        }
    }
}

impl std::fmt::Debug for VisualTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VisualTarget").field(&self.describe()).finish()
    }
}

impl From<ElementId> for VisualTarget {
    fn from(id: ElementId) -> Self {
        VisualTarget::Element(id)
    }
}

impl From<Arc<dyn ViewNode>> for VisualTarget {
    fn from(node: Arc<dyn ViewNode>) -> Self {
        VisualTarget::View(node)
    }
}

enum Drawable {
    Rendered {
        image: RgbaImage,
        orientation: Orientation,
    },
    /// Region of the screen, in points
    ScreenRegion(Rect),
}

impl Screenshotter {
    /// Image of `target` alone, at the screen scale.
    ///
    /// View nodes are rendered offscreen. For accessibility elements the pipeline first
    /// finishes pending updates, then the element's frame is resolved and cut out of the
    /// screen. Parts of an element outside the screen are clipped away.
    pub async fn snapshot_element(
        &mut self,
        target: &VisualTarget,
    ) -> Result<CapturedImage, CaptureError> {
        // pending layout may still move the element; its frame is only read afterwards
        if matches!(target, VisualTarget::Element(_)) {
            self.pipeline
                .flush_pending_draws()
                .await
                .map_err(RenderError::Pipeline)?;
        }

        let scale = self.pipeline.scale();
        let drawable = target.resolve(self.accessibility.as_deref(), scale)?;

        let image = match drawable {
            Drawable::Rendered { image, orientation } => {
                CapturedImage::new(image, scale, orientation)
            }
            Drawable::ScreenRegion(frame) => {
                let screen = self.render_screen(false).await?;
                let s = screen.scale;
                let bounds = Rect::new(0, 0, screen.image.width() / s, screen.image.height() / s);
                let visible = frame
                    .intersect(&bounds)
                    .ok_or_else(|| InvalidTargetError::OffScreen(target.describe()))?;
                let region = imageops::crop_imm(
                    &screen.image,
                    visible.x as u32 * s,
                    visible.y as u32 * s,
                    visible.width * s,
                    visible.height * s,
                )
                .to_image();
                CapturedImage::new(region, s, screen.orientation)
            }
        };

        debug!(
            "snapshot of {}: {}x{} pixels",
            target.describe(),
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
