//! Test doubles for the display pipeline and element collaborators.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;

use screencap_platform::filesystem::FileSystem;
use screencap_platform::screen::{Orientation, Rect, RenderPipeline, ScreenFrame};
use screencap_platform::target::{AccessibilityResolver, ElementId, ViewNode};

use crate::persist::LocalFileSystem;

/// Opaque BGRA frame of a single RGB color.
pub fn solid_frame(width: u32, height: u32, scale: u32, rgb: [u8; 3]) -> ScreenFrame {
    let data = [rgb[2], rgb[1], rgb[0], 255].repeat((width * height) as usize);
    ScreenFrame {
        width,
        height,
        data,
        stride: width * 4,
        scale,
        orientation: Orientation::Portrait,
    }
}

/// Frame where every pixel differs from its neighbours, at scale 1.
pub fn gradient_frame(width: u32, height: u32) -> ScreenFrame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 7) as u8, (y * 11) as u8, (x + y) as u8, 255]);
        }
    }
    ScreenFrame {
        width,
        height,
        data,
        stride: width * 4,
        scale: 1,
        orientation: Orientation::Portrait,
    }
}

/// Display pipeline whose redraws complete when the test says so.
pub struct ScriptedPipeline {
    current: ScreenFrame,
    pending: VecDeque<oneshot::Receiver<ScreenFrame>>,
    orientation: Orientation,
    status_bar: Option<ScreenFrame>,
    fail: bool,
    flushes: Arc<AtomicUsize>,
    captures: Arc<AtomicUsize>,
}

impl ScriptedPipeline {
    pub fn new(frame: ScreenFrame) -> Self {
        Self {
            current: frame,
            pending: VecDeque::new(),
            orientation: Orientation::Portrait,
            status_bar: None,
            fail: false,
            flushes: Arc::new(AtomicUsize::new(0)),
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_status_bar(mut self, frame: ScreenFrame) -> Self {
        self.status_bar = Some(frame);
        self
    }

    /// Every capture fails.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Start a redraw: the screen shows `in_progress` until the returned sender delivers the
    /// finished frame.
    pub fn begin_redraw(&mut self, in_progress: ScreenFrame) -> oneshot::Sender<ScreenFrame> {
        let (tx, rx) = oneshot::channel();
        self.current = in_progress;
        self.pending.push_back(rx);
        tx
    }

    /// Top half of `new` over the bottom half of `old`.
    pub fn torn(old: &ScreenFrame, new: &ScreenFrame) -> ScreenFrame {
        let split = (old.height / 2 * old.stride) as usize;
        let mut frame = old.clone();
        frame.data[..split].copy_from_slice(&new.data[..split]);
        frame
    }

    pub fn flush_count(&self) -> Arc<AtomicUsize> {
        self.flushes.clone()
    }

    pub fn capture_count(&self) -> Arc<AtomicUsize> {
        self.captures.clone()
    }
}

#[async_trait]
impl RenderPipeline for ScriptedPipeline {
    async fn flush_pending_draws(&mut self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        while let Some(rx) = self.pending.pop_front() {
            self.current = rx.await.map_err(|_| anyhow!("redraw abandoned"))?;
        }
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<ScreenFrame> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("frame buffer unavailable");
        }
        Ok(self.current.clone())
    }

    fn interface_orientation(&self) -> Orientation {
        self.orientation
    }

    fn scale(&self) -> u32 {
        self.current.scale
    }

    async fn capture_status_bar(&mut self) -> Result<Option<ScreenFrame>> {
        Ok(self.status_bar.clone())
    }

    fn supports_status_bar_capture(&self) -> bool {
        self.status_bar.is_some()
    }
}

/// View node filled with one color.
pub struct MockView {
    frame: Rect,
    rgb: [u8; 3],
    attached: bool,
    render_size: Option<(u32, u32)>,
}

impl MockView {
    pub fn new(frame: Rect, rgb: [u8; 3]) -> Self {
        Self {
            frame,
            rgb,
            attached: true,
            render_size: None,
        }
    }

    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }

    /// Render at a fixed pixel size regardless of frame and scale.
    pub fn rendering_at(mut self, width: u32, height: u32) -> Self {
        self.render_size = Some((width, height));
        self
    }
}

impl ViewNode for MockView {
    fn describe(&self) -> String {
        format!("mock view at {:?}", self.frame)
    }

    fn frame(&self) -> Rect {
        self.frame
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn render(&self, scale: u32) -> Result<ScreenFrame> {
        let (w, h) = self
            .render_size
            .unwrap_or((self.frame.width * scale, self.frame.height * scale));
        Ok(solid_frame(w, h, scale, self.rgb))
    }
}

/// Resolver backed by a fixed table; unknown ids are errors.
#[derive(Default)]
pub struct MockResolver {
    frames: HashMap<ElementId, Option<Rect>>,
}

impl MockResolver {
    pub fn with(mut self, id: &str, frame: Option<Rect>) -> Self {
        self.frames.insert(ElementId::new(id), frame);
        self
    }
}

impl AccessibilityResolver for MockResolver {
    fn accessibility_frame(&self, id: &ElementId) -> Result<Option<Rect>> {
        self.frames
            .get(id)
            .copied()
            .ok_or_else(|| anyhow!("no element with id {}", id))
    }
}

/// Resolver for an element that a pending layout pass moves from `before` to `after`. The
/// move lands once the pipeline has flushed.
pub struct RelayoutResolver {
    flushes: Arc<AtomicUsize>,
    before: Rect,
    after: Rect,
}

impl RelayoutResolver {
    pub fn new(flushes: Arc<AtomicUsize>, before: Rect, after: Rect) -> Self {
        Self { flushes, before, after }
    }
}

impl AccessibilityResolver for RelayoutResolver {
    fn accessibility_frame(&self, _id: &ElementId) -> Result<Option<Rect>> {
        if self.flushes.load(Ordering::SeqCst) == 0 {
            Ok(Some(self.before))
        } else {
            Ok(Some(self.after))
        }
    }
}

/// Local filesystem whose writes always fail.
pub struct FullDisk;

impl FileSystem for FullDisk {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        LocalFileSystem.create_dir_all(path)
    }

    fn write_atomic(&self, _path: &Path, _data: &[u8]) -> Result<()> {
        bail!("no space left on device")
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        LocalFileSystem.canonicalize(path)
    }
}
