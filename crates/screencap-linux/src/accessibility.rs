//! Element resolution for X11: an element id is a window id, decimal or `0x` hex.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use xcb::{x, XidNew};

use screencap_platform::screen::Rect;
use screencap_platform::target::{AccessibilityResolver, ElementId};

pub struct X11WindowResolver {
    conn: Arc<xcb::Connection>,
    root: x::Window,
}

impl X11WindowResolver {
    pub(crate) fn new(conn: Arc<xcb::Connection>, root: x::Window) -> Self {
        Self { conn, root }
    }
}

pub(crate) fn parse_window_id(id: &str) -> Result<u32> {
    let id = id.trim();
    let parsed = match id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => id.parse(),
    };
    parsed.with_context(|| format!("{:?} is not an X11 window id", id))
}

impl AccessibilityResolver for X11WindowResolver {
    fn accessibility_frame(&self, id: &ElementId) -> Result<Option<Rect>> {
        let raw = parse_window_id(id.as_str())?;
        // SAFETY: an id that names no window only makes the requests below fail
        let window = unsafe { x::Window::new(raw) };

        let attrs = self.conn.send_request(&x::GetWindowAttributes { window });
        let attrs = match self.conn.wait_for_reply(attrs) {
            Ok(attrs) => attrs,
            Err(xcb::Error::Protocol(e)) => {
                debug!("window {:#x} is gone: {:?}", raw, e);
                return Ok(None);
            }
            Err(e) => return Err(e).context("GetWindowAttributes failed"),
        };
        if attrs.map_state() != x::MapState::Viewable {
            debug!("window {:#x} is not viewable", raw);
            return Ok(None);
        }

        let geometry = self.conn.send_request(&x::GetGeometry {
            drawable: x::Drawable::Window(window),
        });
        let origin = self.conn.send_request(&x::TranslateCoordinates {
            src_window: window,
            dst_window: self.root,
            src_x: 0,
            src_y: 0,
        });
        let geometry = self
            .conn
            .wait_for_reply(geometry)
            .context("GetGeometry failed")?;
        let origin = self
            .conn
            .wait_for_reply(origin)
            .context("TranslateCoordinates failed")?;

        Ok(Some(Rect::new(
            origin.dst_x() as i32,
            origin.dst_y() as i32,
            geometry.width() as u32,
            geometry.height() as u32,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_id() {
        assert_eq!(parse_window_id("0x3a00007").unwrap(), 0x3a00007);
        assert_eq!(parse_window_id(" 1234 ").unwrap(), 1234);
        assert!(parse_window_id("button").is_err());
        assert!(parse_window_id("0xzz").is_err());
    }
}
