//! X11 display pipeline using xcb.
//!
//! Frames come from `GetImage` on the root window and are laid out in the current RandR
//! rotation, read before and after the image so a rotation in between is never mislabeled.
//!
//! Waiting for pending draws relies on the Damage extension. A damage object on the root
//! window reports rendering by every client, so the pipeline counts as settled once the root
//! takes no damage for [`QUIET_PERIOD`]. Continuous animation never settles; after
//! [`SETTLE_LIMIT`] the capture goes ahead with a warning. Without Damage the wait is only a
//! `GetInputFocus` round trip, which orders this client's own requests and says nothing about
//! rendering by other clients.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use xcb::{damage, randr, x, xfixes, Xid};

use screencap_platform::screen::{Orientation, RenderPipeline, ScreenFrame};

/// Root window free of damage for this long counts as drawn
pub const QUIET_PERIOD: Duration = Duration::from_millis(50);
/// Upper bound on waiting for the screen to settle
pub const SETTLE_LIMIT: Duration = Duration::from_secs(2);

const ROTATION_ATTEMPTS: usize = 3;

/// X11 screen capture over a shared xcb connection
pub struct X11RenderPipeline {
    conn: Arc<xcb::Connection>,
    root: x::Window,
    screen_num: i32,
    has_randr: bool,
    damage: Option<damage::Damage>,
}

impl X11RenderPipeline {
    /// Connect to `display`, or `$DISPLAY` when `None`.
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = xcb::Connection::connect_with_extensions(
            display,
            &[],
            &[xcb::Extension::RandR, xcb::Extension::Damage],
        )
        .context("failed to connect to X11 display")?;

        let root = {
            let setup = conn.get_setup();
            let screen = setup
                .roots()
                .nth(screen_num as usize)
                .context("no X11 screen found")?;
            screen.root()
        };
        let has_randr = conn
            .active_extensions()
            .any(|ext| ext == xcb::Extension::RandR);
        let has_damage = conn
            .active_extensions()
            .any(|ext| ext == xcb::Extension::Damage);

        let damage = if has_damage {
            match watch_root(&conn, root) {
                Ok(damage) => Some(damage),
                Err(e) => {
                    warn!("damage tracking unavailable, waits only order requests: {:#}", e);
                    None
                }
            }
        } else {
            warn!("X server lacks the Damage extension, waits only order requests");
            None
        };

        info!(
            "X11 render pipeline on screen {} (randr: {}, damage: {})",
            screen_num,
            has_randr,
            damage.is_some()
        );

        Ok(Self {
            conn: Arc::new(conn),
            root,
            screen_num,
            has_randr,
            damage,
        })
    }

    /// Resolver for window ids on the same connection.
    pub fn window_resolver(&self) -> crate::accessibility::X11WindowResolver {
        crate::accessibility::X11WindowResolver::new(self.conn.clone(), self.root)
    }
}

/// Damage object reporting any rendering that reaches the root window.
fn watch_root(conn: &xcb::Connection, root: x::Window) -> Result<damage::Damage> {
    let version = conn.send_request(&damage::QueryVersion {
        client_major_version: 1,
        client_minor_version: 1,
    });
    conn.wait_for_reply(version)
        .context("damage QueryVersion failed")?;

    let damage: damage::Damage = conn.generate_id();
    conn.send_and_check_request(&damage::Create {
        damage,
        drawable: x::Drawable::Window(root),
        level: damage::ReportLevel::NonEmpty,
    })
    .context("damage Create failed")?;
    Ok(damage)
}

fn round_trip(conn: &xcb::Connection) -> Result<()> {
    conn.flush().context("failed to flush X11 requests")?;
    let cookie = conn.send_request(&x::GetInputFocus {});
    conn.wait_for_reply(cookie)
        .context("X11 round trip failed")?;
    Ok(())
}

/// Drain queued events, returning whether any of them was damage.
fn drain_damage(conn: &xcb::Connection) -> Result<bool> {
    let mut damaged = false;
    while let Some(event) = conn.poll_for_event().context("failed to read X11 events")? {
        if let xcb::Event::Damage(damage::Event::Notify(_)) = event {
            damaged = true;
        }
    }
    Ok(damaged)
}

/// One quiet-period observation: re-arm the damage object, wait, and report whether
/// anything was drawn meanwhile.
fn damaged_within(conn: &xcb::Connection, damage: damage::Damage, period: Duration) -> Result<bool> {
    conn.send_request(&damage::Subtract {
        damage,
        repair: xfixes::Region::none(),
        parts: xfixes::Region::none(),
    });
    round_trip(conn)?;
    drain_damage(conn)?;

    std::thread::sleep(period);

    round_trip(conn)?;
    drain_damage(conn)
}

/// Observe until one round reports no damage. `Ok(false)` when `max_rounds` pass without
/// a quiet one.
fn settle(max_rounds: u32, mut damaged: impl FnMut() -> Result<bool>) -> Result<bool> {
    for _ in 0..max_rounds {
        if !damaged()? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// RandR rotations are counter-clockwise.
fn orientation_from_rotation(rotation: randr::Rotation) -> Orientation {
    if rotation.contains(randr::Rotation::ROTATE_90) {
        Orientation::LandscapeRight
    } else if rotation.contains(randr::Rotation::ROTATE_180) {
        Orientation::PortraitUpsideDown
    } else if rotation.contains(randr::Rotation::ROTATE_270) {
        Orientation::LandscapeLeft
    } else {
        Orientation::Portrait
    }
}

fn query_orientation(conn: &xcb::Connection, root: x::Window, has_randr: bool) -> Result<Orientation> {
    if !has_randr {
        return Ok(Orientation::Portrait);
    }
    let cookie = conn.send_request(&randr::GetScreenInfo { window: root });
    let reply = conn
        .wait_for_reply(cookie)
        .context("randr GetScreenInfo failed")?;
    Ok(orientation_from_rotation(reply.rotation()))
}

/// Take `sample` until the orientation read before it matches the one read after it.
fn sample_in_one_orientation<T>(
    attempts: usize,
    mut sample: impl FnMut() -> Result<(Orientation, T, Orientation)>,
) -> Result<(Orientation, T)> {
    for _ in 0..attempts {
        let (before, value, after) = sample()?;
        if before == after {
            return Ok((before, value));
        }
        debug!("screen rotated from {:?} to {:?} during capture, retrying", before, after);
    }
    bail!("screen kept rotating during {} capture attempts", attempts)
}

fn grab_root_image(conn: &xcb::Connection, root: x::Window) -> Result<(u32, u32, Vec<u8>)> {
    let geometry = conn.send_request(&x::GetGeometry {
        drawable: x::Drawable::Window(root),
    });
    let geometry = conn
        .wait_for_reply(geometry)
        .context("GetGeometry on root window failed")?;
    let (width, height) = (geometry.width(), geometry.height());

    let cookie = conn.send_request(&x::GetImage {
        format: x::ImageFormat::ZPixmap,
        drawable: x::Drawable::Window(root),
        x: 0,
        y: 0,
        width,
        height,
        plane_mask: u32::MAX,
    });
    let reply = conn.wait_for_reply(cookie).context("GetImage failed")?;

    let expected = width as usize * height as usize * 4;
    if reply.data().len() < expected {
        bail!(
            "unsupported root visual: depth {} gave {} bytes for {}x{}",
            reply.depth(),
            reply.data().len(),
            width,
            height
        );
    }

    // Z-pixmap at depth 24/32 is BGRX; the padding byte becomes opaque alpha
    let mut data = reply.data()[..expected].to_vec();
    for px in data.chunks_exact_mut(4) {
        px[3] = 255;
    }
    Ok((width as u32, height as u32, data))
}

fn grab_root(conn: &xcb::Connection, root: x::Window, has_randr: bool) -> Result<ScreenFrame> {
    let (orientation, (width, height, data)) = sample_in_one_orientation(ROTATION_ATTEMPTS, || {
        let before = query_orientation(conn, root, has_randr)?;
        let image = grab_root_image(conn, root)?;
        let after = query_orientation(conn, root, has_randr)?;
        Ok((before, image, after))
    })?;

    Ok(ScreenFrame {
        width,
        height,
        data,
        stride: width * 4,
        scale: 1,
        orientation,
    })
}

#[async_trait]
impl RenderPipeline for X11RenderPipeline {
    async fn flush_pending_draws(&mut self) -> Result<()> {
        let conn = self.conn.clone();
        let damage = self.damage;
        let settled = tokio::task::spawn_blocking(move || -> Result<bool> {
            round_trip(&conn)?;
            match damage {
                Some(damage) => {
                    let rounds = (SETTLE_LIMIT.as_millis() / QUIET_PERIOD.as_millis()) as u32;
                    settle(rounds, || damaged_within(&conn, damage, QUIET_PERIOD))
                }
                None => Ok(true),
            }
        })
        .await
        .context("X11 flush task failed")??;

        if settled {
            debug!("X11 screen settled");
        } else {
            warn!(
                "screen still changing after {:?}, capturing anyway",
                SETTLE_LIMIT
            );
        }
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<ScreenFrame> {
        let conn = self.conn.clone();
        let (root, has_randr) = (self.root, self.has_randr);
        tokio::task::spawn_blocking(move || grab_root(&conn, root, has_randr))
            .await
            .context("X11 capture task failed")?
    }

    fn interface_orientation(&self) -> Orientation {
        match query_orientation(&self.conn, self.root, self.has_randr) {
            Ok(orientation) => orientation,
            Err(e) => {
                warn!("could not read screen {} rotation: {:#}", self.screen_num, e);
                Orientation::Portrait
            }
        }
    }

    fn scale(&self) -> u32 {
        1
    }
}
