//! Screen capture module
//! Uses `xcap` for cross-platform screenshots and exposes them through the
//! `ScreenSource` trait so calibration and sampling can run on synthetic frames.
//! Frames are returned in bounds-local coordinates.
//! Permissions note: On macOS, grant "Screen & System Audio Recording" permission to Terminal.app in System Settings > Privacy & Security.

use image::{DynamicImage, RgbaImage};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};
use xcap::Monitor;

use crate::error::CaptureError;

/// Axis-aligned screen rectangle in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True if `inner` lies entirely within `self`.
    pub fn contains(&self, inner: &Bounds) -> bool {
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        inner.x >= self.x
            && inner.y >= self.y
            && inner.x as i64 + inner.width as i64 <= right
            && inner.y as i64 + inner.height as i64 <= bottom
    }
}

/// Source of display bounds and pixel captures.
pub trait ScreenSource {
    /// Pixel rectangle of the requested display.
    fn display_bounds(&self, display: usize) -> Result<Bounds, CaptureError>;

    /// Captures `bounds`; pixel (0, 0) of the result is the top-left of `bounds`.
    fn capture(&self, bounds: &Bounds) -> Result<RgbaImage, CaptureError>;
}

/// `ScreenSource` backed by the real displays.
#[derive(Clone, Copy, Debug, Default)]
pub struct XcapScreen;

fn monitor_bounds(monitor: &Monitor) -> Result<Bounds, CaptureError> {
    Ok(Bounds::new(
        monitor.x()?,
        monitor.y()?,
        monitor.width()?,
        monitor.height()?,
    ))
}

impl ScreenSource for XcapScreen {
    fn display_bounds(&self, display: usize) -> Result<Bounds, CaptureError> {
        let monitors = Monitor::all()?;
        let monitor = monitors.get(display).ok_or(CaptureError::NoDisplay(display))?;
        let bounds = monitor_bounds(monitor)?;
        let display_index = display;
        info!(
            "display {}: {}x{} at ({},{})",
            display_index, bounds.width, bounds.height, bounds.x, bounds.y
        );
        Ok(bounds)
    }

    fn capture(&self, bounds: &Bounds) -> Result<RgbaImage, CaptureError> {
        let start = Instant::now();

        let mut monitor_rect = None;
        for monitor in Monitor::all()? {
            let rect = monitor_bounds(&monitor)?;
            if rect.contains(bounds) {
                monitor_rect = Some((monitor, rect));
                break;
            }
        }
        let Some((monitor, display)) = monitor_rect else {
            return Err(CaptureError::RegionOutOfBounds {
                x: bounds.x,
                y: bounds.y,
                width: bounds.width,
                height: bounds.height,
                display_width: 0,
                display_height: 0,
            });
        };

        let screenshot = monitor.capture_image()?;
        let frame = crop_to_bounds(screenshot, &display, bounds)?;

        debug!("capture latency: {:?}", start.elapsed());
        Ok(frame)
    }
}

/// Crops a full-display screenshot down to `bounds`.
fn crop_to_bounds(
    screenshot: RgbaImage,
    display: &Bounds,
    bounds: &Bounds,
) -> Result<RgbaImage, CaptureError> {
    let (screen_w, screen_h) = screenshot.dimensions();
    if (screen_w, screen_h) == (0, 0) {
        return Err(CaptureError::EmptyFrame);
    }

    let out_of_bounds = || CaptureError::RegionOutOfBounds {
        x: bounds.x,
        y: bounds.y,
        width: bounds.width,
        height: bounds.height,
        display_width: screen_w,
        display_height: screen_h,
    };

    let left = u32::try_from(bounds.x - display.x).map_err(|_| out_of_bounds())?;
    let top = u32::try_from(bounds.y - display.y).map_err(|_| out_of_bounds())?;
    if left.saturating_add(bounds.width) > screen_w || top.saturating_add(bounds.height) > screen_h {
        return Err(out_of_bounds());
    }

    if (left, top, bounds.width, bounds.height) == (0, 0, screen_w, screen_h) {
        return Ok(screenshot);
    }
    Ok(DynamicImage::ImageRgba8(screenshot)
        .crop_imm(left, top, bounds.width, bounds.height)
        .to_rgba8())
}

/// Saves `frame` as `<dir>/<name>.png` for manual inspection.
pub fn dump_frame(dir: &Path, name: &str, frame: &RgbaImage) -> Result<(), CaptureError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.png", name));
    frame.save(&path)?;
    info!("saved debug frame to {}", path.display());
    Ok(())
}
