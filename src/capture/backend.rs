//! Pixel readback for full-screen, region and window captures.

use std::sync::Arc;

use image::{Rgba, RgbaImage, imageops};
use xcap::Monitor;

use super::types::{CaptureError, CapturedImage};
use crate::geometry::{Point, Rect};
use crate::window::{WindowHandle, WindowSystem};

/// One readback of the whole virtual desktop.
#[derive(Debug, Clone)]
pub struct ScreenGrab {
    pub image: CapturedImage,
    /// Screen coordinate of the image's top-left pixel; negative when a
    /// monitor sits left of or above the primary one.
    pub origin: Point,
}

impl ScreenGrab {
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.origin.x,
            self.origin.y,
            self.image.width(),
            self.image.height(),
        )
    }

    /// Pixels under `rect` (screen coordinates), clamped to the desktop.
    pub fn crop_screen(&self, rect: Rect) -> Result<CapturedImage, CaptureError> {
        if rect.is_empty() {
            return Err(CaptureError::EmptyRegion);
        }
        let visible = self
            .bounds()
            .intersect(&rect)
            .ok_or(CaptureError::OutsideScreen(rect))?;
        if visible != rect {
            log::debug!("Region {} clamped to visible area {}", rect, visible);
        }
        self.image
            .crop(visible.relative_to(self.origin))
            .ok_or(CaptureError::OutsideScreen(rect))
    }
}

/// Abstraction over how desktop pixels are read.
pub trait ScreenSource: Send + Sync {
    fn grab(&self) -> Result<ScreenGrab, CaptureError>;
}

/// Reads every monitor through `xcap` and stitches them into one canvas.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapScreenSource;

impl ScreenSource for XcapScreenSource {
    fn grab(&self) -> Result<ScreenGrab, CaptureError> {
        let monitors = Monitor::all()
            .map_err(|e| CaptureError::Backend(format!("failed to enumerate monitors: {e}")))?;

        let mut tiles = Vec::with_capacity(monitors.len());
        for monitor in &monitors {
            let x = monitor
                .x()
                .map_err(|e| CaptureError::Backend(format!("monitor position: {e}")))?;
            let y = monitor
                .y()
                .map_err(|e| CaptureError::Backend(format!("monitor position: {e}")))?;
            let image = monitor
                .capture_image()
                .map_err(|e| CaptureError::Backend(e.to_string()))?;
            log::debug!(
                "Captured monitor '{}' at ({}, {}) {}x{}",
                monitor.name().unwrap_or_default(),
                x,
                y,
                image.width(),
                image.height()
            );
            tiles.push((Point::new(x, y), image));
        }

        stitch(tiles)
    }
}

/// Composites per-monitor images at their desktop offsets.
///
/// Gaps between monitors of different sizes stay opaque black.
pub(crate) fn stitch(tiles: Vec<(Point, RgbaImage)>) -> Result<ScreenGrab, CaptureError> {
    let mut tiles = tiles.into_iter();
    let Some((first_origin, first_image)) = tiles.next() else {
        return Err(CaptureError::Backend("no monitors reported".to_string()));
    };

    let rest: Vec<(Point, RgbaImage)> = tiles.collect();
    if rest.is_empty() {
        return Ok(ScreenGrab {
            image: CapturedImage::new(first_image),
            origin: first_origin,
        });
    }

    let tile_rect = |origin: Point, image: &RgbaImage| {
        Rect::new(origin.x, origin.y, image.width(), image.height())
    };
    let desktop = rest.iter().fold(tile_rect(first_origin, &first_image), |acc, (o, img)| {
        acc.union(&tile_rect(*o, img))
    });

    let mut canvas = RgbaImage::from_pixel(desktop.width, desktop.height, Rgba([0, 0, 0, 255]));
    for (origin, image) in std::iter::once((first_origin, first_image)).chain(rest) {
        let offset = Point::new(origin.x - desktop.x, origin.y - desktop.y);
        imageops::replace(&mut canvas, &image, i64::from(offset.x), i64::from(offset.y));
    }

    Ok(ScreenGrab {
        image: CapturedImage::new(canvas),
        origin: desktop.origin(),
    })
}

/// Produces images for the three capture kinds.
#[derive(Clone)]
pub struct CaptureBackend {
    source: Arc<dyn ScreenSource>,
    windows: Arc<dyn WindowSystem>,
}

impl CaptureBackend {
    pub fn new(source: Arc<dyn ScreenSource>, windows: Arc<dyn WindowSystem>) -> Self {
        Self { source, windows }
    }

    pub fn windows(&self) -> &dyn WindowSystem {
        self.windows.as_ref()
    }

    /// Whole virtual desktop plus its origin, used as the selection backdrop.
    pub fn grab(&self) -> Result<ScreenGrab, CaptureError> {
        self.source.grab()
    }

    /// Entire virtual desktop across all monitors.
    pub fn capture_full_screen(&self) -> Result<CapturedImage, CaptureError> {
        let grab = self.source.grab()?;
        log::info!("Captured full screen: {}", grab.bounds());
        Ok(grab.image)
    }

    /// Exactly `rect`, clamped to the desktop when partly off-screen.
    ///
    /// # Errors
    /// - [`CaptureError::EmptyRegion`] for a zero-area rectangle (no pixels are read)
    /// - [`CaptureError::OutsideScreen`] when nothing of `rect` is visible
    pub fn capture_region(&self, rect: Rect) -> Result<CapturedImage, CaptureError> {
        if rect.is_empty() {
            return Err(CaptureError::EmptyRegion);
        }
        let grab = self.source.grab()?;
        let image = grab.crop_screen(rect)?;
        log::info!("Captured region {}", rect);
        Ok(image)
    }

    /// Client area of `handle`, resolved now rather than at selection time.
    pub fn capture_window(&self, handle: WindowHandle) -> Result<CapturedImage, CaptureError> {
        let client = self.windows.client_rect(handle)?;
        if client.is_empty() {
            log::warn!("Window {} has an empty client area", handle);
            return Err(CaptureError::EmptyRegion);
        }
        log::info!("Capturing window {} client area {}", handle, client);
        self.capture_region(client)
    }
}
