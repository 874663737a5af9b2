//! Data types for screenshot capture functionality.

use std::fmt;
use std::path::PathBuf;

use image::{RgbaImage, imageops};
use thiserror::Error;

use super::file::SaveError;
use crate::geometry::Rect;
use crate::window::WindowHandle;

/// Pixels produced by a capture.
///
/// Always 8-bit RGBA (32 bits per pixel). The buffer is never mutated once
/// created; cropping produces a new image and encoding happens at save time.
#[derive(Clone, PartialEq)]
pub struct CapturedImage {
    pixels: RgbaImage,
}

impl CapturedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Wraps a raw RGBA buffer; `None` if its length does not match the size.
    pub fn from_raw(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, rgba).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Bounds of the image in its own coordinate space.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }

    /// Copies the pixels under `rect` (image coordinates), clamped to the image.
    ///
    /// Returns `None` when nothing of `rect` lies inside the image.
    pub fn crop(&self, rect: Rect) -> Option<CapturedImage> {
        let visible = self.bounds().intersect(&rect)?;
        let view = imageops::crop_imm(
            &self.pixels,
            visible.x as u32,
            visible.y as u32,
            visible.width,
            visible.height,
        );
        Some(CapturedImage::new(view.to_image()))
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Result of a screenshot capture operation.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub image: CapturedImage,
    /// Path where the image was saved (if auto-save ran and succeeded).
    pub saved_path: Option<PathBuf>,
    /// Whether the image was copied to clipboard.
    pub copied_to_clipboard: bool,
    /// Set when auto-save was requested but failed.
    pub save_error: Option<String>,
}

/// Outcome of a capture request.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Captured(CaptureResult),
    /// The user backed out of a selection; nothing was captured.
    Cancelled,
    Failed(String),
}

impl CaptureOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, CaptureOutcome::Captured(_))
    }
}

/// Errors that can occur during screenshot capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Screen capture failed: {0}")]
    Backend(String),

    #[error("Selected region has zero area")]
    EmptyRegion,

    #[error("Region {0} lies outside the visible screen")]
    OutsideScreen(Rect),

    #[error("Target window {0} no longer exists")]
    TargetGone(WindowHandle),

    #[error("No window title matches '{0}'")]
    NoMatchingWindow(String),

    #[error("No saved region to repeat yet")]
    NoSavedRegion,

    #[error("Nothing has been captured yet")]
    NothingCaptured,

    #[error("Selection overlay failed: {0}")]
    Overlay(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("Failed to save screenshot: {0}")]
    Save(#[from] SaveError),

    #[error("Clipboard operation failed: {0}")]
    Clipboard(String),
}

impl CaptureError {
    /// Short title used when the error is shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            CaptureError::TargetGone(_) | CaptureError::NoMatchingWindow(_) => "Window capture",
            CaptureError::Save(_) => "Save failed",
            CaptureError::Clipboard(_) => "Clipboard",
            CaptureError::EmptyRegion | CaptureError::NoSavedRegion | CaptureError::Overlay(_) => {
                "Region capture"
            }
            _ => "Capture failed",
        }
    }
}
