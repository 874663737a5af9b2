use crate::capture::{CaptureBackend, CaptureError, CapturedImage, ScreenGrab};
use crate::geometry::Rect;

use super::tracker::{RegionTracker, SelectionOutcome};

/// Interactive surface that shows the backdrop and feeds pointer events to a
/// tracker until the gesture is finished.
pub trait SelectionOverlay {
    /// Returns once `tracker` is committed or cancelled.
    ///
    /// # Errors
    /// Returns an error when the overlay cannot be shown or dies mid-gesture.
    fn run(&mut self, backdrop: &ScreenGrab, tracker: &mut RegionTracker) -> Result<(), CaptureError>;
}

/// Told about every committed selection, before the region is captured.
pub trait RegionListener {
    fn region_committed(&mut self, rect: Rect);
}

impl<F: FnMut(Rect)> RegionListener for F {
    fn region_committed(&mut self, rect: Rect) {
        self(rect)
    }
}

/// One region-capture gesture: backdrop, overlay, commit, capture.
pub struct RegionSession<'a> {
    backend: &'a CaptureBackend,
    overlay: &'a mut dyn SelectionOverlay,
}

impl<'a> RegionSession<'a> {
    pub fn new(backend: &'a CaptureBackend, overlay: &'a mut dyn SelectionOverlay) -> Self {
        Self { backend, overlay }
    }

    /// Runs the selection and captures the chosen rectangle.
    ///
    /// Returns `Ok(None)` when the user cancelled.
    ///
    /// # Errors
    /// Backdrop, overlay and capture failures are returned as-is.
    pub fn select(
        &mut self,
        listener: &mut dyn RegionListener,
    ) -> Result<Option<CapturedImage>, CaptureError> {
        let backdrop = self.backend.grab()?;
        let mut tracker = RegionTracker::new(backdrop.origin);

        if let Err(e) = self.overlay.run(&backdrop, &mut tracker) {
            tracker.fail(&e);
            return Err(e);
        }
        // Overlay returning early without finishing is treated as a cancel.
        tracker.cancel();

        match tracker.outcome() {
            Some(SelectionOutcome::Committed(rect)) => {
                listener.region_committed(rect);
                // Cut from the frozen backdrop the user was looking at.
                backdrop.crop_screen(rect).map(Some)
            }
            Some(SelectionOutcome::Cancelled { error: Some(reason) }) => {
                Err(CaptureError::Overlay(reason))
            }
            _ => {
                log::info!("Region selection cancelled");
                Ok(None)
            }
        }
    }
}

/// Overlay for hosts without an interactive display.
#[derive(Debug, Default)]
pub struct UnsupportedOverlay;

impl SelectionOverlay for UnsupportedOverlay {
    fn run(&mut self, _backdrop: &ScreenGrab, _tracker: &mut RegionTracker) -> Result<(), CaptureError> {
        Err(CaptureError::Unsupported("Interactive region selection"))
    }
}
