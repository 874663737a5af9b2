//! Window system backed by `xcap` enumeration.
//!
//! On Windows the client area, activation and foreground checks go through
//! Win32 directly, because xcap only reports outer window bounds. Elsewhere the
//! outer bounds stand in for the client area and activation is a no-op.

use xcap::Window;

use super::{WindowDescriptor, WindowHandle, WindowSystem};
use crate::capture::CaptureError;
use crate::geometry::Rect;

#[derive(Debug, Default, Clone, Copy)]
pub struct XcapWindowSystem;

impl XcapWindowSystem {
    pub fn new() -> Self {
        Self
    }
}

fn outer_bounds(window: &Window) -> Rect {
    Rect::new(
        window.x().unwrap_or(0),
        window.y().unwrap_or(0),
        window.width().unwrap_or(0),
        window.height().unwrap_or(0),
    )
}

fn describe(window: &Window) -> Option<WindowDescriptor> {
    let id = window.id().ok()?;
    let handle = WindowHandle::from_raw(u64::from(id));
    let bounds = outer_bounds(window);

    #[cfg(windows)]
    let client_rect = crate::platform::win32::client_rect(handle).unwrap_or(bounds);
    #[cfg(not(windows))]
    let client_rect = bounds;

    Some(WindowDescriptor {
        handle,
        title: window.title().unwrap_or_default(),
        app_name: window.app_name().unwrap_or_default(),
        client_rect,
        minimized: window.is_minimized().unwrap_or(false),
    })
}

fn all_windows() -> Result<Vec<Window>, CaptureError> {
    Window::all().map_err(|e| CaptureError::Backend(format!("failed to list windows: {e}")))
}

#[cfg(not(windows))]
fn find_window(handle: WindowHandle) -> Result<Window, CaptureError> {
    all_windows()?
        .into_iter()
        .find(|w| w.id().ok().map(u64::from) == Some(handle.raw()))
        .ok_or(CaptureError::TargetGone(handle))
}

impl WindowSystem for XcapWindowSystem {
    fn top_level_windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError> {
        Ok(all_windows()?.iter().filter_map(describe).collect())
    }

    #[cfg(windows)]
    fn client_rect(&self, handle: WindowHandle) -> Result<Rect, CaptureError> {
        crate::platform::win32::client_rect(handle)
    }

    #[cfg(not(windows))]
    fn client_rect(&self, handle: WindowHandle) -> Result<Rect, CaptureError> {
        find_window(handle).map(|w| outer_bounds(&w))
    }

    #[cfg(windows)]
    fn activate(&self, handle: WindowHandle) -> Result<(), CaptureError> {
        crate::platform::win32::activate_window(handle)
    }

    #[cfg(not(windows))]
    fn activate(&self, handle: WindowHandle) -> Result<(), CaptureError> {
        let window = find_window(handle)?;
        if window.is_minimized().unwrap_or(false) {
            log::warn!("Window {} is minimized and cannot be restored here", handle);
        }
        log::debug!("Foreground activation unavailable; capturing {} in place", handle);
        Ok(())
    }

    #[cfg(windows)]
    fn is_foreground(&self, handle: WindowHandle) -> bool {
        crate::platform::win32::is_foreground(handle)
    }

    #[cfg(not(windows))]
    fn is_foreground(&self, handle: WindowHandle) -> bool {
        find_window(handle)
            .ok()
            .and_then(|w| w.is_focused().ok())
            .unwrap_or(true)
    }
}
