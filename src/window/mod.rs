//! Window enumeration, selection and foreground activation.
//!
//! Window handles are weak: the window behind one can close at any moment. Every
//! operation that takes a [`WindowHandle`] re-validates it and reports
//! [`CaptureError::TargetGone`] instead of trusting a stale descriptor.

mod desktop;
mod picker;

pub use desktop::XcapWindowSystem;
pub use picker::{ConsolePicker, TitlePicker, WindowPicker};

use serde::Serialize;
use std::fmt;

use crate::capture::CaptureError;
use crate::geometry::Rect;

/// Opaque identifier of a top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Snapshot of a top-level window taken when the picker opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowDescriptor {
    pub handle: WindowHandle,
    pub title: String,
    pub app_name: String,
    /// Client area in screen coordinates at enumeration time.
    pub client_rect: Rect,
    pub minimized: bool,
}

/// Platform windowing operations used by window capture.
pub trait WindowSystem: Send + Sync {
    /// Every top-level window, in no particular order.
    fn top_level_windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError>;

    /// Current client area of `handle` in screen coordinates.
    fn client_rect(&self, handle: WindowHandle) -> Result<Rect, CaptureError>;

    fn is_alive(&self, handle: WindowHandle) -> bool {
        self.client_rect(handle).is_ok()
    }

    /// Restores `handle` if minimized and asks for it to become the foreground window.
    fn activate(&self, handle: WindowHandle) -> Result<(), CaptureError>;

    fn is_foreground(&self, handle: WindowHandle) -> bool;
}

/// Lists windows worth offering in the picker.
///
/// Windows without a title are dropped and the rest are sorted by title
/// (case-insensitive, ties broken by handle). Every call enumerates afresh.
pub fn list_capturable_windows(
    system: &dyn WindowSystem,
) -> Result<Vec<WindowDescriptor>, CaptureError> {
    let mut windows: Vec<WindowDescriptor> = system
        .top_level_windows()?
        .into_iter()
        .filter(|w| !w.title.trim().is_empty())
        .collect();

    windows.sort_by(|a, b| {
        a.title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then(a.handle.cmp(&b.handle))
    });

    log::debug!("Enumerated {} capturable windows", windows.len());
    Ok(windows)
}
