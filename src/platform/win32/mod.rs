//! Win32 implementations of the platform seams.

mod hotkeys;
mod overlay;
mod surface;

pub use hotkeys::Win32Hotkeys;
pub use overlay::Win32Overlay;
pub use surface::{ConsoleSurface, MessageBoxAlerter, flash_screen};

use std::ffi::{OsStr, c_void};
use std::os::windows::ffi::OsStrExt;

use windows::Win32::Foundation::{HWND, POINT, RECT};
use windows::Win32::Graphics::Gdi::ClientToScreen;
use windows::Win32::UI::HiDpi::{
    DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetProcessDpiAwarenessContext,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetClientRect, GetForegroundWindow, IsIconic, IsWindow, SW_RESTORE, SetForegroundWindow,
    ShowWindow,
};

use crate::capture::CaptureError;
use crate::geometry::Rect;
use crate::window::WindowHandle;

pub(crate) fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.raw() as usize as *mut c_void)
}

/// NUL-terminated UTF-16 copy of `value`.
pub(crate) fn wide(value: &str) -> Vec<u16> {
    OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// Screen coordinates match captured pixels only when the process is
/// per-monitor DPI aware.
pub fn enable_dpi_awareness() {
    if let Err(e) = unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) } {
        log::debug!("DPI awareness not changed: {}", e);
    }
}

fn is_window(handle: WindowHandle) -> bool {
    unsafe { IsWindow(hwnd(handle)) }.as_bool()
}

/// Client area of `handle` in screen coordinates.
pub fn client_rect(handle: WindowHandle) -> Result<Rect, CaptureError> {
    if !is_window(handle) {
        return Err(CaptureError::TargetGone(handle));
    }

    let window = hwnd(handle);
    let mut client = RECT::default();
    unsafe { GetClientRect(window, &mut client) }.map_err(|_| CaptureError::TargetGone(handle))?;

    let mut origin = POINT { x: 0, y: 0 };
    if !unsafe { ClientToScreen(window, &mut origin) }.as_bool() {
        return Err(CaptureError::TargetGone(handle));
    }

    Ok(Rect::new(
        origin.x,
        origin.y,
        (client.right - client.left).max(0) as u32,
        (client.bottom - client.top).max(0) as u32,
    ))
}

/// Restores `handle` if minimized and asks for it to become the foreground window.
pub fn activate_window(handle: WindowHandle) -> Result<(), CaptureError> {
    if !is_window(handle) {
        return Err(CaptureError::TargetGone(handle));
    }

    let window = hwnd(handle);
    unsafe {
        if IsIconic(window).as_bool() {
            log::debug!("Restoring minimized window {}", handle);
            let _ = ShowWindow(window, SW_RESTORE);
        }
        if !SetForegroundWindow(window).as_bool() {
            log::warn!("SetForegroundWindow refused for {}", handle);
        }
    }
    Ok(())
}

pub fn is_foreground(handle: WindowHandle) -> bool {
    unsafe { GetForegroundWindow() } == hwnd(handle)
}

pub fn open_folder(path: &std::path::Path) -> std::io::Result<()> {
    std::process::Command::new("explorer").arg(path).spawn().map(|_| ())
}
