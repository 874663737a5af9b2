//! Full-desktop selection overlay.
//!
//! The frozen backdrop is painted dimmed, the live selection is painted from
//! the undimmed copy and framed in white. Window messages are turned into
//! [`OverlayEvent`]s in the window procedure and applied to the tracker by the
//! message loop in [`Win32Overlay::run`], so the tracker never leaves the
//! caller's stack.

use std::cell::RefCell;
use std::ffi::c_void;
use std::{mem, ptr};

use windows::Win32::Foundation::{HANDLE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BeginPaint, BitBlt, CreateCompatibleDC,
    CreateDIBSection, DIB_RGB_COLORS, DeleteDC, DeleteObject, EndPaint, FrameRect, GetStockObject,
    HBITMAP, HBRUSH, HDC, HGDIOBJ, InvalidateRect, PAINTSTRUCT, SRCCOPY, SelectObject, WHITE_BRUSH,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyState, ReleaseCapture, SetCapture, SetFocus, VK_CONTROL, VK_LWIN, VK_MENU, VK_RWIN,
    VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, IDC_CROSS,
    LoadCursorW, MSG, PostQuitMessage, PostThreadMessageW, RegisterClassW, SW_SHOW,
    SetForegroundWindow, ShowWindow,
    TranslateMessage, WINDOW_EX_STYLE, WINDOW_STYLE, WM_CLOSE, WM_ERASEBKGND, WM_HOTKEY,
    WM_KEYDOWN, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_PAINT, WM_RBUTTONDOWN,
    WM_SYSKEYDOWN, WNDCLASSW, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};
use windows::core::PCWSTR;

use super::wide;
use crate::capture::{CaptureError, CapturedImage, ScreenGrab};
use crate::config::{Action, Shortcuts};
use crate::geometry::{Point, Rect};
use crate::hotkey::KeyCombo;
use crate::region::{RegionTracker, SelectionOverlay};

const CLASS_NAME: &str = "MyCapSelectionOverlay";

#[derive(Debug, Clone)]
enum OverlayEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    Key(KeyCombo),
    Cancel,
}

/// Paint state shared with the window procedure.
struct PaintState {
    dimmed: HDC,
    bright: HDC,
    width: i32,
    height: i32,
    /// Current selection, overlay-local.
    selection: Option<RECT>,
}

thread_local! {
    static PAINT: RefCell<Option<PaintState>> = const { RefCell::new(None) };
    static EVENTS: RefCell<Vec<OverlayEvent>> = const { RefCell::new(Vec::new()) };
}

fn push_event(event: OverlayEvent) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

fn lparam_point(lparam: LPARAM) -> Point {
    Point::new(
        (lparam.0 & 0xffff) as i16 as i32,
        ((lparam.0 >> 16) & 0xffff) as i16 as i32,
    )
}

fn key_down(vk: u16) -> bool {
    unsafe { GetKeyState(i32::from(vk)) } < 0
}

fn pressed_combo(vk: u32) -> Option<KeyCombo> {
    KeyCombo::from_virtual_key(
        vk,
        key_down(VK_CONTROL.0),
        key_down(VK_SHIFT.0),
        key_down(VK_MENU.0),
        key_down(VK_LWIN.0) || key_down(VK_RWIN.0),
    )
}

fn paint(hwnd: HWND) {
    let mut ps = PAINTSTRUCT::default();
    let hdc = unsafe { BeginPaint(hwnd, &mut ps) };
    if !hdc.0.is_null() {
        PAINT.with(|state| {
            if let Some(state) = state.borrow().as_ref() {
                unsafe {
                    let _ = BitBlt(hdc, 0, 0, state.width, state.height, state.dimmed, 0, 0, SRCCOPY);
                    if let Some(sel) = state.selection {
                        let _ = BitBlt(
                            hdc,
                            sel.left,
                            sel.top,
                            sel.right - sel.left,
                            sel.bottom - sel.top,
                            state.bright,
                            sel.left,
                            sel.top,
                            SRCCOPY,
                        );
                        let brush = HBRUSH(GetStockObject(WHITE_BRUSH).0);
                        FrameRect(hdc, &sel, brush);
                    }
                }
            }
        });
    }
    unsafe {
        let _ = EndPaint(hwnd, &ps);
    }
}

unsafe extern "system" fn overlay_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_ERASEBKGND => LRESULT(1),
        WM_PAINT => {
            paint(hwnd);
            LRESULT(0)
        }
        WM_LBUTTONDOWN => {
            let _ = unsafe { SetCapture(hwnd) };
            push_event(OverlayEvent::Down(lparam_point(lparam)));
            LRESULT(0)
        }
        WM_MOUSEMOVE => {
            push_event(OverlayEvent::Move(lparam_point(lparam)));
            LRESULT(0)
        }
        WM_LBUTTONUP => {
            let _ = unsafe { ReleaseCapture() };
            push_event(OverlayEvent::Up(lparam_point(lparam)));
            LRESULT(0)
        }
        WM_RBUTTONDOWN | WM_CLOSE => {
            push_event(OverlayEvent::Cancel);
            LRESULT(0)
        }
        WM_KEYDOWN | WM_SYSKEYDOWN => {
            if let Some(combo) = pressed_combo(wparam.0 as u32) {
                push_event(OverlayEvent::Key(combo));
            }
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

/// A memory DC with a top-down 32-bit DIB selected into it.
struct MemoryBitmap {
    dc: HDC,
    bitmap: HBITMAP,
    previous: HGDIOBJ,
}

impl MemoryBitmap {
    /// Copies `image` into a new DIB; `dim` halves every channel.
    fn from_image(image: &CapturedImage, dim: bool) -> Result<Self, CaptureError> {
        let width = image.width() as i32;
        let height = image.height() as i32;

        let dc = unsafe { CreateCompatibleDC(HDC::default()) };
        if dc.0.is_null() {
            return Err(CaptureError::Overlay("CreateCompatibleDC failed".into()));
        }

        let mut bmi = BITMAPINFO::default();
        bmi.bmiHeader = BITMAPINFOHEADER {
            biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        };

        let mut bits: *mut c_void = ptr::null_mut();
        let bitmap = match unsafe {
            CreateDIBSection(dc, &bmi, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
        } {
            Ok(bitmap) if !bits.is_null() => bitmap,
            Ok(bitmap) => {
                unsafe {
                    let _ = DeleteObject(bitmap);
                    let _ = DeleteDC(dc);
                }
                return Err(CaptureError::Overlay("DIB section has no pixels".into()));
            }
            Err(e) => {
                unsafe {
                    let _ = DeleteDC(dc);
                }
                return Err(CaptureError::Overlay(format!("CreateDIBSection failed: {e}")));
            }
        };

        let rgba = image.as_raw();
        let dib = unsafe { std::slice::from_raw_parts_mut(bits as *mut u8, rgba.len()) };
        let shift = u32::from(dim);
        for (dst, src) in dib.chunks_exact_mut(4).zip(rgba.chunks_exact(4)) {
            dst[0] = src[2] >> shift;
            dst[1] = src[1] >> shift;
            dst[2] = src[0] >> shift;
            dst[3] = 255;
        }

        let previous = unsafe { SelectObject(dc, bitmap) };
        Ok(Self {
            dc,
            bitmap,
            previous,
        })
    }
}

impl Drop for MemoryBitmap {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.dc, self.previous);
            let _ = DeleteObject(self.bitmap);
            let _ = DeleteDC(self.dc);
        }
    }
}

/// Destroys the window and clears the thread-local state on every exit path.
struct OverlayWindow(HWND);

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseCapture();
            let _ = DestroyWindow(self.0);
        }
        PAINT.with(|state| state.borrow_mut().take());
        EVENTS.with(|events| events.borrow_mut().clear());
    }
}

fn create_window(bounds: Rect) -> Result<OverlayWindow, CaptureError> {
    let class_name = wide(CLASS_NAME);
    let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }
        .map_err(|e| CaptureError::Overlay(format!("no module handle: {e}")))?;

    static REGISTER_CLASS: std::sync::Once = std::sync::Once::new();
    REGISTER_CLASS.call_once(|| unsafe {
        let wc = WNDCLASSW {
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            lpfnWndProc: Some(overlay_wndproc),
            hCursor: LoadCursorW(None, IDC_CROSS).unwrap_or_default(),
            ..Default::default()
        };
        let _ = RegisterClassW(&wc);
    });

    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(WS_EX_TOPMOST.0 | WS_EX_TOOLWINDOW.0),
            PCWSTR(class_name.as_ptr()),
            PCWSTR::null(),
            WINDOW_STYLE(WS_POPUP.0),
            bounds.x,
            bounds.y,
            bounds.width as i32,
            bounds.height as i32,
            None,
            None,
            hinstance,
            None,
        )
    }
    .map_err(|e| CaptureError::Overlay(format!("CreateWindowExW failed: {e}")))?;

    Ok(OverlayWindow(hwnd))
}

fn to_local_rect(rect: Rect, origin: Point) -> RECT {
    let local = rect.relative_to(origin);
    RECT {
        left: local.x,
        top: local.y,
        right: local.x + local.width as i32,
        bottom: local.y + local.height as i32,
    }
}

/// Win32 implementation of the selection overlay.
pub struct Win32Overlay {
    shortcuts: Shortcuts,
}

impl Win32Overlay {
    /// `shortcuts` decides which key cancels (the `close_dialog` binding).
    pub fn new(shortcuts: Shortcuts) -> Self {
        Self { shortcuts }
    }

    fn apply(&self, event: OverlayEvent, tracker: &mut RegionTracker) {
        match event {
            OverlayEvent::Down(p) => tracker.pointer_down(p),
            OverlayEvent::Move(p) => {
                tracker.pointer_move(p);
            }
            OverlayEvent::Up(p) => {
                tracker.pointer_up(p);
            }
            OverlayEvent::Key(combo) => {
                if self.shortcuts.local_action(&combo) == Some(Action::CloseDialog) {
                    tracker.cancel();
                }
            }
            OverlayEvent::Cancel => tracker.cancel(),
        }
    }
}

impl SelectionOverlay for Win32Overlay {
    fn run(&mut self, backdrop: &ScreenGrab, tracker: &mut RegionTracker) -> Result<(), CaptureError> {
        let bounds = backdrop.bounds();
        let dimmed = MemoryBitmap::from_image(&backdrop.image, true)?;
        let bright = MemoryBitmap::from_image(&backdrop.image, false)?;

        let window = create_window(bounds)?;
        PAINT.with(|state| {
            *state.borrow_mut() = Some(PaintState {
                dimmed: dimmed.dc,
                bright: bright.dc,
                width: bounds.width as i32,
                height: bounds.height as i32,
                selection: None,
            })
        });

        unsafe {
            let _ = ShowWindow(window.0, SW_SHOW);
            let _ = SetForegroundWindow(window.0);
            let _ = SetFocus(window.0);
        }
        log::debug!("Selection overlay shown over {}", bounds);

        let mut msg = MSG::default();
        let mut deferred = Vec::new();
        let mut result = Ok(());
        while !tracker.is_finished() {
            let status = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
            match status.0 {
                0 => {
                    // Leave WM_QUIT for the outer loop.
                    unsafe { PostQuitMessage(msg.wParam.0 as i32) };
                    tracker.cancel();
                    break;
                }
                -1 => {
                    result = Err(CaptureError::Overlay("message loop failed".into()));
                    break;
                }
                _ => {}
            }

            if msg.message == WM_HOTKEY {
                log::debug!("Deferring hotkey {} until the selection ends", msg.wParam.0);
                deferred.push(msg);
                continue;
            }
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            let events = EVENTS.with(|events| mem::take(&mut *events.borrow_mut()));
            if events.is_empty() {
                continue;
            }
            for event in events {
                self.apply(event, tracker);
            }

            let selection = tracker.selection().map(|rect| to_local_rect(rect, bounds.origin()));
            PAINT.with(|state| {
                if let Some(state) = state.borrow_mut().as_mut() {
                    state.selection = selection;
                }
            });
            unsafe {
                let _ = InvalidateRect(window.0, None, false);
            }
        }

        // Window first, then the bitmaps it paints from.
        drop(window);
        drop(bright);
        drop(dimmed);

        repost_hotkeys(&deferred);
        result
    }
}

/// Puts hotkeys that fired during a selection back on the thread queue, so
/// the daemon sees them on its next drain.
fn repost_hotkeys(deferred: &[MSG]) {
    let thread = unsafe { GetCurrentThreadId() };
    for msg in deferred {
        if let Err(e) = unsafe { PostThreadMessageW(thread, WM_HOTKEY, msg.wParam, msg.lParam) } {
            log::warn!("Dropped hotkey {} fired during selection: {}", msg.wParam.0, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::UI::WindowsAndMessaging::{PM_NOREMOVE, PM_REMOVE, PeekMessageW};

    #[test]
    fn hotkeys_fired_during_selection_are_requeued() {
        let mut msg = MSG::default();
        // Make sure this thread owns a message queue.
        unsafe {
            let _ = PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_NOREMOVE);
        }

        let fired = MSG {
            message: WM_HOTKEY,
            wParam: WPARAM(7),
            ..Default::default()
        };
        repost_hotkeys(&[fired]);

        let found =
            unsafe { PeekMessageW(&mut msg, HWND::default(), WM_HOTKEY, WM_HOTKEY, PM_REMOVE) };
        assert!(found.as_bool());
        assert_eq!(msg.wParam.0, 7);
    }
}
