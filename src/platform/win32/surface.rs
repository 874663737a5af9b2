use std::sync::Once;
use std::thread;
use std::time::{Duration, Instant};

use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{GetStockObject, HBRUSH, UpdateWindow, WHITE_BRUSH};
use windows::Win32::System::Console::GetConsoleWindow;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, IsWindowVisible,
    LWA_ALPHA, MB_ICONERROR, MB_OK, MB_SETFOREGROUND, MB_TOPMOST, MSG, MessageBoxW, PM_REMOVE,
    PeekMessageW, RegisterClassW, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN, SW_HIDE, SW_SHOW, SW_SHOWNA, SetForegroundWindow,
    SetLayeredWindowAttributes, ShowWindow, TranslateMessage, WINDOW_STYLE, WNDCLASSW,
    WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP, GetSystemMetrics,
};
use windows::core::PCWSTR;

use super::wide;
use crate::orchestrator::{Alerter, MainSurface};

const FLASH_DURATION: Duration = Duration::from_millis(120);
const FLASH_ALPHA: u8 = 150;

/// The console window hosting the process.
///
/// Terminals that do not expose a real console window report no surface;
/// hiding and showing are then no-ops.
#[derive(Debug)]
pub struct ConsoleSurface {
    hwnd: HWND,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            hwnd: unsafe { GetConsoleWindow() },
        }
    }

    fn present(&self) -> bool {
        !self.hwnd.0.is_null()
    }
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MainSurface for ConsoleSurface {
    fn hide(&mut self) {
        if self.present() {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_HIDE);
            }
        }
    }

    fn show(&mut self) {
        if self.present() {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_SHOW);
                let _ = SetForegroundWindow(self.hwnd);
            }
        }
    }

    fn is_visible(&self) -> bool {
        self.present() && unsafe { IsWindowVisible(self.hwnd) }.as_bool()
    }
}

/// Modal message box on top of everything.
#[derive(Debug, Default)]
pub struct MessageBoxAlerter;

impl Alerter for MessageBoxAlerter {
    fn alert(&mut self, title: &str, message: &str) {
        let text = wide(message);
        let caption = wide(&format!("MyCap - {title}"));
        unsafe {
            MessageBoxW(
                HWND::default(),
                PCWSTR(text.as_ptr()),
                PCWSTR(caption.as_ptr()),
                MB_OK | MB_ICONERROR | MB_TOPMOST | MB_SETFOREGROUND,
            );
        }
    }
}

unsafe extern "system" fn flash_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

/// Briefly covers the virtual desktop with a translucent white window.
pub fn flash_screen() {
    static REGISTER_CLASS: Once = Once::new();
    let class_name = wide("MyCapFlash");

    let Ok(hinstance) = (unsafe { GetModuleHandleW(PCWSTR::null()) }) else {
        log::warn!("Flash skipped: no module handle");
        return;
    };

    REGISTER_CLASS.call_once(|| unsafe {
        let wc = WNDCLASSW {
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            lpfnWndProc: Some(flash_wndproc),
            hbrBackground: HBRUSH(GetStockObject(WHITE_BRUSH).0),
            ..Default::default()
        };
        let _ = RegisterClassW(&wc);
    });

    let hwnd = unsafe {
        let (x, y, width, height) = (
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN),
            GetSystemMetrics(SM_CYVIRTUALSCREEN),
        );
        CreateWindowExW(
            WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
            PCWSTR(class_name.as_ptr()),
            PCWSTR::null(),
            WINDOW_STYLE(WS_POPUP.0),
            x,
            y,
            width,
            height,
            None,
            None,
            hinstance,
            None,
        )
    };
    let hwnd = match hwnd {
        Ok(hwnd) => hwnd,
        Err(e) => {
            log::warn!("Flash window could not be created: {}", e);
            return;
        }
    };

    unsafe {
        let _ = SetLayeredWindowAttributes(hwnd, COLORREF(0), FLASH_ALPHA, LWA_ALPHA);
        let _ = ShowWindow(hwnd, SW_SHOWNA);
        let _ = UpdateWindow(hwnd);
    }

    // Only this window's messages are pumped; hotkeys stay queued for the daemon.
    let shown = Instant::now();
    let mut msg = MSG::default();
    while shown.elapsed() < FLASH_DURATION {
        while unsafe { PeekMessageW(&mut msg, hwnd, 0, 0, PM_REMOVE) }.as_bool() {
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        thread::sleep(Duration::from_millis(10));
    }

    unsafe {
        let _ = DestroyWindow(hwnd);
    }
}
