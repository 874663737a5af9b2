use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT, MOD_WIN, RegisterHotKey,
    UnregisterHotKey,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage, WM_HOTKEY,
};

use crate::hotkey::{HotkeyBackend, HotkeyError, KeyCombo};

/// `RegisterHotKey` against the calling thread's message queue.
///
/// Must be created, used and dropped on the UI thread: `WM_HOTKEY` is posted
/// to the thread that registered the key.
#[derive(Debug, Default)]
pub struct Win32Hotkeys;

fn modifiers(combo: &KeyCombo, no_repeat: bool) -> HOT_KEY_MODIFIERS {
    let mut flags = HOT_KEY_MODIFIERS(0);
    if combo.ctrl {
        flags = flags | MOD_CONTROL;
    }
    if combo.shift {
        flags = flags | MOD_SHIFT;
    }
    if combo.alt {
        flags = flags | MOD_ALT;
    }
    if combo.win {
        flags = flags | MOD_WIN;
    }
    if no_repeat {
        flags = flags | MOD_NOREPEAT;
    }
    flags
}

impl HotkeyBackend for Win32Hotkeys {
    fn register(&mut self, id: i32, combo: &KeyCombo, no_repeat: bool) -> Result<(), HotkeyError> {
        unsafe { RegisterHotKey(HWND::default(), id, modifiers(combo, no_repeat), combo.virtual_key()) }
            .map_err(|e| HotkeyError::Rejected(e.to_string()))
    }

    fn unregister(&mut self, id: i32) -> Result<(), HotkeyError> {
        unsafe { UnregisterHotKey(HWND::default(), id) }
            .map_err(|e| HotkeyError::Rejected(e.to_string()))
    }

    /// Drains the thread message queue, dispatching everything that is not a hotkey.
    fn pending(&mut self) -> Vec<i32> {
        let mut fired = Vec::new();
        let mut msg = MSG::default();
        while unsafe { PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE) }.as_bool() {
            if msg.message == WM_HOTKEY {
                fired.push(msg.wParam.0 as i32);
                continue;
            }
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        fired
    }
}
