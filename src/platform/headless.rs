//! Stand-ins for hosts without the Win32 window system.
//!
//! Screen grabs, window enumeration, saving and the clipboard work through
//! xcap and arboard; global hotkeys and the drag overlay do not.

use std::io;
use std::path::Path;
use std::process::Command;

use crate::config::Shortcuts;
use crate::hotkey::{HotkeyBackend, HotkeyError, KeyCombo};
use crate::region::{SelectionOverlay, UnsupportedOverlay};

/// Refuses every registration, so the daemon falls back to console commands.
#[derive(Debug, Default)]
pub struct HeadlessHotkeys;

impl HotkeyBackend for HeadlessHotkeys {
    fn register(&mut self, _id: i32, _combo: &KeyCombo, _no_repeat: bool) -> Result<(), HotkeyError> {
        Err(HotkeyError::Unsupported)
    }

    fn unregister(&mut self, _id: i32) -> Result<(), HotkeyError> {
        Ok(())
    }
}

pub fn selection_overlay(_shortcuts: &Shortcuts) -> Box<dyn SelectionOverlay> {
    Box::new(UnsupportedOverlay)
}

pub fn flash_screen() {
    log::debug!("Capture flash skipped: no overlay window on this platform");
}

pub fn open_folder(path: &Path) -> io::Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Command::new(opener).arg(path).spawn().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotkeys_are_unsupported() {
        let combo = KeyCombo::parse("Ctrl+Shift+S").unwrap();
        let mut hotkeys = HeadlessHotkeys;
        assert_eq!(hotkeys.register(1, &combo, true), Err(HotkeyError::Unsupported));
        assert!(hotkeys.unregister(1).is_ok());
        assert!(hotkeys.pending().is_empty());
    }
}
