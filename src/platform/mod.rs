//! Platform seams.
//!
//! Everything that needs a native window system is picked here: the Win32
//! implementations on Windows, console stand-ins elsewhere so the capture
//! commands still run.

#[cfg(not(windows))]
mod headless;
#[cfg(windows)]
pub mod win32;

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

use crate::config::Shortcuts;
use crate::hotkey::HotkeyBackend;
use crate::orchestrator::{Alerter, FlashNotifier, MainSurface};
use crate::region::SelectionOverlay;

/// Process-wide setup that has to happen before the first capture.
pub fn init_process() {
    #[cfg(windows)]
    win32::enable_dpi_awareness();
}

/// Global hotkeys bound to the calling thread.
pub fn hotkey_backend() -> Box<dyn HotkeyBackend> {
    #[cfg(windows)]
    return Box::new(win32::Win32Hotkeys);
    #[cfg(not(windows))]
    return Box::new(headless::HeadlessHotkeys);
}

/// Region selection overlay honoring the `close_dialog` binding in `shortcuts`.
pub fn selection_overlay(shortcuts: &Shortcuts) -> Box<dyn SelectionOverlay> {
    #[cfg(windows)]
    return Box::new(win32::Win32Overlay::new(shortcuts.clone()));
    #[cfg(not(windows))]
    return headless::selection_overlay(shortcuts);
}

/// The window that is hidden while a capture runs.
pub fn main_surface() -> Box<dyn MainSurface> {
    #[cfg(windows)]
    return Box::new(win32::ConsoleSurface::new());
    #[cfg(not(windows))]
    return Box::new(crate::orchestrator::NullSurface);
}

/// Alerts for the daemon; one-shot commands report on stderr instead.
pub fn alerter() -> Box<dyn Alerter> {
    #[cfg(windows)]
    return Box::new(win32::MessageBoxAlerter);
    #[cfg(not(windows))]
    return Box::new(crate::orchestrator::ConsoleAlerter);
}

/// Quiet-mode notifier.
pub fn flash_notifier() -> FlashNotifier {
    #[cfg(windows)]
    return FlashNotifier::new(win32::flash_screen);
    #[cfg(not(windows))]
    return FlashNotifier::new(headless::flash_screen);
}

/// Opens `path` in the platform file manager without waiting for it.
pub fn open_folder(path: &Path) -> io::Result<()> {
    #[cfg(windows)]
    return win32::open_folder(path);
    #[cfg(not(windows))]
    return headless::open_folder(path);
}

/// Editor command for the settings file: `$VISUAL`, then `$EDITOR`, then the
/// platform default.
pub fn editor_command() -> String {
    std::env::var("VISUAL")
        .ok()
        .or_else(|| std::env::var("EDITOR").ok())
        .filter(|editor| !editor.trim().is_empty())
        .unwrap_or_else(|| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "vi".to_string()
            }
        })
}

/// Opens `path` in the editor and blocks until it exits.
pub fn edit_file(path: &Path) -> io::Result<ExitStatus> {
    let editor = editor_command();
    log::info!("Opening {} with {}", path.display(), editor);

    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("notepad");
    Command::new(program).args(parts).arg(path).status()
}
