//! Global hotkeys.
//!
//! [`KeyCombo`] is the parsed form of a binding string. [`HotkeyDispatcher`]
//! keeps the action→id table and talks to the OS through a [`HotkeyBackend`];
//! the backend also reports fired ids so the daemon can queue them for the UI
//! thread.

mod binding;
mod dispatcher;

pub use binding::KeyCombo;
pub use dispatcher::{HotkeyBackend, HotkeyDispatcher, HotkeyError};
