//! Screenshot capture functionality for mycap.
//!
//! This module provides screenshot capture capabilities including:
//! - Full virtual-desktop capture across all monitors
//! - Region capture with off-screen clamping
//! - Window client-area capture
//! - Clipboard integration
//! - File saving with collision-free names

pub mod backend;
pub mod clipboard;
pub mod file;
pub mod types;

mod dependencies;
mod pipeline;
#[cfg(test)]
pub(crate) mod tests;

pub use backend::{CaptureBackend, ScreenGrab, ScreenSource, XcapScreenSource};
pub use dependencies::{CaptureClipboard, CaptureDependencies, CaptureFileSaver};
pub use file::{FileSaveConfig, SaveError};
pub use pipeline::deliver;
pub use types::{CaptureError, CaptureOutcome, CaptureResult, CapturedImage};
