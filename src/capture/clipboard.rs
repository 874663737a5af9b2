//! Clipboard integration for copying screenshots.

use std::borrow::Cow;

use arboard::{Clipboard, ImageData};

use super::types::{CaptureError, CapturedImage};

/// Place `image` on the system clipboard as a bitmap.
///
/// Replaces whatever image the clipboard held before.
pub fn copy_to_clipboard(image: &CapturedImage) -> Result<(), CaptureError> {
    log::debug!(
        "Attempting to copy {}x{} screenshot to clipboard",
        image.width(),
        image.height()
    );

    let mut clipboard =
        Clipboard::new().map_err(|e| CaptureError::Clipboard(format!("open failed: {e}")))?;

    let data = ImageData {
        width: image.width() as usize,
        height: image.height() as usize,
        bytes: Cow::Borrowed(image.as_raw()),
    };

    clipboard
        .set_image(data)
        .map_err(|e| CaptureError::Clipboard(e.to_string()))?;

    log::info!("Copied screenshot to clipboard");
    Ok(())
}
