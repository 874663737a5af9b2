use crate::capture::{
    dependencies::CaptureDependencies,
    file::FileSaveConfig,
    types::{CaptureResult, CapturedImage},
};

/// Route a finished capture to the clipboard and, when `save_config` is set, to disk.
///
/// The clipboard always receives the image. Neither sink is fatal: a clipboard
/// failure clears `copied_to_clipboard` and a save failure fills `save_error`,
/// so the caller can still preview the image and report what went wrong.
pub fn deliver(
    image: CapturedImage,
    save_config: Option<&FileSaveConfig>,
    dependencies: &CaptureDependencies,
) -> CaptureResult {
    log::info!(
        "Delivering {}x{} capture (auto-save: {})",
        image.width(),
        image.height(),
        save_config.is_some()
    );

    let copied_to_clipboard = match dependencies.clipboard.copy(&image) {
        Ok(()) => {
            log::info!("Successfully copied to clipboard");
            true
        }
        Err(e) => {
            log::error!("Failed to copy to clipboard: {}", e);
            false
        }
    };

    let (saved_path, save_error) = match save_config {
        Some(config) => match dependencies.saver.save(&image, config) {
            Ok(path) => (Some(path), None),
            Err(e) => {
                log::error!("Auto-save failed: {}", e);
                (None, Some(e.to_string()))
            }
        },
        None => {
            log::debug!("Auto-save disabled for this capture");
            (None, None)
        }
    };

    CaptureResult {
        image,
        saved_path,
        copied_to_clipboard,
        save_error,
    }
}
