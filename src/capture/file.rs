//! File saving functionality for screenshots.

use chrono::{Local, NaiveDateTime};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::CapturedImage;
use crate::config::{ImageFormat, Settings};

/// Prefix of every auto-generated capture filename.
pub const FILENAME_PREFIX: &str = "capture";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Errors raised while writing a capture to disk.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Unsupported image format '{0}' (expected .png, .jpg, .jpeg or .bmp)")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Configuration for file saving.
#[derive(Debug, Clone)]
pub struct FileSaveConfig {
    /// Directory to save screenshots to.
    pub save_directory: PathBuf,
    /// Encoding used for generated filenames.
    pub format: ImageFormat,
}

impl FileSaveConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            save_directory: settings.save_directory.clone(),
            format: settings.default_format,
        }
    }
}

impl Default for FileSaveConfig {
    fn default() -> Self {
        Self {
            save_directory: crate::config::default_save_directory(),
            format: ImageFormat::Png,
        }
    }
}

/// Returns a path in `directory` that does not exist yet.
///
/// The first candidate is `capture_<YYYYMMDD_HHMMSS>.<ext>`; while a file with
/// that name exists, `_1`, `_2`, ... are appended to the stem.
pub fn generate_filename(
    directory: &Path,
    timestamp: &NaiveDateTime,
    format: ImageFormat,
) -> PathBuf {
    let stem = format!("{}_{}", FILENAME_PREFIX, timestamp.format(TIMESTAMP_FORMAT));
    let ext = format.extension();

    let mut candidate = directory.join(format!("{stem}.{ext}"));
    let mut counter: u32 = 1;
    while candidate.exists() {
        candidate = directory.join(format!("{stem}_{counter}.{ext}"));
        counter += 1;
    }
    candidate
}

/// Ensure the save directory exists, creating it if necessary.
///
/// # Returns
/// The canonicalized path to the directory
pub fn ensure_directory_exists(directory: &Path) -> Result<PathBuf, SaveError> {
    if !directory.exists() {
        log::info!("Creating screenshot directory: {}", directory.display());
        fs::create_dir_all(directory)?;
    }

    let canonical = directory
        .canonicalize()
        .unwrap_or_else(|_| directory.to_path_buf());

    Ok(canonical)
}

/// Encode `image` to `path`, picking the encoder from the file extension.
///
/// PNG and BMP keep the alpha channel; JPEG is written as RGB. Missing parent
/// directories are created.
///
/// # Errors
/// - [`SaveError::UnsupportedFormat`] for any extension other than png, jpg, jpeg or bmp
/// - [`SaveError::Io`] when the directory or file cannot be written
/// - [`SaveError::Encode`] when the encoder rejects the pixels
pub fn save_image(image: &CapturedImage, path: &Path) -> Result<PathBuf, SaveError> {
    let format = ImageFormat::from_path(path).ok_or_else(|| {
        SaveError::UnsupportedFormat(
            path.extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_directory_exists(parent)?;
    }

    log::info!(
        "Saving {}x{} screenshot to {} ({})",
        image.width(),
        image.height(),
        path.display(),
        format
    );

    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.pixels().clone()).to_rgb8();
            rgb.save_with_format(path, format.encoder_format())?;
        }
        ImageFormat::Png | ImageFormat::Bmp => {
            image
                .pixels()
                .save_with_format(path, format.encoder_format())?;
        }
    }

    let written_size = fs::metadata(path)?.len();
    log::debug!("File written: {} bytes", written_size);

    Ok(path.to_path_buf())
}

/// Save a capture under a freshly generated, non-colliding name.
///
/// # Returns
/// Path to the saved file
pub fn save_screenshot(image: &CapturedImage, config: &FileSaveConfig) -> Result<PathBuf, SaveError> {
    let directory = ensure_directory_exists(&config.save_directory)?;
    let file_path = generate_filename(&directory, &Local::now().naive_local(), config.format);

    save_image(image, &file_path)?;

    // Set permissions to user read/write only
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&file_path, Permissions::from_mode(0o600))?;
    }

    log::info!("Screenshot saved successfully: {}", file_path.display());

    Ok(file_path)
}
