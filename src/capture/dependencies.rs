use std::{path::PathBuf, sync::Arc};

use crate::capture::{
    backend::{CaptureBackend, ScreenSource, XcapScreenSource},
    clipboard,
    file::{self, FileSaveConfig, SaveError},
    types::{CaptureError, CapturedImage},
};
use crate::window::{WindowSystem, XcapWindowSystem};

/// Abstraction over file saving for captured screenshots.
pub trait CaptureFileSaver: Send + Sync {
    fn save(&self, image: &CapturedImage, config: &FileSaveConfig) -> Result<PathBuf, SaveError>;
}

/// Abstraction over copying screenshots to the clipboard.
pub trait CaptureClipboard: Send + Sync {
    fn copy(&self, image: &CapturedImage) -> Result<(), CaptureError>;
}

/// Bundle of dependencies used by the capture pipeline. Each component can be mocked in tests.
#[derive(Clone)]
pub struct CaptureDependencies {
    pub source: Arc<dyn ScreenSource>,
    pub windows: Arc<dyn WindowSystem>,
    pub saver: Arc<dyn CaptureFileSaver>,
    pub clipboard: Arc<dyn CaptureClipboard>,
}

impl CaptureDependencies {
    pub fn backend(&self) -> CaptureBackend {
        CaptureBackend::new(Arc::clone(&self.source), Arc::clone(&self.windows))
    }
}

impl Default for CaptureDependencies {
    fn default() -> Self {
        Self {
            source: Arc::new(XcapScreenSource),
            windows: Arc::new(XcapWindowSystem::new()),
            saver: Arc::new(DefaultFileSaver),
            clipboard: Arc::new(DefaultClipboard),
        }
    }
}

struct DefaultFileSaver;
struct DefaultClipboard;

impl CaptureFileSaver for DefaultFileSaver {
    fn save(&self, image: &CapturedImage, config: &FileSaveConfig) -> Result<PathBuf, SaveError> {
        file::save_screenshot(image, config)
    }
}

impl CaptureClipboard for DefaultClipboard {
    fn copy(&self, image: &CapturedImage) -> Result<(), CaptureError> {
        clipboard::copy_to_clipboard(image)
    }
}
