//! Capture orchestration.
//!
//! A capture request runs through the same steps regardless of kind:
//! choose the target, hide the main surface and let the screen settle, read
//! the pixels, restore the surface, then hand the image to the clipboard, the
//! save service and the notifier. Failures end up in the [`Alerter`]; a
//! cancelled selection ends quietly.

mod feedback;
mod settle;

pub use feedback::{
    Alerter, CaptureNotifier, ConsoleAlerter, Feedback, FeedbackMode, FlashNotifier, MainSurface,
    NullSurface, PreviewNotifier,
};
pub use settle::Settle;

use std::path::{Path, PathBuf};

use crate::capture::{
    self, CaptureBackend, CaptureDependencies, CaptureError, CaptureOutcome, CapturedImage,
    FileSaveConfig,
};
use crate::config::{Action, Settings, SettingsStore};
use crate::geometry::Rect;
use crate::region::{RegionSession, SelectionOverlay};
use crate::window::{TitlePicker, WindowHandle, WindowPicker, list_capturable_windows};

/// What to capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureKind {
    FullScreen,
    /// Interactive drag selection.
    Region,
    /// The last committed selection.
    RepeatRegion,
    /// Interactive window choice.
    Window,
    /// First window whose title contains the text.
    WindowMatching(String),
    /// A fixed rectangle in screen coordinates.
    Rect(Rect),
}

/// Who asked for the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Hotkey,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub kind: CaptureKind,
    pub trigger: Trigger,
}

impl CaptureRequest {
    pub fn new(kind: CaptureKind, trigger: Trigger) -> Self {
        Self { kind, trigger }
    }

    /// Request for a capture action, `None` for actions that capture nothing.
    pub fn from_action(action: Action, trigger: Trigger) -> Option<Self> {
        let kind = match action {
            Action::RegionSelect => CaptureKind::Region,
            Action::FullScreen => CaptureKind::FullScreen,
            Action::WindowCapture => CaptureKind::Window,
            Action::RepeatRegion => CaptureKind::RepeatRegion,
            _ => return None,
        };
        Some(Self::new(kind, trigger))
    }
}

/// Target resolved before the surface is hidden.
#[derive(Debug, Clone, Copy)]
enum Target {
    FullScreen,
    Region,
    Rect(Rect),
    Window(WindowHandle),
}

/// Interactive collaborators of the orchestrator.
pub struct UiParts {
    pub surface: Box<dyn MainSurface>,
    pub overlay: Box<dyn SelectionOverlay>,
    pub picker: Box<dyn WindowPicker>,
    pub feedback: Feedback,
    pub alerter: Box<dyn Alerter>,
}

/// Hides the surface for its lifetime and shows it on drop unless disarmed.
///
/// The show happens even when the surface was already hidden, so a surface
/// left hidden by an earlier quiet capture comes back on the next one.
struct SurfaceGuard<'a> {
    surface: &'a mut dyn MainSurface,
    restore: bool,
}

impl<'a> SurfaceGuard<'a> {
    fn hide(surface: &'a mut dyn MainSurface, settle: &Settle) -> Self {
        if surface.is_visible() {
            surface.hide();
            if !settle.until(|| !surface.is_visible()) {
                log::warn!("Main surface still visible after hiding");
            }
        }
        Self {
            surface,
            restore: true,
        }
    }

    fn keep_hidden(mut self) {
        self.restore = false;
    }
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        if self.restore {
            self.surface.show();
        }
    }
}

/// Runs capture requests on the UI thread.
pub struct CaptureOrchestrator {
    dependencies: CaptureDependencies,
    backend: CaptureBackend,
    ui: UiParts,
    store: Option<SettingsStore>,
    hide_settle: Settle,
    activate_settle: Settle,
    last_capture: Option<CapturedImage>,
}

impl CaptureOrchestrator {
    pub fn new(dependencies: CaptureDependencies, ui: UiParts) -> Self {
        let backend = dependencies.backend();
        Self {
            dependencies,
            backend,
            ui,
            store: None,
            hide_settle: Settle::HIDE,
            activate_settle: Settle::ACTIVATE,
            last_capture: None,
        }
    }

    /// Persist committed regions through `store`.
    pub fn with_store(mut self, store: SettingsStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_settle(mut self, hide: Settle, activate: Settle) -> Self {
        self.hide_settle = hide;
        self.activate_settle = activate;
        self
    }

    pub fn backend(&self) -> &CaptureBackend {
        &self.backend
    }

    pub fn last_capture(&self) -> Option<&CapturedImage> {
        self.last_capture.as_ref()
    }

    pub fn alert(&mut self, title: &str, message: &str) {
        self.ui.alerter.alert(title, message);
    }

    /// Swaps the selection overlay, e.g. after the cancel key was rebound.
    pub fn replace_overlay(&mut self, overlay: Box<dyn SelectionOverlay>) {
        self.ui.overlay = overlay;
    }

    pub fn surface_mut(&mut self) -> &mut dyn MainSurface {
        self.ui.surface.as_mut()
    }

    /// Runs one capture request end to end.
    pub fn run(&mut self, request: &CaptureRequest, settings: &mut Settings) -> CaptureOutcome {
        log::info!("Capture requested: {:?} via {:?}", request.kind, request.trigger);
        let mode = FeedbackMode::for_capture(settings.quiet_mode, request.trigger);

        let result = self
            .resolve_target(&request.kind, settings)
            .and_then(|target| match target {
                Some(target) => self.capture(target, mode, settings),
                None => Ok(None),
            });

        match result {
            Ok(Some(image)) => {
                let save_config = settings
                    .auto_save
                    .then(|| FileSaveConfig::from_settings(settings));
                let result = capture::deliver(image, save_config.as_ref(), &self.dependencies);

                if let Some(err) = &result.save_error {
                    self.ui.alerter.alert("Save failed", err);
                }
                self.ui.feedback.select(mode).notify(&result);
                self.last_capture = Some(result.image.clone());
                CaptureOutcome::Captured(result)
            }
            Ok(None) => {
                log::info!("Capture cancelled");
                CaptureOutcome::Cancelled
            }
            Err(e) => {
                log::error!("Capture failed: {}", e);
                self.ui.alerter.alert(e.title(), &e.to_string());
                CaptureOutcome::Failed(e.to_string())
            }
        }
    }

    /// Picks the capture target while the main surface is still visible.
    fn resolve_target(
        &mut self,
        kind: &CaptureKind,
        settings: &Settings,
    ) -> Result<Option<Target>, CaptureError> {
        let target = match kind {
            CaptureKind::FullScreen => Target::FullScreen,
            CaptureKind::Region => Target::Region,
            CaptureKind::Rect(rect) => Target::Rect(*rect),
            CaptureKind::RepeatRegion => {
                Target::Rect(settings.last_region.ok_or(CaptureError::NoSavedRegion)?)
            }
            CaptureKind::Window => {
                let windows = list_capturable_windows(self.backend.windows())?;
                match self.ui.picker.pick(&windows) {
                    Some(handle) => Target::Window(handle),
                    None => return Ok(None),
                }
            }
            CaptureKind::WindowMatching(needle) => {
                let windows = list_capturable_windows(self.backend.windows())?;
                let handle = TitlePicker::new(needle.as_str())
                    .pick(&windows)
                    .ok_or_else(|| CaptureError::NoMatchingWindow(needle.clone()))?;
                Target::Window(handle)
            }
        };
        Ok(Some(target))
    }

    /// Hides the surface, reads the pixels and restores the surface.
    fn capture(
        &mut self,
        target: Target,
        mode: FeedbackMode,
        settings: &mut Settings,
    ) -> Result<Option<CapturedImage>, CaptureError> {
        let Self {
            backend,
            ui,
            store,
            hide_settle,
            activate_settle,
            ..
        } = self;

        let guard = SurfaceGuard::hide(ui.surface.as_mut(), hide_settle);

        let image = match target {
            Target::FullScreen => backend.capture_full_screen().map(Some),
            Target::Rect(rect) => backend.capture_region(rect).map(Some),
            Target::Region => {
                let mut remember = |rect: Rect| {
                    settings.last_region = Some(rect);
                    if let Some(store) = store.as_ref()
                        && let Err(e) = store.remember_region(rect)
                    {
                        log::warn!("Failed to persist selected region: {}", e);
                    }
                };
                RegionSession::new(backend, ui.overlay.as_mut()).select(&mut remember)
            }
            Target::Window(handle) => {
                let windows = backend.windows();
                windows.activate(handle).and_then(|()| {
                    if !activate_settle.until(|| windows.is_foreground(handle) || !windows.is_alive(handle)) {
                        log::warn!("Window {} did not come to the foreground in time", handle);
                    }
                    backend.capture_window(handle).map(Some)
                })
            }
        }?;

        if image.is_some() && mode == FeedbackMode::Flash {
            guard.keep_hidden();
        }
        Ok(image)
    }

    /// Copies the most recent capture to the clipboard again.
    pub fn copy_last(&self) -> Result<(), CaptureError> {
        let image = self.last_capture.as_ref().ok_or(CaptureError::NothingCaptured)?;
        self.dependencies.clipboard.copy(image)
    }

    /// Writes the most recent capture to `path`, inferring the format from its extension.
    pub fn save_last_as(&self, path: &Path) -> Result<PathBuf, CaptureError> {
        let image = self.last_capture.as_ref().ok_or(CaptureError::NothingCaptured)?;
        Ok(capture::file::save_image(image, path)?)
    }

    /// Opens the save folder in the platform file manager.
    ///
    /// A missing folder is reported as a warning instead of being created.
    pub fn open_save_folder(&mut self, settings: &Settings) -> bool {
        let dir = &settings.save_directory;
        if !dir.is_dir() {
            log::warn!("Save folder {} does not exist", dir.display());
            self.ui.alerter.alert(
                "Open save folder",
                &format!(
                    "The save folder {} does not exist yet. It is created with the first saved capture.",
                    dir.display()
                ),
            );
            return false;
        }

        match crate::platform::open_folder(dir) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to open {}: {}", dir.display(), e);
                self.ui
                    .alerter
                    .alert("Open save folder", &format!("Could not open {}: {}", dir.display(), e));
                false
            }
        }
    }
}
