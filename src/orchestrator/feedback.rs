//! How the user learns about a capture.

use std::io::{self, Write};

use crate::capture::CaptureResult;

use super::Trigger;

/// The visible surface of the host application.
pub trait MainSurface {
    fn hide(&mut self);
    fn show(&mut self);
    fn is_visible(&self) -> bool;
}

/// Surface for hosts that show nothing.
#[derive(Debug, Default)]
pub struct NullSurface;

impl MainSurface for NullSurface {
    fn hide(&mut self) {}

    fn show(&mut self) {}

    fn is_visible(&self) -> bool {
        false
    }
}

/// Shows an error or warning to the user.
pub trait Alerter {
    fn alert(&mut self, title: &str, message: &str);
}

/// Writes alerts to stderr.
#[derive(Debug, Default)]
pub struct ConsoleAlerter;

impl Alerter for ConsoleAlerter {
    fn alert(&mut self, title: &str, message: &str) {
        eprintln!("{title}: {message}");
    }
}

/// Reports a finished capture.
pub trait CaptureNotifier {
    fn notify(&mut self, result: &CaptureResult);
}

/// Reports size, clipboard state and path; the surface is shown again.
pub struct PreviewNotifier {
    out: Box<dyn Write>,
}

impl PreviewNotifier {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// One-line summary of `result`.
    pub fn summary(result: &CaptureResult) -> String {
        let mut line = format!(
            "Captured {}x{}",
            result.image.width(),
            result.image.height()
        );
        if result.copied_to_clipboard {
            line.push_str(", copied to clipboard");
        }
        match (&result.saved_path, &result.save_error) {
            (Some(path), _) => line.push_str(&format!(", saved to {}", path.display())),
            (None, Some(err)) => line.push_str(&format!(", not saved ({err})")),
            (None, None) => {}
        }
        line
    }
}

impl CaptureNotifier for PreviewNotifier {
    fn notify(&mut self, result: &CaptureResult) {
        let summary = Self::summary(result);
        log::info!("{}", summary);
        if let Err(e) = writeln!(self.out, "{summary}").and_then(|()| self.out.flush()) {
            log::warn!("Failed to print capture summary: {}", e);
        }
    }
}

/// Brief full-screen flash; the surface stays hidden.
pub struct FlashNotifier {
    flash: Box<dyn FnMut()>,
}

impl FlashNotifier {
    pub fn new(flash: impl FnMut() + 'static) -> Self {
        Self {
            flash: Box::new(flash),
        }
    }
}

impl CaptureNotifier for FlashNotifier {
    fn notify(&mut self, result: &CaptureResult) {
        log::info!("{}", PreviewNotifier::summary(result));
        (self.flash)();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMode {
    Preview,
    Flash,
}

impl FeedbackMode {
    /// Quiet mode only applies to captures started from a global hotkey.
    pub fn for_capture(quiet_mode: bool, trigger: Trigger) -> Self {
        if quiet_mode && trigger == Trigger::Hotkey {
            FeedbackMode::Flash
        } else {
            FeedbackMode::Preview
        }
    }
}

/// The two notifiers, picked per capture.
pub struct Feedback {
    preview: Box<dyn CaptureNotifier>,
    flash: Box<dyn CaptureNotifier>,
}

impl Feedback {
    pub fn new(preview: Box<dyn CaptureNotifier>, flash: Box<dyn CaptureNotifier>) -> Self {
        Self { preview, flash }
    }

    pub fn select(&mut self, mode: FeedbackMode) -> &mut dyn CaptureNotifier {
        match mode {
            FeedbackMode::Preview => self.preview.as_mut(),
            FeedbackMode::Flash => self.flash.as_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedImage;
    use image::RgbaImage;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn result(saved: Option<&str>, error: Option<&str>) -> CaptureResult {
        CaptureResult {
            image: CapturedImage::new(RgbaImage::new(640, 480)),
            saved_path: saved.map(PathBuf::from),
            copied_to_clipboard: true,
            save_error: error.map(str::to_string),
        }
    }

    #[test]
    fn quiet_mode_flashes_only_for_hotkeys() {
        assert_eq!(FeedbackMode::for_capture(true, Trigger::Hotkey), FeedbackMode::Flash);
        assert_eq!(FeedbackMode::for_capture(true, Trigger::Command), FeedbackMode::Preview);
        assert_eq!(FeedbackMode::for_capture(false, Trigger::Hotkey), FeedbackMode::Preview);
    }

    #[test]
    fn summary_mentions_path_or_error() {
        let saved = PreviewNotifier::summary(&result(Some("/tmp/capture.png"), None));
        assert_eq!(saved, "Captured 640x480, copied to clipboard, saved to /tmp/capture.png");

        let failed = PreviewNotifier::summary(&result(None, Some("disk full")));
        assert!(failed.ends_with("not saved (disk full)"));
    }

    #[test]
    fn flash_notifier_runs_flash() {
        let flashes = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&flashes);
        let mut notifier = FlashNotifier::new(move || *counter.lock().unwrap() += 1);
        notifier.notify(&result(None, None));
        assert_eq!(*flashes.lock().unwrap(), 1);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn preview_notifier_prints_summary() {
        let buf = SharedBuf::default();
        let mut notifier = PreviewNotifier::new(Box::new(buf.clone()));
        notifier.notify(&result(None, None));
        let printed = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(printed, "Captured 640x480, copied to clipboard\n");
    }
}
