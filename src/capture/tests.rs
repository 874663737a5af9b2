use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use image::{Rgba, RgbaImage};

use super::{
    backend::{CaptureBackend, ScreenGrab, ScreenSource, stitch},
    dependencies::{CaptureClipboard, CaptureDependencies, CaptureFileSaver},
    file::{FileSaveConfig, SaveError},
    pipeline::deliver,
    types::{CaptureError, CapturedImage},
};
use crate::geometry::{Point, Rect};
use crate::window::tests::{FakeWindows, descriptor};
use crate::window::WindowHandle;

/// Desktop whose pixel at (x, y) encodes its own image coordinates.
#[derive(Clone)]
pub(crate) struct MockSource {
    pub origin: Point,
    pub width: u32,
    pub height: u32,
    pub error: Arc<Mutex<Option<CaptureError>>>,
    pub grabs: Arc<Mutex<usize>>,
}

impl MockSource {
    pub fn new(origin: Point, width: u32, height: u32) -> Self {
        Self {
            origin,
            width,
            height,
            error: Arc::new(Mutex::new(None)),
            grabs: Arc::new(Mutex::new(0)),
        }
    }

    pub fn fail_next(&self, err: CaptureError) {
        *self.error.lock().unwrap() = Some(err);
    }
}

impl ScreenSource for MockSource {
    fn grab(&self) -> Result<ScreenGrab, CaptureError> {
        *self.grabs.lock().unwrap() += 1;
        if let Some(err) = self.error.lock().unwrap().take() {
            return Err(err);
        }
        let image = RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        });
        Ok(ScreenGrab {
            image: CapturedImage::new(image),
            origin: self.origin,
        })
    }
}

#[derive(Clone)]
pub(crate) struct MockSaver {
    pub should_fail: bool,
    pub path: PathBuf,
    pub calls: Arc<Mutex<usize>>,
}

impl MockSaver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            should_fail: false,
            path: path.into(),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

impl CaptureFileSaver for MockSaver {
    fn save(&self, _image: &CapturedImage, _config: &FileSaveConfig) -> Result<PathBuf, SaveError> {
        *self.calls.lock().unwrap() += 1;
        if self.should_fail {
            Err(SaveError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "save failed",
            )))
        } else {
            Ok(self.path.clone())
        }
    }
}

#[derive(Clone)]
pub(crate) struct MockClipboard {
    pub should_fail: bool,
    pub calls: Arc<Mutex<usize>>,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

impl CaptureClipboard for MockClipboard {
    fn copy(&self, _image: &CapturedImage) -> Result<(), CaptureError> {
        *self.calls.lock().unwrap() += 1;
        if self.should_fail {
            Err(CaptureError::Clipboard("clipboard failure".to_string()))
        } else {
            Ok(())
        }
    }
}

pub(crate) fn mock_dependencies(
    source: MockSource,
    windows: FakeWindows,
    saver: MockSaver,
    clipboard: MockClipboard,
) -> CaptureDependencies {
    CaptureDependencies {
        source: Arc::new(source),
        windows: Arc::new(windows),
        saver: Arc::new(saver),
        clipboard: Arc::new(clipboard),
    }
}

fn backend_with(source: MockSource, windows: FakeWindows) -> CaptureBackend {
    CaptureBackend::new(Arc::new(source), Arc::new(windows))
}

fn small_image() -> CapturedImage {
    CapturedImage::new(RgbaImage::new(4, 4))
}

#[test]
fn full_screen_returns_whole_desktop() {
    let backend = backend_with(MockSource::new(Point::new(-1280, 0), 3200, 1080), FakeWindows::default());
    let image = backend.capture_full_screen().unwrap();
    assert_eq!((image.width(), image.height()), (3200, 1080));
}

#[test]
fn region_inside_screen_has_exact_dimensions() {
    let backend = backend_with(MockSource::new(Point::new(0, 0), 400, 300), FakeWindows::default());

    for rect in [
        Rect::new(0, 0, 400, 300),
        Rect::new(10, 20, 1, 1),
        Rect::new(150, 75, 123, 45),
        Rect::new(399, 299, 1, 1),
    ] {
        let image = backend.capture_region(rect).unwrap();
        assert_eq!((image.width(), image.height()), (rect.width, rect.height));
    }
}

#[test]
fn region_is_read_in_screen_coordinates() {
    // Desktop starts at x = -100, so screen x = -90 is image column 10.
    let backend = backend_with(MockSource::new(Point::new(-100, 0), 300, 200), FakeWindows::default());
    let image = backend.capture_region(Rect::new(-90, 5, 20, 20)).unwrap();
    assert_eq!(image.pixels().get_pixel(0, 0), &Rgba([10, 5, 0, 255]));
}

#[test]
fn region_partly_off_screen_is_clamped() {
    let backend = backend_with(MockSource::new(Point::new(0, 0), 400, 300), FakeWindows::default());
    let image = backend.capture_region(Rect::new(350, -50, 100, 100)).unwrap();
    assert_eq!((image.width(), image.height()), (50, 50));
}

#[test]
fn region_fully_off_screen_fails() {
    let backend = backend_with(MockSource::new(Point::new(0, 0), 400, 300), FakeWindows::default());
    let err = backend.capture_region(Rect::new(500, 500, 10, 10)).unwrap_err();
    assert!(matches!(err, CaptureError::OutsideScreen(_)));
}

#[test]
fn zero_area_region_fails_without_reading_pixels() {
    let source = MockSource::new(Point::new(0, 0), 400, 300);
    let grabs = Arc::clone(&source.grabs);
    let backend = backend_with(source, FakeWindows::default());

    let err = backend.capture_region(Rect::new(10, 10, 0, 50)).unwrap_err();
    assert!(matches!(err, CaptureError::EmptyRegion));
    assert_eq!(*grabs.lock().unwrap(), 0);
}

#[test]
fn source_failure_propagates() {
    let source = MockSource::new(Point::new(0, 0), 400, 300);
    source.fail_next(CaptureError::Backend("protected content".into()));
    let backend = backend_with(source, FakeWindows::default());

    let err = backend.capture_full_screen().unwrap_err();
    assert!(matches!(err, CaptureError::Backend(msg) if msg.contains("protected")));
}

#[test]
fn window_capture_uses_current_client_rect() {
    let windows = FakeWindows::with(vec![descriptor(7, "Editor", Rect::new(40, 30, 120, 80))]);
    let backend = backend_with(MockSource::new(Point::new(0, 0), 400, 300), windows);

    let image = backend.capture_window(WindowHandle::from_raw(7)).unwrap();
    assert_eq!((image.width(), image.height()), (120, 80));
    assert_eq!(image.pixels().get_pixel(0, 0), &Rgba([40, 30, 0, 255]));
}

#[test]
fn window_capture_after_close_reports_target_gone() {
    let windows = FakeWindows::with(vec![descriptor(7, "Editor", Rect::new(40, 30, 120, 80))]);
    windows.close(WindowHandle::from_raw(7));
    let backend = backend_with(MockSource::new(Point::new(0, 0), 400, 300), windows);

    let err = backend.capture_window(WindowHandle::from_raw(7)).unwrap_err();
    assert!(matches!(err, CaptureError::TargetGone(h) if h == WindowHandle::from_raw(7)));
}

#[test]
fn stitch_places_monitors_at_offsets() {
    let left = RgbaImage::from_pixel(100, 50, Rgba([255, 0, 0, 255]));
    let primary = RgbaImage::from_pixel(200, 100, Rgba([0, 255, 0, 255]));

    let grab = stitch(vec![(Point::new(0, 0), primary), (Point::new(-100, 25), left)]).unwrap();
    assert_eq!(grab.origin, Point::new(-100, 0));
    assert_eq!(grab.bounds(), Rect::new(-100, 0, 300, 100));

    let pixels = grab.image.pixels();
    assert_eq!(pixels.get_pixel(0, 30), &Rgba([255, 0, 0, 255]));
    assert_eq!(pixels.get_pixel(150, 10), &Rgba([0, 255, 0, 255]));
    // Above the left monitor nothing was captured.
    assert_eq!(pixels.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
}

#[test]
fn stitch_without_monitors_fails() {
    assert!(matches!(stitch(Vec::new()), Err(CaptureError::Backend(_))));
}

#[test]
fn deliver_copies_and_saves() {
    let saver = MockSaver::new("/tmp/capture.png");
    let saver_calls = Arc::clone(&saver.calls);
    let clipboard = MockClipboard::new();
    let clipboard_calls = Arc::clone(&clipboard.calls);
    let deps = mock_dependencies(
        MockSource::new(Point::new(0, 0), 10, 10),
        FakeWindows::default(),
        saver,
        clipboard,
    );

    let result = deliver(small_image(), Some(&FileSaveConfig::default()), &deps);
    assert!(result.copied_to_clipboard);
    assert_eq!(result.saved_path, Some(PathBuf::from("/tmp/capture.png")));
    assert!(result.save_error.is_none());
    assert_eq!(*saver_calls.lock().unwrap(), 1);
    assert_eq!(*clipboard_calls.lock().unwrap(), 1);
}

#[test]
fn deliver_without_auto_save_only_copies() {
    let saver = MockSaver::new("unused.png");
    let saver_calls = Arc::clone(&saver.calls);
    let deps = mock_dependencies(
        MockSource::new(Point::new(0, 0), 10, 10),
        FakeWindows::default(),
        saver,
        MockClipboard::new(),
    );

    let result = deliver(small_image(), None, &deps);
    assert!(result.copied_to_clipboard);
    assert!(result.saved_path.is_none());
    assert_eq!(*saver_calls.lock().unwrap(), 0);
}

#[test]
fn deliver_clipboard_failure_is_not_fatal() {
    let mut clipboard = MockClipboard::new();
    clipboard.should_fail = true;
    let deps = mock_dependencies(
        MockSource::new(Point::new(0, 0), 10, 10),
        FakeWindows::default(),
        MockSaver::new("/tmp/a.png"),
        clipboard,
    );

    let result = deliver(small_image(), Some(&FileSaveConfig::default()), &deps);
    assert!(!result.copied_to_clipboard);
    assert_eq!(result.saved_path, Some(PathBuf::from("/tmp/a.png")));
}

#[test]
fn deliver_save_failure_keeps_image() {
    let mut saver = MockSaver::new("/tmp/a.png");
    saver.should_fail = true;
    let deps = mock_dependencies(
        MockSource::new(Point::new(0, 0), 10, 10),
        FakeWindows::default(),
        saver,
        MockClipboard::new(),
    );

    let result = deliver(small_image(), Some(&FileSaveConfig::default()), &deps);
    assert!(result.saved_path.is_none());
    assert!(result.save_error.unwrap().contains("save failed"));
    assert_eq!(result.image.width(), 4);
    assert!(result.copied_to_clipboard);
}
