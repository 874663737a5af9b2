use crate::capture::{CaptureError, CapturedImage, ScreenGrab};
use crate::geometry::{Point, Rect};

/// Where a selection gesture currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Dragging { anchor: Point, current: Point },
    Committed(Rect),
    Cancelled,
}

/// Final result of a selection gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Committed(Rect),
    /// The user backed out, or `error` describes what went wrong.
    Cancelled { error: Option<String> },
}

/// Turns pointer events from the overlay into a screen rectangle.
///
/// Pointer positions are overlay-local; `origin` is the screen position of the
/// overlay's top-left pixel, which equals the backdrop origin.
#[derive(Debug)]
pub struct RegionTracker {
    origin: Point,
    state: TrackerState,
    error: Option<String>,
}

impl RegionTracker {
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            state: TrackerState::Idle,
            error: None,
        }
    }

    fn to_screen(&self, local: Point) -> Point {
        local.offset(self.origin.x, self.origin.y)
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            TrackerState::Committed(_) | TrackerState::Cancelled
        )
    }

    /// Starts a drag. Ignored unless idle.
    pub fn pointer_down(&mut self, local: Point) {
        if self.state != TrackerState::Idle {
            return;
        }
        let anchor = self.to_screen(local);
        log::debug!("Selection started at ({}, {})", anchor.x, anchor.y);
        self.state = TrackerState::Dragging {
            anchor,
            current: anchor,
        };
    }

    /// Updates the live rectangle; returns it while dragging.
    pub fn pointer_move(&mut self, local: Point) -> Option<Rect> {
        let point = self.to_screen(local);
        match &mut self.state {
            TrackerState::Dragging { anchor, current } => {
                *current = point;
                Some(Rect::from_corners(*anchor, point))
            }
            _ => None,
        }
    }

    /// Ends the drag: a non-empty rectangle commits, anything else cancels.
    pub fn pointer_up(&mut self, local: Point) -> Option<SelectionOutcome> {
        let point = self.to_screen(local);
        let TrackerState::Dragging { anchor, .. } = self.state else {
            return None;
        };

        let rect = Rect::from_corners(anchor, point);
        self.state = if rect.is_empty() {
            log::debug!("Selection released with zero area, cancelling");
            TrackerState::Cancelled
        } else {
            log::debug!("Selection committed: {}", rect);
            TrackerState::Committed(rect)
        };
        self.outcome()
    }

    pub fn cancel(&mut self) {
        if !self.is_finished() {
            log::debug!("Selection cancelled");
            self.state = TrackerState::Cancelled;
        }
    }

    /// Aborts the gesture because of `err`; the message is kept for reporting.
    pub fn fail(&mut self, err: &CaptureError) {
        log::warn!("Selection aborted: {}", err);
        self.error = Some(err.to_string());
        self.state = TrackerState::Cancelled;
    }

    /// Live rectangle while dragging, or the committed one.
    pub fn selection(&self) -> Option<Rect> {
        match self.state {
            TrackerState::Dragging { anchor, current } => Some(Rect::from_corners(anchor, current)),
            TrackerState::Committed(rect) => Some(rect),
            _ => None,
        }
    }

    /// Backdrop pixels under the current selection.
    pub fn preview(&self, backdrop: &ScreenGrab) -> Option<CapturedImage> {
        let rect = self.selection()?;
        backdrop.crop_screen(rect).ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn outcome(&self) -> Option<SelectionOutcome> {
        match self.state {
            TrackerState::Committed(rect) => Some(SelectionOutcome::Committed(rect)),
            TrackerState::Cancelled => Some(SelectionOutcome::Cancelled {
                error: self.error.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn drag(tracker: &mut RegionTracker, from: Point, to: Point) -> Option<SelectionOutcome> {
        tracker.pointer_down(from);
        tracker.pointer_move(Point::new((from.x + to.x) / 2, (from.y + to.y) / 2));
        tracker.pointer_move(to);
        tracker.pointer_up(to)
    }

    #[test]
    fn drag_in_every_direction_normalizes() {
        let expected = Rect::new(10, 20, 90, 60);
        let corners = [
            (Point::new(10, 20), Point::new(100, 80)),
            (Point::new(100, 80), Point::new(10, 20)),
            (Point::new(100, 20), Point::new(10, 80)),
            (Point::new(10, 80), Point::new(100, 20)),
        ];

        for (from, to) in corners {
            let mut tracker = RegionTracker::new(Point::new(0, 0));
            let outcome = drag(&mut tracker, from, to);
            assert_eq!(outcome, Some(SelectionOutcome::Committed(expected)), "{from:?} -> {to:?}");
        }
    }

    #[test]
    fn origin_is_min_of_anchor_and_release() {
        for (ax, ay, bx, by) in [(0, 0, 5, 7), (-40, 12, -80, 3), (300, -20, 299, 500), (7, 7, 8, 6)] {
            let mut tracker = RegionTracker::new(Point::new(0, 0));
            let Some(SelectionOutcome::Committed(rect)) =
                drag(&mut tracker, Point::new(ax, ay), Point::new(bx, by))
            else {
                panic!("expected commit for ({ax},{ay})->({bx},{by})");
            };
            assert_eq!((rect.x, rect.y), (ax.min(bx), ay.min(by)));
            assert_eq!(rect.width, ax.abs_diff(bx));
            assert_eq!(rect.height, ay.abs_diff(by));
        }
    }

    #[test]
    fn local_points_are_offset_by_origin() {
        let mut tracker = RegionTracker::new(Point::new(-1920, -100));
        let outcome = drag(&mut tracker, Point::new(20, 10), Point::new(120, 60));
        assert_eq!(
            outcome,
            Some(SelectionOutcome::Committed(Rect::new(-1900, -90, 100, 50)))
        );
    }

    #[test]
    fn zero_area_release_cancels() {
        let mut tracker = RegionTracker::new(Point::new(0, 0));
        assert_eq!(
            drag(&mut tracker, Point::new(50, 50), Point::new(50, 50)),
            Some(SelectionOutcome::Cancelled { error: None })
        );

        // A horizontal line has zero area too.
        let mut tracker = RegionTracker::new(Point::new(0, 0));
        assert_eq!(
            drag(&mut tracker, Point::new(10, 50), Point::new(90, 50)),
            Some(SelectionOutcome::Cancelled { error: None })
        );
    }

    #[test]
    fn move_reports_live_rectangle_only_while_dragging() {
        let mut tracker = RegionTracker::new(Point::new(0, 0));
        assert_eq!(tracker.pointer_move(Point::new(5, 5)), None);

        tracker.pointer_down(Point::new(10, 10));
        assert_eq!(
            tracker.pointer_move(Point::new(4, 30)),
            Some(Rect::new(4, 10, 6, 20))
        );
        assert_eq!(tracker.selection(), Some(Rect::new(4, 10, 6, 20)));
        assert!(tracker.outcome().is_none());
    }

    #[test]
    fn events_after_finish_are_ignored() {
        let mut tracker = RegionTracker::new(Point::new(0, 0));
        drag(&mut tracker, Point::new(0, 0), Point::new(10, 10));

        tracker.pointer_down(Point::new(50, 50));
        assert_eq!(tracker.pointer_move(Point::new(60, 60)), None);
        assert_eq!(tracker.pointer_up(Point::new(60, 60)), None);
        tracker.cancel();
        assert_eq!(tracker.state(), TrackerState::Committed(Rect::new(0, 0, 10, 10)));
    }

    #[test]
    fn release_without_press_does_nothing() {
        let mut tracker = RegionTracker::new(Point::new(0, 0));
        assert_eq!(tracker.pointer_up(Point::new(3, 3)), None);
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn cancel_while_dragging() {
        let mut tracker = RegionTracker::new(Point::new(0, 0));
        tracker.pointer_down(Point::new(1, 1));
        tracker.pointer_move(Point::new(40, 40));
        tracker.cancel();
        assert_eq!(
            tracker.outcome(),
            Some(SelectionOutcome::Cancelled { error: None })
        );
        assert_eq!(tracker.selection(), None);
    }

    #[test]
    fn failure_cancels_and_keeps_error() {
        let mut tracker = RegionTracker::new(Point::new(0, 0));
        tracker.pointer_down(Point::new(1, 1));
        tracker.fail(&CaptureError::Overlay("window lost".into()));

        match tracker.outcome() {
            Some(SelectionOutcome::Cancelled { error: Some(msg) }) => {
                assert!(msg.contains("window lost"))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn preview_crops_backdrop_in_screen_space() {
        let backdrop = ScreenGrab {
            image: CapturedImage::new(RgbaImage::from_fn(200, 100, |x, y| {
                Rgba([x as u8, y as u8, 0, 255])
            })),
            origin: Point::new(-100, 0),
        };
        let mut tracker = RegionTracker::new(backdrop.origin);
        assert!(tracker.preview(&backdrop).is_none());

        tracker.pointer_down(Point::new(30, 20));
        tracker.pointer_move(Point::new(70, 50));
        let preview = tracker.preview(&backdrop).unwrap();
        assert_eq!((preview.width(), preview.height()), (40, 30));
        assert_eq!(preview.pixels().get_pixel(0, 0), &Rgba([30, 20, 0, 255]));
    }
}
