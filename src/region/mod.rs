//! Interactive region selection.
//!
//! [`RegionTracker`] is the pure state machine behind a drag gesture
//! (`Idle → Dragging → Committed | Cancelled`). A [`SelectionOverlay`] shows
//! the frozen desktop and feeds it pointer events; [`RegionSession`] ties the
//! two to the capture backend.

mod session;
mod tracker;

pub use session::{RegionListener, RegionSession, SelectionOverlay, UnsupportedOverlay};
pub use tracker::{RegionTracker, SelectionOutcome, TrackerState};

#[cfg(test)]
pub(crate) use session::tests::ScriptedOverlay;
