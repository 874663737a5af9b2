use std::thread;
use std::time::{Duration, Instant};

/// Bounded wait for the window manager to catch up.
///
/// Polls a platform acknowledgement until it holds or `timeout` passes, then
/// sleeps `grace` either way so the compositor can finish redrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settle {
    pub timeout: Duration,
    pub poll: Duration,
    pub grace: Duration,
}

impl Settle {
    /// After hiding the main surface.
    pub const HIDE: Settle = Settle {
        timeout: Duration::from_millis(300),
        poll: Duration::from_millis(10),
        grace: Duration::from_millis(50),
    };

    /// After asking a target window to come to the foreground.
    pub const ACTIVATE: Settle = Settle {
        timeout: Duration::from_millis(300),
        poll: Duration::from_millis(10),
        grace: Duration::from_millis(100),
    };

    /// No waiting at all.
    pub const NONE: Settle = Settle {
        timeout: Duration::ZERO,
        poll: Duration::ZERO,
        grace: Duration::ZERO,
    };

    /// Returns whether `done` held before the timeout.
    pub fn until(&self, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        let acknowledged = loop {
            if done() {
                break true;
            }
            if start.elapsed() >= self.timeout {
                log::debug!("Settle timed out after {:?}", self.timeout);
                break false;
            }
            thread::sleep(self.poll);
        };

        if !self.grace.is_zero() {
            thread::sleep(self.grace);
        }
        acknowledged
    }
}
