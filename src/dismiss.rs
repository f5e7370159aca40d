use std::time::{Duration, Instant};

use tracing::trace;

pub const DEFAULT_GRACE: Duration = Duration::from_millis(200);

/// A pending grace-window close. Dropping or replacing it is cancellation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimerHandle {
    pub id: u64,
    pub deadline: Instant,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Fired {
    GraceElapsed,
    ReleaseTick,
}

/// Deferred closes owned by one menu: at most one grace timer and one
/// next-tick release close.
#[derive(Debug)]
pub struct DismissTimers {
    grace: Duration,
    next_id: u64,
    blur: Option<TimerHandle>,
    release_armed: bool,
}

impl DismissTimers {
    pub fn new(grace: Duration) -> Self {
        DismissTimers {
            grace,
            next_id: 0,
            blur: None,
            release_armed: false,
        }
    }

    /// Start the grace window, superseding any pending one.
    pub fn start_grace(&mut self, now: Instant) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle {
            id: self.next_id,
            deadline: now + self.grace,
        };
        if let Some(old) = self.blur.replace(handle) {
            trace!(old = old.id, new = handle.id, "grace timer superseded");
        }
        handle
    }

    pub fn cancel_grace(&mut self) -> Option<TimerHandle> {
        self.blur.take()
    }

    pub fn pending_grace(&self) -> Option<TimerHandle> {
        self.blur
    }

    pub fn schedule_release(&mut self) {
        self.release_armed = true;
    }

    pub fn release_pending(&self) -> bool {
        self.release_armed
    }

    /// Collect everything due at `now`. The release close fires on the
    /// first poll after it was scheduled, whatever the time.
    pub fn poll(&mut self, now: Instant) -> Vec<Fired> {
        let mut fired = Vec::new();
        if std::mem::take(&mut self.release_armed) {
            fired.push(Fired::ReleaseTick);
        }
        if self.blur.is_some_and(|t| now >= t.deadline) {
            self.blur = None;
            fired.push(Fired::GraceElapsed);
        }
        fired
    }
}

impl Default for DismissTimers {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}
