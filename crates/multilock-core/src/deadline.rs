//! Per-call acquisition deadlines.

use std::time::{Duration, Instant};

/// Bound on a single blocking acquisition.
///
/// Built from the caller's optional timeout at the start of the call:
/// `None` waits indefinitely, `Some(d)` expires `d` after construction, and
/// `Some(Duration::ZERO)` permits exactly one attempt. The deadline is a
/// plain value scoped to the call; it carries no process-global timer state,
/// so nothing pending elsewhere is disturbed or needs restoring.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    bound: Option<Duration>,
    expires_at: Option<Instant>,
}

impl Deadline {
    /// True when this deadline never expires.
    pub fn is_infinite(&self) -> bool {
        self.expires_at.is_none()
    }

    /// The bound this deadline was created with, if any.
    pub fn bound(&self) -> Option<Duration> {
        self.bound
    }

    /// True once the bound has elapsed. An infinite deadline never expires.
    pub fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before expiry; `None` when infinite.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Clamps a proposed sleep to the remaining budget.
    pub fn clamp(&self, sleep: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => sleep.min(remaining),
            None => sleep,
        }
    }
}

impl From<Option<Duration>> for Deadline {
    fn from(timeout: Option<Duration>) -> Self {
        Self {
            bound: timeout,
            expires_at: timeout.map(|d| Instant::now() + d),
        }
    }
}
