//! Thin shim over the OS advisory-lock facility.

use std::fs::File;
use std::io;
use std::time::{Duration, Instant};

use fs2::FileExt;

use multilock_core::{Deadline, LockMode};

/// One non-blocking `flock` in `mode` on `file`'s description.
///
/// Returns `Ok(true)` when the lock was granted, `Ok(false)` on contention.
/// Requesting a mode on a description that already holds the other mode
/// converts the held lock in place.
//
// Calls are spelled through `FileExt` so they cannot drift onto the inherent
// `File` locking methods newer standard libraries added under the same names.
pub(crate) fn try_lock(file: &File, mode: LockMode) -> io::Result<bool> {
    let result = match mode {
        LockMode::Shared => FileExt::try_lock_shared(file),
        LockMode::Exclusive => FileExt::try_lock_exclusive(file),
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if is_contended(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Drops whatever advisory lock `file`'s description holds.
pub(crate) fn unlock(file: &File) -> io::Result<()> {
    FileExt::unlock(file)
}

fn is_contended(err: &io::Error) -> bool {
    err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Retry pacing for contended locks: exponential backoff with jitter.
pub(crate) struct Backoff {
    sleep: Duration,
    started: Instant,
}

impl Backoff {
    const INITIAL: Duration = Duration::from_millis(10);
    const MIN_SLEEP: Duration = Duration::from_millis(5);
    const MAX_SLEEP: Duration = Duration::from_secs(1);

    pub(crate) fn new() -> Self {
        Self {
            sleep: Self::INITIAL,
            started: Instant::now(),
        }
    }

    /// Sleeps the current step (clamped to `deadline`) and doubles it.
    pub(crate) async fn wait(&mut self, deadline: &Deadline) {
        // Jitter of up to 25% of the step breaks up herds of pollers woken
        // together; derived from elapsed nanos to avoid pulling in a rng.
        let jitter_range = (self.sleep.as_millis() as u64) / 4;
        let jitter = if jitter_range > 0 {
            let nanos = self.started.elapsed().as_nanos() as u64;
            (nanos % (jitter_range * 2)).saturating_sub(jitter_range)
        } else {
            0
        };
        let step = self
            .sleep
            .checked_add(Duration::from_millis(jitter))
            .unwrap_or(self.sleep);
        tokio::time::sleep(deadline.clamp(step)).await;
        self.sleep = (self.sleep * 2).clamp(Self::MIN_SLEEP, Self::MAX_SLEEP);
    }
}
