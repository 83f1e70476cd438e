//! Per-lock configuration.

use multilock_core::LockMode;

/// Configuration for a single lock object.
///
/// Whether an acquisition waits, and for how long, is not configured here:
/// that is chosen per call (`try_acquire` vs `acquire(timeout)`).
///
/// # Example
///
/// ```rust,ignore
/// let options = LockOptions::new().shared().delete_on_release(true);
/// let lock = FileLock::from_path("/run/myapp/job.lock")?.with_options(options);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Mode to acquire in.
    pub mode: LockMode,
    /// Permission bits applied if, and only if, acquisition creates the
    /// lock file. A pre-existing file keeps its bits.
    pub create_mode: Option<u32>,
    /// Remove the lock file when the handle is released.
    pub delete_on_release: bool,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            mode: LockMode::Exclusive,
            create_mode: None,
            delete_on_release: false,
        }
    }
}

impl LockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire in shared mode.
    pub fn shared(mut self) -> Self {
        self.mode = LockMode::Shared;
        self
    }

    /// Acquire in exclusive mode (the default).
    pub fn exclusive(mut self) -> Self {
        self.mode = LockMode::Exclusive;
        self
    }

    /// Sets the acquisition mode.
    pub fn mode(mut self, mode: LockMode) -> Self {
        self.mode = mode;
        self
    }

    /// Permission bits for a newly created lock file.
    pub fn create_mode(mut self, bits: u32) -> Self {
        self.create_mode = Some(bits);
        self
    }

    /// Remove the lock file on release.
    pub fn delete_on_release(mut self, delete: bool) -> Self {
        self.delete_on_release = delete;
        self
    }
}
