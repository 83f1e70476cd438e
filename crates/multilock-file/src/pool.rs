//! Slot pools: at most one lock out of a bounded family of lock files.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{instrument, Span};

use multilock_core::{AdvisoryLock, Deadline, LockError, LockHandle, LockMode, LockResult, SlotLock};

use crate::handle::FileLockHandle;
use crate::lock::FileLock;
use crate::options::LockOptions;

/// A bounded family of lock files `<base>.0 .. <base>.(N-1)`.
///
/// Each allocation hands out at most one slot: an exclusive lock on one
/// member file, reusing a free pre-existing member or creating a missing
/// index. The scan-and-allocate sequence runs under an ephemeral meta-lock
/// on `<base>.meta`, so allocators for the same base never interleave
/// (allocators for different bases are unrelated). The family itself is
/// never persisted; it is whatever matching files exist at allocation time.
pub struct SlotPool {
    /// Base path; member files append `.<index>` to it.
    base: PathBuf,
    /// Pool name, derived from the base file name.
    name: String,
    /// Maximum number of concurrent holders.
    capacity: u32,
    options: LockOptions,
}

impl SlotPool {
    /// Creates a pool over `<base>.0 .. <base>.(capacity-1)`.
    pub fn new(base: impl Into<PathBuf>, capacity: u32) -> LockResult<Self> {
        let base = base.into();
        let name = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                LockError::InvalidName(format!(
                    "slot pool base '{}' has no file name",
                    base.display()
                ))
            })?;
        Ok(Self {
            base,
            name,
            capacity,
            options: LockOptions::default(),
        })
    }

    /// Replaces this pool's options.
    ///
    /// Slots are always taken exclusively; the mode in `options` is ignored.
    /// `create_mode` and `delete_on_release` apply to each slot file.
    pub fn with_options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the base path of the family.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn slot_options(&self) -> LockOptions {
        LockOptions {
            mode: LockMode::Exclusive,
            ..self.options
        }
    }

    /// `<base>.<suffix>` built without going through a string, so non-UTF-8
    /// base paths survive.
    fn member_path(&self, suffix: &str) -> PathBuf {
        let mut os = self.base.as_os_str().to_os_string();
        os.push(".");
        os.push(suffix);
        PathBuf::from(os)
    }

    /// Member files currently on disk: `<base>.<digits>`.
    ///
    /// The base name is matched literally, byte for byte; characters that
    /// would be magic in a shell glob match only themselves. `<base>.meta`
    /// never matches the all-digits suffix.
    fn discover_members(&self) -> LockResult<Vec<PathBuf>> {
        let dir = match self.base.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let Some(base_name) = self.base.file_name() else {
            return Err(LockError::InvalidName(format!(
                "slot pool base '{}' has no file name",
                self.base.display()
            )));
        };
        let mut prefix = base_name.to_os_string();
        prefix.push(".");
        let prefix = prefix.as_encoded_bytes();

        let scan_err =
            |e| LockError::io(format!("scan lock directory '{}'", dir.display()), e);
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let file_name = entry.file_name();
            let Some(suffix) = file_name.as_encoded_bytes().strip_prefix(prefix) else {
                continue;
            };
            if !suffix.is_empty() && suffix.iter().all(u8::is_ascii_digit) {
                found.push(dir.join(&file_name));
            }
        }
        found.sort();
        Ok(found)
    }

    /// One full allocation pass under the family's meta-lock.
    async fn try_acquire_internal(&self) -> LockResult<Option<FileLockHandle>> {
        // The meta-lock serializes every allocator for this base; it lives
        // only for this pass and its file is removed again on release.
        let meta_lock = FileLock::from_path(self.member_path("meta"))?
            .with_options(LockOptions::new().delete_on_release(true));
        let meta = meta_lock.acquire(None).await?;
        let outcome = self.allocate().await;
        meta.release().await?;
        outcome
    }

    async fn allocate(&self) -> LockResult<Option<FileLockHandle>> {
        let existing = self.discover_members()?;
        let options = self.slot_options();

        // First pass: whatever member files exist. First free one wins.
        let mut held = 0u32;
        for path in &existing {
            if held >= self.capacity {
                // Enough members are held elsewhere that the family is full
                // even if not every index exists yet.
                return Ok(None);
            }
            let lock = FileLock::from_path(path.clone())?.with_options(options);
            match lock.try_acquire().await? {
                Some(handle) => return Ok(Some(handle)),
                None => held += 1,
            }
        }
        if held >= self.capacity {
            return Ok(None);
        }

        // Second pass: synthesize a missing index. A member that was absent
        // during the scan has no holder, so the first one we create must
        // lock; anything else is an environment defect, not contention.
        let taken: HashSet<OsString> = existing
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect();
        for index in 0..self.capacity {
            let path = self.member_path(&index.to_string());
            let Some(file_name) = path.file_name() else { continue };
            if taken.contains(file_name) {
                continue;
            }
            let lock = FileLock::from_path(path.clone())?.with_options(options);
            return match lock.try_acquire().await? {
                Some(handle) => Ok(Some(handle)),
                None => Err(LockError::SlotInconsistency(format!(
                    "member '{}' did not exist during the scan yet refused to lock",
                    path.display()
                ))),
            };
        }
        Ok(None)
    }
}

impl SlotLock for SlotPool {
    type Handle = FileLockHandle;

    fn name(&self) -> &str {
        &self.name
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    #[instrument(skip(self), fields(pool.name = %self.name, pool.capacity = self.capacity, timeout = ?timeout))]
    async fn acquire(&self, timeout: Option<Duration>) -> LockResult<Self::Handle> {
        let deadline = Deadline::from(timeout);
        let mut backoff = crate::flock::Backoff::new();
        loop {
            match self.try_acquire_internal().await? {
                Some(handle) => {
                    Span::current().record("acquired", true);
                    return Ok(handle);
                }
                None => {
                    if deadline.expired() {
                        Span::current().record("acquired", false);
                        return Err(LockError::Timeout(deadline.bound().unwrap_or_default()));
                    }
                    backoff.wait(&deadline).await;
                }
            }
        }
    }

    #[instrument(skip(self), fields(pool.name = %self.name, pool.capacity = self.capacity))]
    async fn try_acquire(&self) -> LockResult<Option<Self::Handle>> {
        let result = self.try_acquire_internal().await;
        if let Ok(acquired) = &result {
            Span::current().record("acquired", acquired.is_some());
        }
        result
    }
}

/// Tries an explicit, ordered list of candidate lock files and returns the
/// first that can be locked exclusively, or `None` when every candidate is
/// held.
///
/// Unlike [`SlotPool`] there is no meta-lock: two callers walking the same
/// list can race each other past free candidates, which is acceptable when
/// the list is short or contention is rare.
pub async fn lock_any<I>(candidates: I, options: LockOptions) -> LockResult<Option<FileLockHandle>>
where
    I: IntoIterator,
    I::Item: Into<PathBuf>,
{
    let options = LockOptions {
        mode: LockMode::Exclusive,
        ..options
    };
    for candidate in candidates {
        let lock = FileLock::from_path(candidate)?.with_options(options);
        if let Some(handle) = lock.try_acquire().await? {
            return Ok(Some(handle));
        }
    }
    Ok(None)
}
