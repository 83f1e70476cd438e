//! Path-based lock acquisition.

use std::fs::{File, OpenOptions, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, Span};

use multilock_core::{AdvisoryLock, Deadline, LockError, LockResult};

use crate::flock::{self, Backoff};
use crate::handle::FileLockHandle;
use crate::options::LockOptions;

/// An advisory lock backed by a file at a caller-chosen path.
///
/// The file's content is never read or written; only its existence and its
/// advisory-lock state matter. Acquisition opens the file (creating it if
/// absent), locks it, then re-checks that the path still names the file just
/// locked — defeating the race where another process unlinks and recreates
/// the lock file between our open and our lock.
pub struct FileLock {
    /// Full path to the lock file.
    path: PathBuf,
    /// Lock name, derived from the file name.
    name: String,
    options: LockOptions,
}

impl FileLock {
    /// Creates a lock for a specific file path with default options.
    pub fn from_path(path: impl Into<PathBuf>) -> LockResult<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                LockError::InvalidName(format!(
                    "lock path '{}' has no file name",
                    path.display()
                ))
            })?;
        Ok(Self {
            path,
            name,
            options: LockOptions::default(),
        })
    }

    /// Replaces this lock's options.
    pub fn with_options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns this lock's options.
    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Attempts to acquire the lock without waiting.
    async fn try_acquire_internal(&self) -> LockResult<Option<FileLockHandle>> {
        loop {
            let file = Arc::new(self.open_lock_file()?);
            match flock::try_lock(&file, self.options.mode) {
                Ok(true) => {}
                Ok(false) => return Ok(None),
                Err(e) => return Err(self.io_err("lock", e)),
            }
            if self.still_names_same_file(&file)? {
                return Ok(Some(FileLockHandle::new(
                    file,
                    Some(self.path.clone()),
                    &self.options,
                )));
            }
            // We locked a file that was unlinked or replaced after we opened
            // it. Let go and start over on whatever is at the path now.
            let _ = flock::unlock(&file);
        }
    }

    /// Acquires the lock, waiting up to `deadline` across open/lock retries.
    async fn acquire_internal(&self, deadline: Deadline) -> LockResult<FileLockHandle> {
        let mut backoff = Backoff::new();
        let mut contended = false;
        loop {
            let file = Arc::new(self.open_lock_file()?);
            loop {
                match flock::try_lock(&file, self.options.mode) {
                    Ok(true) => break,
                    Ok(false) => {
                        if !contended {
                            contended = true;
                            tracing::debug!(
                                path = %self.path.display(),
                                mode = %self.options.mode,
                                "lock contended, waiting"
                            );
                        }
                    }
                    Err(e) => return Err(self.io_err("lock", e)),
                }
                if deadline.expired() {
                    return Err(LockError::Timeout(deadline.bound().unwrap_or_default()));
                }
                backoff.wait(&deadline).await;
            }
            if self.still_names_same_file(&file)? {
                return Ok(FileLockHandle::new(
                    file,
                    Some(self.path.clone()),
                    &self.options,
                ));
            }
            let _ = flock::unlock(&file);
        }
    }

    /// Opens the lock file in append mode, creating it if absent.
    ///
    /// Permission bits from `create_mode` apply only when this call creates
    /// the file, and they apply exactly: the file is created `O_EXCL` and
    /// then `fchmod`ed on the open handle, out of reach of the umask. A
    /// pre-existing file keeps whatever bits it has. Open/create races with
    /// concurrent creators and unlinkers restart the probe.
    fn open_lock_file(&self) -> LockResult<File> {
        loop {
            match OpenOptions::new().append(true).open(&self.path) {
                Ok(file) => return Ok(file),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(self.io_err("open", e)),
            }
            let mut create = OpenOptions::new();
            create.append(true).create_new(true);
            if let Some(bits) = self.options.create_mode {
                create.mode(bits);
            }
            match create.open(&self.path) {
                Ok(file) => {
                    if let Some(bits) = self.options.create_mode {
                        file.set_permissions(Permissions::from_mode(bits))
                            .map_err(|e| self.io_err("set permissions on", e))?;
                    }
                    return Ok(file);
                }
                // Someone created it between our probe and our create.
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                // Anything else (a missing parent directory in particular)
                // is fatal, not a race.
                Err(e) => return Err(self.io_err("create", e)),
            }
        }
    }

    /// True when the path still names the description we just locked.
    fn still_names_same_file(&self, held: &File) -> LockResult<bool> {
        let on_disk = match std::fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.io_err("stat", e)),
        };
        let held_meta = held.metadata().map_err(|e| self.io_err("stat", e))?;
        Ok(on_disk.dev() == held_meta.dev() && on_disk.ino() == held_meta.ino())
    }

    fn io_err(&self, op: &str, e: std::io::Error) -> LockError {
        LockError::io(format!("{op} lock file '{}'", self.path.display()), e)
    }
}

impl AdvisoryLock for FileLock {
    type Handle = FileLockHandle;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.path = %self.path.display(), timeout = ?timeout, mode = %self.options.mode))]
    async fn acquire(&self, timeout: Option<Duration>) -> LockResult<Self::Handle> {
        let start = std::time::Instant::now();
        let result = self.acquire_internal(Deadline::from(timeout)).await;
        match &result {
            Ok(_) => {
                Span::current().record("acquired", true);
                Span::current().record("elapsed_ms", start.elapsed().as_millis() as u64);
            }
            Err(e) => {
                Span::current().record("acquired", false);
                Span::current().record("error", e.to_string());
            }
        }
        result
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.path = %self.path.display(), mode = %self.options.mode))]
    async fn try_acquire(&self) -> LockResult<Option<Self::Handle>> {
        let result = self.try_acquire_internal().await;
        match &result {
            Ok(Some(_)) => {
                Span::current().record("acquired", true);
            }
            Ok(None) => {
                Span::current().record("acquired", false);
                Span::current().record("reason", "lock_held");
            }
            Err(e) => {
                Span::current().record("acquired", false);
                Span::current().record("error", e.to_string());
            }
        }
        result
    }
}
