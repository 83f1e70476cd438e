//! File lock handles.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use multilock_core::{Deadline, LockError, LockHandle, LockMode, LockResult};

use crate::flock::{self, Backoff};
use crate::options::LockOptions;

/// Handle for a held file lock.
///
/// Holding the handle is holding the lock: dropping it releases the advisory
/// lock (and removes the lock file when configured to). A handle is created
/// only by a successful acquisition; its filename, once set, never changes.
///
/// The underlying file description is reference-counted. When the handle
/// opened the file itself, it is the sole owner and release closes the
/// description; when the caller supplied an already-open file, the caller's
/// clones keep the description alive, but the lock state still belongs to
/// this handle alone.
#[derive(Debug)]
pub struct FileLockHandle {
    /// The locked file description. `None` once released.
    file: Option<Arc<File>>,
    /// Path the lock was acquired under; `None` for caller-supplied files.
    path: Option<PathBuf>,
    /// Remove the lock file before unlocking on release.
    delete_on_release: bool,
    /// Mode currently held.
    mode: LockMode,
}

impl FileLockHandle {
    pub(crate) fn new(file: Arc<File>, path: Option<PathBuf>, options: &LockOptions) -> Self {
        Self {
            file: Some(file),
            path,
            delete_on_release: options.delete_on_release,
            mode: options.mode,
        }
    }

    /// Attempts to lock a caller-supplied open file without waiting.
    ///
    /// With no filename there is no unlink race to defend against and
    /// nothing to delete on release; the file's identity is the caller's
    /// problem. Returns `Ok(None)` when the lock is held elsewhere.
    pub async fn try_lock_file(file: Arc<File>, mode: LockMode) -> LockResult<Option<Self>> {
        match flock::try_lock(&file, mode) {
            Ok(true) => Ok(Some(Self {
                file: Some(file),
                path: None,
                delete_on_release: false,
                mode,
            })),
            Ok(false) => Ok(None),
            Err(e) => Err(LockError::io(format!("{mode} lock on open file"), e)),
        }
    }

    /// Locks a caller-supplied open file, waiting up to `timeout`.
    pub async fn lock_file(
        file: Arc<File>,
        mode: LockMode,
        timeout: Option<Duration>,
    ) -> LockResult<Self> {
        let deadline = Deadline::from(timeout);
        let mut backoff = Backoff::new();
        let mut contended = false;
        loop {
            match flock::try_lock(&file, mode) {
                Ok(true) => {
                    return Ok(Self {
                        file: Some(file),
                        path: None,
                        delete_on_release: false,
                        mode,
                    })
                }
                Ok(false) => {
                    if !contended {
                        contended = true;
                        tracing::debug!(%mode, "open-file lock contended, waiting");
                    }
                }
                Err(e) => return Err(LockError::io(format!("{mode} lock on open file"), e)),
            }
            if deadline.expired() {
                return Err(LockError::Timeout(deadline.bound().unwrap_or_default()));
            }
            backoff.wait(&deadline).await;
        }
    }

    /// Path the lock was acquired under, if it was acquired by name.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Mode currently held.
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Converts the held lock to shared mode, waiting until granted.
    pub async fn share(&mut self) -> LockResult<()> {
        self.convert(LockMode::Shared).await
    }

    /// Converts the held lock back to exclusive mode, waiting until granted.
    ///
    /// Blocks for as long as other shared holders remain. Mode transitions
    /// have no non-blocking or bounded variant.
    pub async fn unshare(&mut self) -> LockResult<()> {
        self.convert(LockMode::Exclusive).await
    }

    async fn convert(&mut self, target: LockMode) -> LockResult<()> {
        if self.mode == target {
            return Ok(());
        }
        let Some(file) = self.file.as_ref() else {
            return Err(LockError::io(
                format!("convert lock to {target}"),
                std::io::Error::other("handle already released"),
            ));
        };
        let deadline = Deadline::from(None);
        let mut backoff = Backoff::new();
        loop {
            match flock::try_lock(file, target) {
                Ok(true) => {
                    self.mode = target;
                    return Ok(());
                }
                Ok(false) => backoff.wait(&deadline).await,
                Err(e) => return Err(LockError::io(format!("convert lock to {target}"), e)),
            }
        }
    }

    /// Releases the lock; both explicit `release` and `Drop` funnel here.
    ///
    /// Never raises. Removes the lock file first when configured to, then
    /// unlocks; failures in either step (including an already-invalid
    /// description) are logged and swallowed, since release commonly runs
    /// during teardown where an error would mask whatever caused it.
    fn release_inner(&mut self) {
        let Some(file) = self.file.take() else { return };
        if self.delete_on_release {
            if let Some(path) = &self.path {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::debug!(path = %path.display(), error = %e, "ignoring unlink failure on release");
                }
            }
        }
        if let Err(e) = flock::unlock(&file) {
            tracing::debug!(error = %e, "ignoring unlock failure on release");
        }
        // Dropping the Arc closes the description once the caller's clones
        // (if any) are gone.
    }
}

impl LockHandle for FileLockHandle {
    #[instrument(skip(self), fields(lock.path = ?self.path))]
    async fn release(mut self) -> LockResult<()> {
        self.release_inner();
        Ok(())
    }
}

impl Drop for FileLockHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}
