//! Directory-scoped lock provider.

use std::path::{Path, PathBuf};

use multilock_core::{LockError, LockProvider, LockResult, SlotPoolProvider};

use crate::lock::FileLock;
use crate::name;
use crate::options::LockOptions;
use crate::pool::SlotPool;

/// Builder for file-based lock provider configuration.
pub struct FileLockProviderBuilder {
    directory: Option<PathBuf>,
    default_options: LockOptions,
}

impl FileLockProviderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            directory: None,
            default_options: LockOptions::default(),
        }
    }

    /// Sets the directory for lock files.
    ///
    /// The directory will be created if it doesn't exist.
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory = Some(path.into());
        self
    }

    /// Sets the options applied to locks this provider creates, unless a
    /// call overrides them.
    pub fn default_options(mut self, options: LockOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Builds the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is specified or if the directory
    /// cannot be created.
    pub fn build(self) -> LockResult<FileLockProvider> {
        let directory = self
            .directory
            .ok_or_else(|| LockError::InvalidName("directory not specified".to_string()))?;
        std::fs::create_dir_all(&directory).map_err(|e| {
            LockError::io(format!("create lock directory '{}'", directory.display()), e)
        })?;
        Ok(FileLockProvider {
            directory,
            default_options: self.default_options,
        })
    }
}

impl Default for FileLockProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider for file-based advisory locks.
///
/// Maps lock names to files in a configured directory, so application code
/// can create locks by name without caring where they live.
pub struct FileLockProvider {
    directory: PathBuf,
    default_options: LockOptions,
}

impl FileLockProvider {
    /// Returns a new builder for configuring the provider.
    pub fn builder() -> FileLockProviderBuilder {
        FileLockProviderBuilder::new()
    }

    /// Creates a provider using the specified directory.
    ///
    /// Convenience method for simple use cases.
    pub fn new(directory: impl Into<PathBuf>) -> LockResult<Self> {
        Self::builder().directory(directory).build()
    }

    /// Returns the directory where lock files are stored.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Creates a lock with explicit options.
    pub fn create_lock_with(&self, name: &str, options: LockOptions) -> LockResult<FileLock> {
        let path = name::lock_path(&self.directory, name)?;
        Ok(FileLock::from_path(path)?.with_options(options))
    }

    /// Creates a slot pool with explicit options.
    pub fn create_slot_pool_with(
        &self,
        name: &str,
        capacity: u32,
        options: LockOptions,
    ) -> LockResult<SlotPool> {
        let base = name::lock_path(&self.directory, name)?;
        Ok(SlotPool::new(base, capacity)?.with_options(options))
    }
}

impl LockProvider for FileLockProvider {
    type Lock = FileLock;

    fn create_lock(&self, name: &str) -> LockResult<Self::Lock> {
        self.create_lock_with(name, self.default_options)
    }
}

impl SlotPoolProvider for FileLockProvider {
    type Pool = SlotPool;

    fn create_slot_pool(&self, name: &str, capacity: u32) -> LockResult<Self::Pool> {
        self.create_slot_pool_with(name, capacity, self.default_options)
    }
}
