//! Core traits for advisory locks.

use std::future::Future;
use std::time::Duration;

use crate::error::LockResult;

// ============================================================================
// Lock Handle Trait
// ============================================================================

/// Handle to a held lock.
///
/// Dropping this handle releases the lock. For explicit teardown, call
/// `release()` — it consumes the handle, so a second explicit release is
/// unrepresentable, and the underlying release routine is idempotent either
/// way.
///
/// # Example
///
/// ```rust,ignore
/// let handle = lock.acquire(None).await?;
/// // Critical section - we hold the lock
/// do_work().await;
/// handle.release().await?;
/// ```
pub trait LockHandle: Send + Sync + Sized {
    /// Explicitly releases the lock.
    ///
    /// This also happens automatically on drop. Release never fails: unlink
    /// or unlock problems during teardown are logged and swallowed.
    fn release(self) -> impl Future<Output = LockResult<()>> + Send;
}

// ============================================================================
// Advisory Lock Trait
// ============================================================================

/// A single advisory lock identified by name.
///
/// Provides mutual exclusion for cooperating processes on one host. The
/// backing object (a lock file, an in-memory slot in tests) determines how
/// the lock is realized.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_operation(lock: &impl AdvisoryLock) -> LockResult<()> {
///     // Acquire with a 5 second bound
///     let handle = lock.acquire(Some(Duration::from_secs(5))).await?;
///     perform_critical_section().await;
///     handle.release().await?;
///     Ok(())
/// }
/// ```
pub trait AdvisoryLock: Send + Sync {
    /// The handle type returned when the lock is acquired.
    type Handle: LockHandle + Send;

    /// Returns the name identifying this lock.
    fn name(&self) -> &str;

    /// Acquires the lock, waiting up to `timeout`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time to wait. `None` means wait indefinitely;
    ///   `Some(Duration::ZERO)` permits a single attempt.
    ///
    /// # Returns
    ///
    /// * `Ok(handle)` - Lock acquired
    /// * `Err(LockError::Timeout)` - The bound expired before the lock was
    ///   granted (distinguishable from a non-blocking miss by design: the
    ///   caller asked to wait and the wait was violated)
    /// * `Err(LockError::Io)` - An OS call failed
    fn acquire(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = LockResult<Self::Handle>> + Send;

    /// Attempts to acquire the lock without waiting.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(handle))` - Lock acquired
    /// * `Ok(None)` - Lock is held elsewhere (expected contention, not an
    ///   error)
    /// * `Err(...)` - An OS call failed
    fn try_acquire(&self) -> impl Future<Output = LockResult<Option<Self::Handle>>> + Send;
}

// ============================================================================
// Slot Lock Trait
// ============================================================================

/// A bounded family of locks, of which a caller holds at most one.
///
/// Up to `capacity` holders may coexist, each owning a distinct slot.
/// Useful for running at most N instances of a job on one host.
///
/// # Example
///
/// ```rust,ignore
/// // Allow three concurrent workers
/// let pool = provider.create_slot_pool("worker", 3)?;
///
/// match pool.try_acquire().await? {
///     Some(slot) => run_worker(slot).await,
///     None => println!("all worker slots are taken"),
/// }
/// ```
pub trait SlotLock: Send + Sync {
    /// Handle type for held slots.
    type Handle: LockHandle + Send;

    /// Returns the name identifying this slot family.
    fn name(&self) -> &str;

    /// Returns the maximum number of concurrent holders.
    fn capacity(&self) -> u32;

    /// Acquires a slot, waiting up to `timeout` for one to free up.
    fn acquire(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = LockResult<Self::Handle>> + Send;

    /// Attempts to acquire a slot without waiting.
    ///
    /// Returns `Ok(None)` when the family is full.
    fn try_acquire(&self) -> impl Future<Output = LockResult<Option<Self::Handle>>> + Send;
}

// ============================================================================
// Provider Traits
// ============================================================================

/// Factory for creating locks by name.
///
/// Providers encapsulate where lock files live, allowing application code to
/// stay backend-agnostic.
///
/// # Example
///
/// ```rust,ignore
/// // Configure once at startup
/// let provider = FileLockProvider::builder().directory("/run/myapp").build()?;
///
/// // Create locks by name anywhere in the application
/// let lock = provider.create_lock("my-resource")?;
/// let handle = lock.acquire(None).await?;
/// ```
pub trait LockProvider: Send + Sync {
    /// The lock type created by this provider.
    type Lock: AdvisoryLock;

    /// Creates a lock with the given name.
    ///
    /// Fails with `LockError::InvalidName` when the name cannot be mapped to
    /// a lock.
    fn create_lock(&self, name: &str) -> LockResult<Self::Lock>;
}

/// Factory for creating slot pools by name.
pub trait SlotPoolProvider: Send + Sync {
    /// The pool type created by this provider.
    type Pool: SlotLock;

    /// Creates a slot pool with the given name and capacity.
    fn create_slot_pool(&self, name: &str, capacity: u32) -> LockResult<Self::Pool>;
}

// ============================================================================
// Convenience Extensions
// ============================================================================

/// Extension trait providing convenience methods for lock providers.
pub trait LockProviderExt: LockProvider {
    /// Acquires a lock by name, returning the handle.
    ///
    /// Convenience method combining `create_lock` and `acquire`.
    fn acquire_lock(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = LockResult<<Self::Lock as AdvisoryLock>::Handle>> + Send
    where
        Self: Sync,
    {
        async move {
            let lock = self.create_lock(name)?;
            lock.acquire(timeout).await
        }
    }

    /// Tries to acquire a lock by name.
    ///
    /// Convenience method combining `create_lock` and `try_acquire`.
    fn try_acquire_lock(
        &self,
        name: &str,
    ) -> impl Future<Output = LockResult<Option<<Self::Lock as AdvisoryLock>::Handle>>> + Send
    where
        Self: Sync,
    {
        async move {
            let lock = self.create_lock(name)?;
            lock.try_acquire().await
        }
    }
}

// Blanket implementation for all LockProviders
impl<T: LockProvider> LockProviderExt for T {}
