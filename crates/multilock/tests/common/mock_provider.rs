//! Mock provider for testing provider abstraction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use multilock_core::error::{LockError, LockResult};
use multilock_core::traits::{AdvisoryLock, LockHandle, LockProvider};

/// Mock lock handle for testing.
pub struct MockLockHandle {
    held: Arc<Mutex<bool>>,
}

impl LockHandle for MockLockHandle {
    async fn release(self) -> LockResult<()> {
        *self.held.lock().unwrap() = false;
        Ok(())
    }
}

impl Drop for MockLockHandle {
    fn drop(&mut self) {
        *self.held.lock().unwrap() = false;
    }
}

/// Mock advisory lock for testing.
pub struct MockAdvisoryLock {
    name: String,
    held: Arc<Mutex<bool>>,
}

impl AdvisoryLock for MockAdvisoryLock {
    type Handle = MockLockHandle;

    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire(&self, timeout: Option<Duration>) -> LockResult<Self::Handle> {
        let mut held = self.held.lock().unwrap();
        if *held {
            // A mock never gets released behind our back, so waiting is
            // pointless; report the bound as violated.
            return Err(LockError::Timeout(timeout.unwrap_or_default()));
        }
        *held = true;
        Ok(MockLockHandle {
            held: self.held.clone(),
        })
    }

    async fn try_acquire(&self) -> LockResult<Option<Self::Handle>> {
        let mut held = self.held.lock().unwrap();
        if *held {
            return Ok(None);
        }
        *held = true;
        Ok(Some(MockLockHandle {
            held: self.held.clone(),
        }))
    }
}

/// Mock provider for testing provider abstraction.
pub struct MockLockProvider {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<bool>>>>>,
}

impl MockLockProvider {
    /// Creates a new mock provider.
    pub fn new() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MockLockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LockProvider for MockLockProvider {
    type Lock = MockAdvisoryLock;

    fn create_lock(&self, name: &str) -> LockResult<Self::Lock> {
        let mut locks = self.locks.lock().unwrap();
        let held = locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(false)))
            .clone();
        Ok(MockAdvisoryLock {
            name: name.to_string(),
            held,
        })
    }
}
