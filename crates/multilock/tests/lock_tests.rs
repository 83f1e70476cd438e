//! Integration tests for single-file advisory locks.

use std::fs::OpenOptions;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::Duration;

use multilock::prelude::*;
use multilock::{FileLock, FileLockHandle, LockOptions};
use tempfile::TempDir;
use tokio::time::timeout;

fn lock_at(dir: &TempDir, name: &str) -> FileLock {
    FileLock::from_path(dir.path().join(name)).unwrap()
}

#[tokio::test]
async fn test_exclusive_lock_acquisition() {
    let dir = TempDir::new().unwrap();
    let lock = lock_at(&dir, "exclusive.lock");

    // First acquisition should succeed
    let handle1 = lock.try_acquire().await.unwrap();
    assert!(handle1.is_some());

    // Second acquisition should fail (lock is held)
    let second = lock_at(&dir, "exclusive.lock");
    let handle2 = second.try_acquire().await.unwrap();
    assert!(handle2.is_none());

    // Release the lock
    handle1.unwrap().release().await.unwrap();

    // Now acquisition should succeed
    let handle3 = second.try_acquire().await.unwrap();
    assert!(handle3.is_some());
}

#[tokio::test]
async fn test_shared_locks_coexist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.lock");

    let reader1 = FileLock::from_path(&path)
        .unwrap()
        .with_options(LockOptions::new().shared());
    let reader2 = FileLock::from_path(&path)
        .unwrap()
        .with_options(LockOptions::new().shared());

    let h1 = reader1.try_acquire().await.unwrap().unwrap();
    let h2 = reader2.try_acquire().await.unwrap().unwrap();
    assert_eq!(h1.mode(), LockMode::Shared);

    // Any exclusive request is shut out while sharers remain.
    let writer = FileLock::from_path(&path).unwrap();
    assert!(writer.try_acquire().await.unwrap().is_none());

    h1.release().await.unwrap();
    assert!(writer.try_acquire().await.unwrap().is_none());

    h2.release().await.unwrap();
    assert!(writer.try_acquire().await.unwrap().is_some());
}

#[tokio::test]
async fn test_blocking_acquire() {
    let dir = TempDir::new().unwrap();
    let lock = lock_at(&dir, "blocking.lock");
    let handle1 = lock.acquire(None).await.unwrap();

    // Spawn a task that waits for the same lock
    let path = dir.path().join("blocking.lock");
    let acquire_task = tokio::spawn(async move {
        let lock2 = FileLock::from_path(path).unwrap();
        lock2.acquire(Some(Duration::from_secs(5))).await
    });

    // Wait a bit to ensure the task is waiting
    tokio::time::sleep(Duration::from_millis(50)).await;

    handle1.release().await.unwrap();

    // The waiting task should now acquire the lock
    let result = timeout(Duration::from_secs(5), acquire_task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_timeout_expires_while_held() {
    let dir = TempDir::new().unwrap();
    let lock = lock_at(&dir, "timeout.lock");
    let _handle1 = lock.acquire(None).await.unwrap();

    let second = lock_at(&dir, "timeout.lock");
    let bound = Duration::from_millis(100);
    match second.acquire(Some(bound)).await {
        Err(LockError::Timeout(reported)) => assert_eq!(reported, bound),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_succeeds_when_released_in_time() {
    let dir = TempDir::new().unwrap();
    let lock = lock_at(&dir, "timely.lock");
    let handle1 = lock.acquire(None).await.unwrap();

    let path = dir.path().join("timely.lock");
    let waiter = tokio::spawn(async move {
        let lock2 = FileLock::from_path(path).unwrap();
        lock2.acquire(Some(Duration::from_secs(2))).await
    });

    // Release halfway into the waiter's budget.
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle1.release().await.unwrap();

    let result = waiter.await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_zero_timeout_reports_timeout_not_empty() {
    let dir = TempDir::new().unwrap();
    let lock = lock_at(&dir, "zero.lock");
    let handle1 = lock.try_acquire().await.unwrap().unwrap();

    // Same outcome as a non-blocking miss, but distinguishable: the caller
    // asked to wait (for zero time) and that bound was violated.
    let second = lock_at(&dir, "zero.lock");
    match second.acquire(Some(Duration::ZERO)).await {
        Err(LockError::Timeout(reported)) => assert_eq!(reported, Duration::ZERO),
        other => panic!("expected a timeout, got {other:?}"),
    }

    handle1.release().await.unwrap();
    let handle2 = second.acquire(Some(Duration::ZERO)).await;
    assert!(handle2.is_ok());
}

#[tokio::test]
async fn test_lock_release_on_drop() {
    let dir = TempDir::new().unwrap();
    let lock = lock_at(&dir, "drop.lock");

    {
        let _handle = lock.acquire(None).await.unwrap();
        // Handle dropped here
    }

    // Lock should now be available
    let handle2 = lock.try_acquire().await.unwrap();
    assert!(handle2.is_some());
}

#[tokio::test]
async fn test_delete_on_release() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ephemeral.lock");

    let lock = FileLock::from_path(&path)
        .unwrap()
        .with_options(LockOptions::new().delete_on_release(true));
    let handle = lock.try_acquire().await.unwrap().unwrap();
    assert!(path.exists(), "lock file should exist while held");
    handle.release().await.unwrap();
    assert!(!path.exists(), "lock file should be gone after release");

    // Without the flag, the (empty) file stays behind.
    let keep = FileLock::from_path(&path).unwrap();
    let handle2 = keep.try_acquire().await.unwrap().unwrap();
    handle2.release().await.unwrap();
    assert!(path.exists());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_mode_applies_only_on_creation() {
    let dir = TempDir::new().unwrap();

    // Fresh file: the requested bits land exactly, umask notwithstanding.
    let path = dir.path().join("fresh.lock");
    let lock = FileLock::from_path(&path)
        .unwrap()
        .with_options(LockOptions::new().create_mode(0o600));
    let handle = lock.try_acquire().await.unwrap().unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
    assert_eq!(mode, 0o600);
    handle.release().await.unwrap();

    // Pre-existing file keeps its bits.
    let existing = dir.path().join("existing.lock");
    std::fs::write(&existing, b"").unwrap();
    std::fs::set_permissions(&existing, std::fs::Permissions::from_mode(0o644)).unwrap();
    let lock2 = FileLock::from_path(&existing)
        .unwrap()
        .with_options(LockOptions::new().create_mode(0o600));
    let handle2 = lock2.try_acquire().await.unwrap().unwrap();
    let mode2 = std::fs::metadata(&existing).unwrap().permissions().mode() & 0o7777;
    assert_eq!(mode2, 0o644);
    handle2.release().await.unwrap();
}

#[tokio::test]
async fn test_recreated_lock_file_is_not_trusted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recreated.lock");

    let lock = FileLock::from_path(&path)
        .unwrap()
        .with_options(LockOptions::new().delete_on_release(true));
    let holder = lock.try_acquire().await.unwrap().unwrap();

    // A second owner starts waiting while the first one holds.
    let waiter_path = path.clone();
    let waiter = tokio::spawn(async move {
        let lock2 = FileLock::from_path(waiter_path).unwrap();
        lock2.acquire(Some(Duration::from_secs(5))).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Release deletes the file out from under the waiter's open
    // description. The waiter must notice the stale identity, reopen, and
    // come back armed on the file that is actually on disk.
    holder.release().await.unwrap();

    let handle = waiter.await.unwrap().unwrap();
    assert!(path.exists());

    // If the waiter were holding the unlinked inode instead, this third
    // attempt would wrongly succeed on the fresh file.
    let third = FileLock::from_path(&path).unwrap();
    assert!(third.try_acquire().await.unwrap().is_none());
    drop(handle);
}

#[tokio::test]
async fn test_share_and_unshare() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mode.lock");

    let lock = FileLock::from_path(&path).unwrap();
    let mut writer = lock.try_acquire().await.unwrap().unwrap();
    assert_eq!(writer.mode(), LockMode::Exclusive);

    // While exclusive, a shared attempt from elsewhere fails.
    let reader_lock = FileLock::from_path(&path)
        .unwrap()
        .with_options(LockOptions::new().shared());
    assert!(reader_lock.try_acquire().await.unwrap().is_none());

    // Downgrade lets the reader in.
    writer.share().await.unwrap();
    assert_eq!(writer.mode(), LockMode::Shared);
    let reader = reader_lock.try_acquire().await.unwrap().unwrap();

    // Upgrade waits for the other sharer to go away.
    let upgrade = tokio::spawn(async move {
        let mut writer = writer;
        writer.unshare().await.map(|()| writer)
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    reader.release().await.unwrap();

    let writer = timeout(Duration::from_secs(5), upgrade)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(writer.mode(), LockMode::Exclusive);

    // Exclusive again: shared attempts are shut out once more.
    assert!(reader_lock.try_acquire().await.unwrap().is_none());
    drop(writer);
}

#[tokio::test]
async fn test_lock_caller_supplied_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("open.lock");

    let f1 = Arc::new(std::fs::File::create(&path).unwrap());
    let f2 = Arc::new(OpenOptions::new().read(true).open(&path).unwrap());

    let handle = FileLockHandle::try_lock_file(f1.clone(), LockMode::Exclusive)
        .await
        .unwrap()
        .unwrap();
    // No filename was involved, so the handle has none.
    assert!(handle.path().is_none());

    // A different description on the same file contends.
    assert!(FileLockHandle::try_lock_file(f2.clone(), LockMode::Exclusive)
        .await
        .unwrap()
        .is_none());

    handle.release().await.unwrap();
    // Releasing never removes a caller-supplied file.
    assert!(path.exists());
    assert!(FileLockHandle::try_lock_file(f2, LockMode::Exclusive)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_blocking_lock_on_caller_supplied_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("open-wait.lock");

    let f1 = Arc::new(std::fs::File::create(&path).unwrap());
    let f2 = Arc::new(OpenOptions::new().read(true).open(&path).unwrap());

    let holder = FileLockHandle::try_lock_file(f1, LockMode::Exclusive)
        .await
        .unwrap()
        .unwrap();

    let waiter = tokio::spawn(async move {
        FileLockHandle::lock_file(f2, LockMode::Exclusive, Some(Duration::from_secs(5))).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    holder.release().await.unwrap();

    let result = waiter.await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_concurrent_independent_locks() {
    let dir = TempDir::new().unwrap();

    // Different paths are independent
    let lock1 = lock_at(&dir, "independent-1.lock");
    let lock2 = lock_at(&dir, "independent-2.lock");

    let handle1 = lock1.try_acquire().await.unwrap();
    let handle2 = lock2.try_acquire().await.unwrap();

    assert!(handle1.is_some());
    assert!(handle2.is_some());

    handle1.unwrap().release().await.unwrap();
    handle2.unwrap().release().await.unwrap();
}

#[tokio::test]
async fn test_invalid_lock_path() {
    // A path with no file name cannot become a lock.
    assert!(matches!(
        FileLock::from_path("/"),
        Err(LockError::InvalidName(_))
    ));
}

#[tokio::test]
async fn test_missing_parent_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no-such-dir").join("orphan.lock");

    let lock = FileLock::from_path(&path).unwrap();
    match lock.try_acquire().await {
        Err(LockError::Io { .. }) => {}
        other => panic!("expected an i/o error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lock_file_content_is_preserved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("content.lock");
    std::fs::write(&path, b"persistent data").unwrap();

    let lock = FileLock::from_path(&path).unwrap();
    let handle = lock.acquire(None).await.unwrap();

    // Acquisition must never truncate or rewrite the file.
    let data = std::fs::read(&path).unwrap();
    assert_eq!(data, b"persistent data");
    handle.release().await.unwrap();
}
