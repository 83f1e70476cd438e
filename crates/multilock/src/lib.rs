//! Advisory file locks for cooperating processes on one host.
//!
//! This crate provides inter-process mutual exclusion built on OS advisory
//! file locks: single-file locks with shared/exclusive modes and bounded
//! waits, plus slot pools that hand out at most one lock from a family of
//! N candidate lock files (e.g. "run at most three instances of this job").
//! There is no central coordinator; the filesystem is the rendezvous.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use multilock::prelude::*;
//! use multilock::FileLockProvider;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Configure where lock files live
//!     let provider = FileLockProvider::builder()
//!         .directory("/tmp/multilock")
//!         .build()?;
//!
//!     // Create a lock by name
//!     let lock = provider.create_lock("my-resource")?;
//!
//!     // Acquire with a 5 second bound
//!     let handle = lock.acquire(Some(Duration::from_secs(5))).await?;
//!
//!     // Critical section - we have exclusive access
//!     println!("Doing critical work...");
//!
//!     // Release the lock (also happens automatically on drop)
//!     handle.release().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Slot pools
//!
//! A slot pool bounds how many holders may coexist by spreading them over a
//! family of lock files `<name>.0 .. <name>.(N-1)`:
//!
//! ```rust,no_run
//! use multilock::prelude::*;
//! use multilock::FileLockProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = FileLockProvider::builder()
//!         .directory("/tmp/multilock")
//!         .build()?;
//!
//!     let pool = provider.create_slot_pool("worker", 3)?;
//!     match pool.try_acquire().await? {
//!         Some(slot) => println!("claimed a worker slot"),
//!         None => println!("all worker slots are taken"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Semantics
//!
//! - **Contention is not an error**: non-blocking attempts and full pools
//!   report `Ok(None)`; a violated wait bound reports
//!   [`LockError::Timeout`](multilock_core::LockError::Timeout).
//! - **Shared and exclusive modes**: multiple shared holders may coexist;
//!   a held lock converts between modes in place via
//!   [`FileLockHandle::share`]/[`FileLockHandle::unshare`].
//! - **Lifetime-tied release**: dropping a handle releases the lock;
//!   explicit `release()` consumes the handle.
//! - **Unlink-safe acquisition**: after locking, the path is re-checked to
//!   still name the locked file, so a concurrently deleted-and-recreated
//!   lock file is never trusted.
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `multilock-core`: core traits and types
//! - `multilock-file`: the file-backed implementation
//!
//! For fine-grained control, you can depend on the individual crates
//! instead.

// Re-export core types and traits
pub use multilock_core::*;

// Re-export the file backend
pub use multilock_file::*;
