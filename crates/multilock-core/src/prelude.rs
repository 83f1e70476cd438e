//! Convenience prelude for advisory lock types.

pub use crate::deadline::Deadline;
pub use crate::error::{LockError, LockResult};
pub use crate::mode::LockMode;
pub use crate::traits::{
    AdvisoryLock, LockHandle, LockProvider, LockProviderExt, SlotLock, SlotPoolProvider,
};
