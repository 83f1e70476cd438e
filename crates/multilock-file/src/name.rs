//! Lock name validation for directory-scoped providers.

use std::path::{Path, PathBuf};

use multilock_core::{LockError, LockResult};

/// Maps a lock name to a path inside `directory`.
///
/// Names become file names verbatim — slot families rely on the on-disk
/// names staying literal (`<name>.0`, `<name>.meta`) — so anything that
/// would escape the directory or confuse the filesystem is rejected rather
/// than rewritten.
pub(crate) fn lock_path(directory: &Path, name: &str) -> LockResult<PathBuf> {
    validate_name(name)?;
    Ok(directory.join(name))
}

fn validate_name(name: &str) -> LockResult<()> {
    if name.is_empty() {
        return Err(LockError::InvalidName("lock name cannot be empty".to_string()));
    }
    if name == "." || name == ".." {
        return Err(LockError::InvalidName(format!(
            "lock name '{name}' is not a file name"
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(LockError::InvalidName(format!(
            "lock name '{}' contains a path separator or NUL",
            name.escape_default()
        )));
    }
    Ok(())
}
