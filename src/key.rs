//! Mapping from (base directory, logical path) to a storage key.

use crate::errors::{StorageError, StorageResult};

/// Join `base_directory` and `logical_path` with exactly one `/`.
///
/// `None` for the base directory is a caller error; pass `Some("")` for
/// "no prefix".  Slashes at the seam are collapsed and leading slashes are
/// dropped, so resolving already-normalized inputs is a no-op.
pub fn resolve(base_directory: Option<&str>, logical_path: &str) -> StorageResult<String> {
    let base = base_directory.ok_or_else(|| {
        StorageError::invalid("base directory is not set; use an empty string for no prefix")
    })?;

    let base = base.trim_start_matches('/').trim_end_matches('/');
    let path = logical_path.trim_start_matches('/');

    if base.is_empty() {
        Ok(path.to_string())
    } else {
        Ok(format!("{base}/{path}"))
    }
}

/// Canonical stored form of a base directory: no leading `/`, exactly one
/// trailing `/` unless empty.
pub fn normalize_base_directory(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}
