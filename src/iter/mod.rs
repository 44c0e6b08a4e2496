//! Lazy key iteration.
//!
//! [`KeyCursor`] is the explicit `has_next`/`next_key` protocol shared by
//! [`PagedKeyIterator`] (one prefix, paged transparently) and
//! [`ConcatenatedKeyIterator`] (several cursors back to back).  Both also
//! implement [`Iterator`] over `StorageResult<String>`.

mod concat;
mod paged;

pub use concat::ConcatenatedKeyIterator;
pub use paged::{PageSource, PagedKeyIterator};

use crate::errors::StorageResult;

/// A forward-only sequence of storage keys.
pub trait KeyCursor {
    /// Whether another key is available.  May fetch from the backend;
    /// repeated calls without `next_key` are idempotent.
    fn has_next(&mut self) -> StorageResult<bool>;

    /// Take the next key, or `NoSuchElement` when exhausted.
    fn next_key(&mut self) -> StorageResult<String>;
}
