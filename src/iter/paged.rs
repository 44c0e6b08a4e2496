//! Lazy iteration over one prefix's keys.
//!
//! [`PagedKeyIterator`] pulls pages from a [`PageSource`] on demand and
//! follows the continuation cursor until the listing is complete.

use std::collections::VecDeque;

use super::KeyCursor;
use crate::errors::{StorageError, StorageResult};
use crate::storage::backend::KeyPage;

/// Something that can serve one page of a prefix listing.
pub trait PageSource {
    fn fetch_page(&self, prefix: &str, cursor: Option<&str>) -> StorageResult<KeyPage>;
}

enum Lookahead {
    /// Nothing buffered for the current position yet.
    NeedFetch,
    /// The next key, already pulled from the page buffer.
    Ready(String),
    /// No more keys, ever.
    Exhausted,
}

/// All keys under one prefix, fetched a page at a time.
///
/// A page is only requested once the keys of the previous one have been
/// handed out, so memory stays bounded by the backend's page size no matter
/// how many keys the prefix holds.
pub struct PagedKeyIterator<'a, S: PageSource + ?Sized> {
    source: &'a S,
    prefix: String,
    page: VecDeque<String>,
    cursor: Option<String>,
    more_pages: bool,
    state: Lookahead,
}

impl<'a, S: PageSource + ?Sized> PagedKeyIterator<'a, S> {
    /// No request is made until the first `has_next`.
    pub fn new(source: &'a S, prefix: impl Into<String>) -> Self {
        Self {
            source,
            prefix: prefix.into(),
            page: VecDeque::new(),
            cursor: None,
            more_pages: true,
            state: Lookahead::NeedFetch,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// NeedFetch -> Ready | Exhausted.
    fn advance(&mut self) -> StorageResult<()> {
        loop {
            if let Some(key) = self.page.pop_front() {
                self.state = Lookahead::Ready(key);
                return Ok(());
            }
            if !self.more_pages {
                self.state = Lookahead::Exhausted;
                return Ok(());
            }
            // Pages may be empty and still carry a cursor; keep going.
            let KeyPage { keys, next_cursor } =
                self.source.fetch_page(&self.prefix, self.cursor.as_deref())?;
            self.more_pages = next_cursor.is_some();
            self.cursor = next_cursor;
            self.page.extend(keys);
        }
    }
}

impl<S: PageSource + ?Sized> KeyCursor for PagedKeyIterator<'_, S> {
    fn has_next(&mut self) -> StorageResult<bool> {
        if matches!(self.state, Lookahead::NeedFetch) {
            self.advance()?;
        }
        Ok(matches!(self.state, Lookahead::Ready(_)))
    }

    fn next_key(&mut self) -> StorageResult<String> {
        self.has_next()?;
        match std::mem::replace(&mut self.state, Lookahead::NeedFetch) {
            Lookahead::Ready(key) => Ok(key),
            other => {
                self.state = other;
                Err(StorageError::NoSuchElement)
            }
        }
    }
}

impl<S: PageSource + ?Sized> Iterator for PagedKeyIterator<'_, S> {
    type Item = StorageResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_key()),
            Ok(false) => None,
            Err(e) => {
                self.state = Lookahead::Exhausted;
                Some(Err(e))
            }
        }
    }
}
