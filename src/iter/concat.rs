//! Concatenation of key cursors, used for multi-prefix downloads.

use std::collections::VecDeque;

use super::KeyCursor;
use crate::errors::{StorageError, StorageResult};

/// Several key cursors presented as one sequence.
///
/// Cursors are drained in the order given.  Exhausted cursors are dropped
/// from the front as soon as `has_next` notices them.
pub struct ConcatenatedKeyIterator<'a> {
    cursors: VecDeque<Box<dyn KeyCursor + 'a>>,
}

impl<'a> ConcatenatedKeyIterator<'a> {
    pub fn new<I>(cursors: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn KeyCursor + 'a>>,
    {
        Self {
            cursors: cursors.into_iter().collect(),
        }
    }

    /// Cursors not yet known to be exhausted.
    pub fn remaining_cursors(&self) -> usize {
        self.cursors.len()
    }
}

impl KeyCursor for ConcatenatedKeyIterator<'_> {
    fn has_next(&mut self) -> StorageResult<bool> {
        while let Some(front) = self.cursors.front_mut() {
            if front.has_next()? {
                return Ok(true);
            }
            self.cursors.pop_front();
        }
        Ok(false)
    }

    fn next_key(&mut self) -> StorageResult<String> {
        if !self.has_next()? {
            return Err(StorageError::NoSuchElement);
        }
        match self.cursors.front_mut() {
            Some(front) => front.next_key(),
            None => Err(StorageError::NoSuchElement),
        }
    }
}

impl Iterator for ConcatenatedKeyIterator<'_> {
    type Item = StorageResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_key()),
            Ok(false) => None,
            Err(e) => {
                // Abandon the failing cursor so iteration can't spin on it.
                self.cursors.pop_front();
                Some(Err(e))
            }
        }
    }
}
