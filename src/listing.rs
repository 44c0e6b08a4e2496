//! Directory listing reconstruction from a flat key space.
//!
//! Given the keys under a prefix, produce what a file-oriented client
//! expects from "list this directory": every file path relative to the
//! prefix, plus a `folder/` entry for every directory those paths imply.

use std::collections::BTreeSet;

/// Files and synthesized folders under one prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingTree {
    prefix: String,
    files: Vec<String>,
    folders: BTreeSet<String>,
}

impl ListingTree {
    /// An empty tree for keys listed under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            files: Vec::new(),
            folders: BTreeSet::new(),
        }
    }

    /// Build a tree from a complete key list.
    pub fn build<I, S>(prefix: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new(prefix);
        for key in keys {
            tree.insert(key.as_ref());
        }
        tree
    }

    /// Add one storage key.
    pub fn insert(&mut self, key: &str) {
        let relative = key.strip_prefix(self.prefix.as_str()).unwrap_or(key);
        let relative = relative.strip_prefix('/').unwrap_or(relative);
        if relative.is_empty() {
            // The prefix's own marker object.
            return;
        }

        if relative.ends_with('/') {
            self.folders.insert(relative.to_string());
        } else {
            self.files.push(relative.to_string());
        }
        self.add_ancestors(relative);
    }

    /// Walk `a/b/c` upwards, adding `a/b/` then `a/`.
    fn add_ancestors(&mut self, path: &str) {
        let mut end = path.trim_end_matches('/').len();
        while let Some(idx) = path[..end].rfind('/') {
            if idx == 0 {
                break;
            }
            let folder = &path[..=idx];
            if !self.folders.insert(folder.to_string()) {
                // Already present, so every ancestor is too.
                break;
            }
            end = idx;
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// File paths relative to the prefix, in key order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Folder entries, each ending in `/`.
    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.folders.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Files followed by folders.
    pub fn into_entries(self) -> Vec<String> {
        let mut entries = self.files;
        entries.extend(self.folders);
        entries
    }
}
