//! Defines [`Cache`], the memoization table that keeps the development server
//! from re-parsing source files that haven't changed. Entries are keyed by
//! source path and carry the modification time the file had when it was
//! parsed; a lookup with any other modification time is a miss.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// A parsed value together with the modification time of the file it was
/// parsed from.
#[derive(Debug)]
pub struct Entry<T> {
    pub modified: SystemTime,
    pub value: Arc<T>,
}

/// Maps source paths to their last successful parse.
#[derive(Debug)]
pub struct Cache<T> {
    entries: HashMap<PathBuf, Entry<T>>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Cache {
            entries: HashMap::new(),
        }
    }
}

impl<T> Cache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `path` if it was parsed from a file with
    /// modification time `modified`.
    pub fn get(&self, path: &Path, modified: SystemTime) -> Option<Arc<T>> {
        self.entries
            .get(path)
            .filter(|entry| entry.modified == modified)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Returns the cached value for `path` when its stored modification time
    /// equals `modified`; otherwise calls `parse`, stores the result and
    /// returns it. Failed parses aren't stored, and they evict any stale entry
    /// for `path`.
    pub fn get_or_try_insert_with<E, F>(
        &mut self,
        path: &Path,
        modified: SystemTime,
        parse: F,
    ) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get(path, modified) {
            log::debug!("cache hit: {}", path.display());
            return Ok(value);
        }

        log::debug!("cache miss: {}", path.display());
        match parse() {
            Ok(value) => {
                let value = Arc::new(value);
                self.entries.insert(
                    path.to_owned(),
                    Entry {
                        modified,
                        value: Arc::clone(&value),
                    },
                );
                Ok(value)
            }
            Err(e) => {
                self.entries.remove(path);
                Err(e)
            }
        }
    }

    /// Drops every entry whose path doesn't satisfy `keep`. Used after a walk
    /// of the source directory to forget deleted files.
    pub fn retain<F: FnMut(&Path) -> bool>(&mut self, mut keep: F) {
        self.entries.retain(|path, _| keep(path));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
