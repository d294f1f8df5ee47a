//! Inode number to path mapping for the kernel side.
//!
//! Inode numbers are the path hash, so the same path always gets the same
//! number. The root is pinned to the FUSE root id and never dropped. Every
//! other entry lives while the kernel holds lookups on it: `lookup` counts
//! one, `forget` takes `nlookup` away and drops the entry at zero.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::constants::ROOT_INODE;
use crate::path::normalize_path;
use crate::resolver::hash_path;

struct InodeEntry {
    path: String,
    lookups: u64,
}

pub struct InodeTable {
    entries: RwLock<HashMap<u64, InodeEntry>>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            ROOT_INODE,
            InodeEntry {
                path: "/".to_string(),
                lookups: 0,
            },
        );
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Inode number the kernel sees for `path`.
    pub fn ino_of(path: &str) -> u64 {
        if path == "/" {
            ROOT_INODE
        } else {
            hash_path(path)
        }
    }

    /// Count one kernel lookup of `path` and return its inode number.
    pub fn lookup(&self, path: &str) -> u64 {
        let path = normalize_path(path);
        let ino = Self::ino_of(&path);
        if ino == ROOT_INODE {
            return ino;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(ino).or_insert_with(|| InodeEntry {
            path: String::new(),
            lookups: 0,
        });
        // a colliding path silently takes over the number
        entry.path = path;
        entry.lookups = entry.lookups.saturating_add(1);
        ino
    }

    /// Drop `nlookup` kernel references to `ino`. Returns true when the
    /// entry was removed.
    pub fn forget(&self, ino: u64, nlookup: u64) -> bool {
        if ino == ROOT_INODE {
            return false;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.get_mut(&ino) else {
            return false;
        };
        entry.lookups = entry.lookups.saturating_sub(nlookup);
        if entry.lookups > 0 {
            return false;
        }
        entries.remove(&ino);
        true
    }

    pub fn path_of(&self, ino: u64) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ino)
            .map(|e| e.path.clone())
    }

    pub fn lookups(&self, ino: u64) -> u64 {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ino)
            .map_or(0, |e| e.lookups)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
