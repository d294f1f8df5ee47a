//! Filesystem node resolver.
//!
//! Translates path-addressed filesystem callbacks into File API calls:
//! - consults the [`MetadataCache`] before any stat,
//! - calls the [`FileApi`] on a miss and caches the snapshot on success,
//! - converts snapshots into [`NodeAttr`] and directory entries,
//! - turns every failure into a POSIX errno via [`crate::errno`].
//!
//! There is no per-node state. Each callback is an independent transaction
//! against the shared cache and client, so callbacks may run concurrently
//! for any mix of paths. Two concurrent misses on one path both fetch and
//! the last write wins.

pub mod attr;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::api::{ClientError, FieldHint, FileApi, ListOptions, RetrieveOptions, StatResponse};
use crate::cache::MetadataCache;
use crate::errno::{Errno, to_errno};
use crate::path::{join_path, normalize_path};

pub use attr::{NodeAttr, NodeKind, hash_path};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// Full path of the entry; its inode is derived from this.
    pub path: String,
    pub ino: u64,
    pub kind: NodeKind,
    pub size: u64,
    /// Seconds since the epoch, 0 when the listing carried no timestamp.
    pub mtime: u64,
}

impl DirEntry {
    /// Attributes as far as the listing knows them. Listings carry only the
    /// modification time, so it stands in for ctime and atime.
    pub fn attr(&self) -> NodeAttr {
        NodeAttr {
            ino: self.ino,
            kind: self.kind,
            size: self.size,
            mtime: self.mtime,
            ctime: self.mtime,
            atime: self.mtime,
            mode: self.kind.mode(),
        }
    }
}

/// A child resolved by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub path: String,
    pub attr: NodeAttr,
}

impl Node {
    pub fn ino(&self) -> u64 {
        self.attr.ino
    }

    pub fn kind(&self) -> NodeKind {
        self.attr.kind
    }
}

/// Open file. Bound to a path and nothing else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHandle {
    path: String,
}

impl FileHandle {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedFile {
    pub handle: FileHandle,
    /// Ask the kernel to keep its page cache for this file.
    pub keep_cache: bool,
}

/// Path-addressed filesystem callbacks. Implementors never fail with
/// anything but a POSIX errno.
#[async_trait]
pub trait RemoteFilesystem: Send + Sync {
    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, Errno>;

    async fn getattr(&self, path: &str) -> Result<NodeAttr, Errno>;

    async fn lookup(&self, parent: &str, name: &str) -> Result<Node, Errno>;

    async fn open(&self, path: &str) -> Result<OpenedFile, Errno>;

    async fn read(&self, handle: &FileHandle, offset: u64, size: u32) -> Result<Bytes, Errno>;

    /// Forget everything cached; called when the session ends.
    fn clear_cache(&self);
}

pub struct NodeResolver<A: FileApi> {
    api: Arc<A>,
    cache: Arc<MetadataCache>,
}

impl<A: FileApi> NodeResolver<A> {
    pub fn new(api: Arc<A>, cache: Arc<MetadataCache>) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Drop the cached snapshot of `path` and of its ancestors.
    pub fn invalidate(&self, path: &str) {
        self.cache.invalidate(&normalize_path(path));
    }

    /// Stat with the metadata hint and cache the result.
    async fn fetch_metadata(&self, path: &str) -> Result<StatResponse, ClientError> {
        let snapshot = self.api.stat(path, Some(FieldHint::FileMetadata)).await?;
        self.cache.set(path, snapshot.clone());
        Ok(snapshot)
    }
}

fn translate(op: &'static str, path: &str, err: &ClientError) -> Errno {
    let errno = to_errno(err);
    if err.is_not_found() {
        debug!(op, path, "remote path not found");
    } else {
        warn!(op, path, errno, error = %err, "file api call failed");
    }
    errno
}

#[async_trait]
impl<A: FileApi> RemoteFilesystem for NodeResolver<A> {
    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, Errno> {
        let path = normalize_path(path);
        let options = ListOptions {
            long_format: true,
            ..Default::default()
        };
        let listing = self
            .api
            .list(&path, &options, Some(FieldHint::Entries))
            .await
            .map_err(|e| translate("readdir", &path, &e))?;

        let entries: Vec<DirEntry> = listing
            .entries
            .into_iter()
            .filter(|e| !matches!(e.name.as_str(), "" | "." | ".."))
            .map(|e| {
                let entry_path = if e.path.is_empty() {
                    join_path(&path, &e.name)
                } else {
                    normalize_path(&e.path)
                };
                DirEntry {
                    ino: hash_path(&entry_path),
                    kind: attr::entry_kind(&e.file_type),
                    size: e.file_size,
                    mtime: attr::parse_timestamp(&e.file_modified),
                    name: e.name,
                    path: entry_path,
                }
            })
            .collect();
        debug!(path = %path, count = entries.len(), "readdir");
        Ok(entries)
    }

    async fn getattr(&self, path: &str) -> Result<NodeAttr, Errno> {
        let path = normalize_path(path);
        if let Some(snapshot) = self.cache.get(&path) {
            debug!(path = %path, "getattr cache hit");
            return Ok(NodeAttr::from_snapshot(&path, &snapshot));
        }
        debug!(path = %path, "getattr cache miss");
        let snapshot = self
            .fetch_metadata(&path)
            .await
            .map_err(|e| translate("getattr", &path, &e))?;
        Ok(NodeAttr::from_snapshot(&path, &snapshot))
    }

    async fn lookup(&self, parent: &str, name: &str) -> Result<Node, Errno> {
        let path = join_path(&normalize_path(parent), name);
        let snapshot = self
            .fetch_metadata(&path)
            .await
            .map_err(|e| translate("lookup", &path, &e))?;
        let attr = NodeAttr::from_snapshot(&path, &snapshot);
        Ok(Node { path, attr })
    }

    async fn open(&self, path: &str) -> Result<OpenedFile, Errno> {
        let path = normalize_path(path);
        self.api
            .stat(&path, None)
            .await
            .map_err(|e| translate("open", &path, &e))?;
        Ok(OpenedFile {
            handle: FileHandle { path },
            keep_cache: true,
        })
    }

    async fn read(&self, handle: &FileHandle, offset: u64, size: u32) -> Result<Bytes, Errno> {
        let options = RetrieveOptions {
            start_offset: offset,
            max_bytes: u64::from(size),
        };
        let response = self
            .api
            .retrieve(handle.path(), options, Some(FieldHint::Content))
            .await
            .map_err(|e| translate("read", handle.path(), &e))?;

        // The returned range starts at `offset`; empty means end of file.
        let mut data = attr::content_to_bytes(response.content);
        data.truncate(size as usize);
        Ok(data)
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}
