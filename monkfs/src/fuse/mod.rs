//! FUSE adapter.
//!
//! [`MonkFs`] implements `rfuse3::raw::Filesystem` on top of any
//! [`RemoteFilesystem`]. The kernel addresses nodes by inode number while the
//! resolver works on paths, so this layer owns the [`InodeTable`] that maps
//! one onto the other. Everything else is delegated.
//!
//! - `inode`: inode number to path table, root pinned to 1
//! - `mount`: mount option and session helpers
//!
//! The mount is read-only. Mutating callbacks fall through to rfuse3's
//! default `ENOSYS` replies.

pub mod inode;
pub mod mount;

use std::ffi::{OsStr, OsString};
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use rfuse3::Result as FuseResult;
use rfuse3::raw::Filesystem;
use rfuse3::raw::Request;
use rfuse3::raw::reply::{
    DirectoryEntry, DirectoryEntryPlus, FileAttr, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyDirectoryPlus, ReplyEntry, ReplyInit, ReplyOpen, ReplyStatFs,
};
use rfuse3::{FileType as FuseFileType, Timestamp};
use tracing::{debug, info};

use crate::config::FsConfig;
use crate::constants::{BLOCK_SIZE, FOPEN_KEEP_CACHE, MAX_NAME_LEN, MAX_WRITE};
use crate::errno::Errno;
use crate::path::parent_path;
use crate::resolver::{DirEntry, FileHandle, NodeAttr, NodeKind, RemoteFilesystem};

pub use inode::InodeTable;

pub struct MonkFs<R: RemoteFilesystem> {
    resolver: Arc<R>,
    inodes: InodeTable,
    attr_ttl: Duration,
    entry_ttl: Duration,
}

impl<R: RemoteFilesystem> MonkFs<R> {
    pub fn new(resolver: Arc<R>, config: &FsConfig) -> Self {
        Self {
            resolver,
            inodes: InodeTable::new(),
            attr_ttl: config.attr_ttl,
            entry_ttl: config.entry_ttl,
        }
    }

    pub fn resolver(&self) -> &Arc<R> {
        &self.resolver
    }

    pub fn inodes(&self) -> &InodeTable {
        &self.inodes
    }

    fn path_of(&self, ino: u64) -> Result<String, Errno> {
        self.inodes.path_of(ino).ok_or_else(|| {
            debug!(ino, "unknown inode");
            libc::ENOENT
        })
    }

    async fn lookup_child(&self, parent: u64, name: &str) -> Result<(u64, NodeAttr), Errno> {
        let parent_path = self.path_of(parent)?;
        let node = self.resolver.lookup(&parent_path, name).await?;
        let ino = self.inodes.lookup(&node.path);
        Ok((ino, node.attr))
    }

    async fn attr_of(&self, ino: u64) -> Result<NodeAttr, Errno> {
        let path = self.path_of(ino)?;
        self.resolver.getattr(&path).await
    }

    /// File handle and open flags for `ino`. The handle is the inode number.
    async fn open_file(&self, ino: u64) -> Result<(u64, u32), Errno> {
        let path = self.path_of(ino)?;
        let opened = self.resolver.open(&path).await?;
        let flags = if opened.keep_cache { FOPEN_KEEP_CACHE } else { 0 };
        Ok((ino, flags))
    }

    async fn open_dir(&self, ino: u64) -> Result<(), Errno> {
        let attr = self.attr_of(ino).await?;
        if attr.kind != NodeKind::Directory {
            return Err(libc::ENOTDIR);
        }
        Ok(())
    }

    async fn read_file(&self, ino: u64, offset: u64, size: u32) -> Result<Bytes, Errno> {
        let handle = FileHandle::new(self.path_of(ino)?);
        self.resolver.read(&handle, offset, size).await
    }

    /// Full listing of a directory: `.`, `..`, then the remote entries. The
    /// position in the returned vector is the kernel offset minus one.
    /// Nothing is added to the inode table here.
    async fn list_dir(&self, ino: u64) -> Result<Vec<DirEntry>, Errno> {
        let path = self.path_of(ino)?;
        let entries = self.resolver.readdir(&path).await?;

        let parent = parent_path(&path).unwrap_or("/").to_string();
        let mut all = Vec::with_capacity(entries.len() + 2);
        all.push(DirEntry {
            name: ".".into(),
            ino,
            kind: NodeKind::Directory,
            size: 0,
            mtime: 0,
            path: path.clone(),
        });
        all.push(DirEntry {
            name: "..".into(),
            ino: InodeTable::ino_of(&parent),
            kind: NodeKind::Directory,
            size: 0,
            mtime: 0,
            path: parent,
        });
        for mut entry in entries {
            entry.ino = InodeTable::ino_of(&entry.path);
            all.push(entry);
        }
        Ok(all)
    }

    /// readdir reply: entries after kernel offset `offset`.
    async fn dir_entries(&self, ino: u64, offset: u64) -> Result<Vec<DirectoryEntry>, Errno> {
        let all = self.list_dir(ino).await?;
        Ok(entries_after(all, offset)
            .map(|(offset, e)| DirectoryEntry {
                inode: e.ino,
                kind: fuse_kind(e.kind),
                name: OsString::from(e.name),
                offset,
            })
            .collect())
    }

    /// readdirplus reply: entries after kernel offset `offset` with the
    /// attributes the listing carried, so no entry costs a remote call.
    ///
    /// The kernel takes a lookup reference on every child it receives here,
    /// so each child is counted when it is pulled from the iterator. The dot
    /// entries are not counted; the kernel ignores them.
    async fn dir_entries_plus(
        &self,
        ino: u64,
        offset: u64,
        uid: u32,
        gid: u32,
    ) -> Result<impl Iterator<Item = DirectoryEntryPlus> + Send + '_, Errno> {
        let all = self.list_dir(ino).await?;
        Ok(entries_after(all, offset).map(move |(offset, e)| {
            if !matches!(e.name.as_str(), "." | "..") {
                self.inodes.lookup(&e.path);
            }
            DirectoryEntryPlus {
                inode: e.ino,
                generation: 0,
                kind: fuse_kind(e.kind),
                attr: to_fuse_attr(&e.attr(), e.ino, uid, gid),
                name: OsString::from(e.name),
                offset,
                entry_ttl: self.entry_ttl,
                attr_ttl: self.attr_ttl,
            }
        }))
    }
}

fn fuse_kind(kind: NodeKind) -> FuseFileType {
    match kind {
        NodeKind::Directory => FuseFileType::Directory,
        NodeKind::File => FuseFileType::RegularFile,
    }
}

fn timestamp(secs: u64) -> Timestamp {
    Timestamp::from(UNIX_EPOCH + Duration::from_secs(secs))
}

/// Kernel view of a node. `ino` is the kernel inode, which differs from the
/// path hash for the root.
pub fn to_fuse_attr(attr: &NodeAttr, ino: u64, uid: u32, gid: u32) -> FileAttr {
    FileAttr {
        ino,
        size: attr.size,
        blocks: attr.size.div_ceil(512),
        atime: timestamp(attr.atime),
        mtime: timestamp(attr.mtime),
        ctime: timestamp(attr.ctime),
        #[cfg(target_os = "macos")]
        crtime: timestamp(attr.ctime),
        kind: fuse_kind(attr.kind),
        perm: attr.perm(),
        nlink: 1,
        uid,
        gid,
        rdev: 0,
        #[cfg(target_os = "macos")]
        flags: 0,
        blksize: BLOCK_SIZE,
    }
}

/// Entries after kernel offset `offset`, each tagged with its own offset.
fn entries_after(all: Vec<DirEntry>, offset: u64) -> impl Iterator<Item = (i64, DirEntry)> {
    all.into_iter()
        .enumerate()
        .map(|(i, e)| (i as i64 + 1, e))
        .skip(offset as usize)
}

impl<R> Filesystem for MonkFs<R>
where
    R: RemoteFilesystem + 'static,
{
    type DirEntryStream<'a>
        = Pin<Box<dyn Stream<Item = FuseResult<DirectoryEntry>> + Send + 'a>>
    where
        Self: 'a;

    type DirEntryPlusStream<'a>
        = Pin<Box<dyn Stream<Item = FuseResult<DirectoryEntryPlus>> + Send + 'a>>
    where
        Self: 'a;

    async fn init(&self, _req: Request) -> FuseResult<ReplyInit> {
        let max_write = NonZeroU32::new(MAX_WRITE).ok_or(libc::EINVAL)?;
        info!("monkfs session started");
        Ok(ReplyInit { max_write })
    }

    async fn destroy(&self, _req: Request) {
        self.resolver.clear_cache();
        info!("monkfs session ended, metadata cache cleared");
    }

    async fn lookup(&self, req: Request, parent: u64, name: &OsStr) -> FuseResult<ReplyEntry> {
        let name = name.to_string_lossy();
        let (ino, attr) = self.lookup_child(parent, &name).await?;
        Ok(ReplyEntry {
            ttl: self.entry_ttl,
            attr: to_fuse_attr(&attr, ino, req.uid, req.gid),
            generation: 0,
        })
    }

    async fn getattr(
        &self,
        req: Request,
        ino: u64,
        _fh: Option<u64>,
        _flags: u32,
    ) -> FuseResult<ReplyAttr> {
        let attr = self.attr_of(ino).await?;
        Ok(ReplyAttr {
            ttl: self.attr_ttl,
            attr: to_fuse_attr(&attr, ino, req.uid, req.gid),
        })
    }

    async fn open(&self, _req: Request, ino: u64, _flags: u32) -> FuseResult<ReplyOpen> {
        let (fh, flags) = self.open_file(ino).await?;
        Ok(ReplyOpen { fh, flags })
    }

    async fn opendir(&self, _req: Request, ino: u64, _flags: u32) -> FuseResult<ReplyOpen> {
        self.open_dir(ino).await?;
        Ok(ReplyOpen { fh: 0, flags: 0 })
    }

    async fn read(
        &self,
        _req: Request,
        ino: u64,
        _fh: u64,
        offset: u64,
        size: u32,
    ) -> FuseResult<ReplyData> {
        let data = self.read_file(ino, offset, size).await?;
        Ok(ReplyData { data })
    }

    async fn readdir<'a>(
        &'a self,
        _req: Request,
        ino: u64,
        _fh: u64,
        offset: i64,
    ) -> FuseResult<ReplyDirectory<Self::DirEntryStream<'a>>> {
        let entries: Vec<FuseResult<DirectoryEntry>> = self
            .dir_entries(ino, offset.max(0) as u64)
            .await?
            .into_iter()
            .map(Ok)
            .collect();
        let boxed: Self::DirEntryStream<'a> = Box::pin(stream::iter(entries));
        Ok(ReplyDirectory { entries: boxed })
    }

    async fn readdirplus<'a>(
        &'a self,
        req: Request,
        ino: u64,
        _fh: u64,
        offset: u64,
        _lock_owner: u64,
    ) -> FuseResult<ReplyDirectoryPlus<Self::DirEntryPlusStream<'a>>> {
        let entries = self
            .dir_entries_plus(ino, offset, req.uid, req.gid)
            .await?
            .map(FuseResult::Ok);
        let boxed: Self::DirEntryPlusStream<'a> = Box::pin(stream::iter(entries));
        Ok(ReplyDirectoryPlus { entries: boxed })
    }

    // Remote capacity is unknown.
    async fn statfs(&self, _req: Request, _ino: u64) -> FuseResult<ReplyStatFs> {
        Ok(ReplyStatFs {
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: 0,
            ffree: 0,
            bsize: BLOCK_SIZE,
            namelen: MAX_NAME_LEN,
            frsize: BLOCK_SIZE,
        })
    }

    async fn release(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _flags: u32,
        _lock_owner: u64,
        _flush: bool,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn flush(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _lock_owner: u64,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn releasedir(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _flags: u32,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn forget(&self, _req: Request, inode: u64, nlookup: u64) {
        if self.inodes.forget(inode, nlookup) {
            debug!(ino = inode, "inode forgotten");
        }
    }

    async fn batch_forget(&self, _req: Request, inodes: &[(u64, u64)]) {
        for &(inode, nlookup) in inodes {
            self.inodes.forget(inode, nlookup);
        }
    }

    async fn interrupt(&self, _req: Request, _unique: u64) -> FuseResult<()> {
        Ok(())
    }
}
