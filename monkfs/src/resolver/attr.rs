//! Conversion of remote snapshots into filesystem-shaped attributes.

use std::hash::Hasher;

use bytes::Bytes;
use chrono::DateTime;
use fnv::FnvHasher;

use crate::api::{Content, StatResponse};
use crate::constants::{DIR_PERM, FILE_PERM};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    /// Type bits plus the fixed permission policy. The remote permission
    /// string is not consulted.
    pub fn mode(self) -> u32 {
        match self {
            NodeKind::Directory => libc::S_IFDIR as u32 | DIR_PERM,
            NodeKind::File => libc::S_IFREG as u32 | FILE_PERM,
        }
    }
}

/// Attributes of one path, derived from the latest snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeAttr {
    pub ino: u64,
    pub kind: NodeKind,
    pub size: u64,
    /// Seconds since the epoch, 0 when unknown.
    pub mtime: u64,
    pub ctime: u64,
    pub atime: u64,
    pub mode: u32,
}

impl NodeAttr {
    pub fn from_snapshot(path: &str, snapshot: &StatResponse) -> Self {
        let kind = snapshot_kind(snapshot);
        let meta = &snapshot.file_metadata;
        Self {
            ino: hash_path(path),
            kind,
            size: meta.size,
            mtime: parse_timestamp(&meta.modified_time),
            ctime: parse_timestamp(&meta.created_time),
            atime: parse_timestamp(&meta.access_time),
            mode: kind.mode(),
        }
    }

    /// Permission bits without the file type.
    pub fn perm(&self) -> u16 {
        (self.mode & 0o7777) as u16
    }
}

/// Inode number of a path: 64-bit FNV-1a over its bytes. Collisions are
/// not detected.
pub fn hash_path(path: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(path.as_bytes());
    hasher.finish()
}

/// RFC3339 timestamp to Unix seconds; empty or malformed input yields 0.
pub fn parse_timestamp(ts: &str) -> u64 {
    if ts.is_empty() {
        return 0;
    }
    DateTime::parse_from_rfc3339(ts)
        .map(|t| t.timestamp().max(0) as u64)
        .unwrap_or(0)
}

/// Kind of a stat snapshot: either type field equal to `"directory"`.
pub fn snapshot_kind(snapshot: &StatResponse) -> NodeKind {
    if snapshot.is_dir() {
        NodeKind::Directory
    } else {
        NodeKind::File
    }
}

/// Kind of a directory-listing entry from its type code.
pub fn entry_kind(file_type: &str) -> NodeKind {
    match file_type {
        "d" | "directory" => NodeKind::Directory,
        _ => NodeKind::File,
    }
}

/// Mode bits of a listing entry.
pub fn entry_mode(_permissions: &str, file_type: &str) -> u32 {
    entry_kind(file_type).mode()
}

/// Mode bits of a stat snapshot.
pub fn snapshot_mode(snapshot: &StatResponse) -> u32 {
    snapshot_kind(snapshot).mode()
}

/// Raw bytes of a retrieved content payload.
pub fn content_to_bytes(content: Content) -> Bytes {
    match content {
        Content::Text(text) => {
            let unquoted = if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
                text[1..text.len() - 1].to_string()
            } else {
                text
            };
            Bytes::from(unquoted)
        }
        Content::Bytes(raw) => Bytes::from(raw),
        Content::Other(serde_json::Value::Null) => Bytes::new(),
        Content::Other(value) => Bytes::from(serde_json::to_vec(&value).unwrap_or_default()),
    }
}
