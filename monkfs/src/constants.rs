//! Resource bounds and fixed values shared by the client, cache and FUSE layers.

use std::time::Duration;

/// Default base URL of the File API.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default lifetime of a metadata cache entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Deadline for a single remote round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an idle pooled connection is kept open.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Maximum idle pooled connections kept per host.
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Attribute TTL handed to the kernel.
pub const ATTR_TTL: Duration = Duration::from_secs(1);

/// Entry TTL handed to the kernel.
pub const ENTRY_TTL: Duration = Duration::from_secs(1);

/// Root inode number (FUSE convention).
pub const ROOT_INODE: u64 = 1;

/// Permission bits for directories (rwxr-xr-x).
pub const DIR_PERM: u32 = 0o755;

/// Permission bits for regular files (rw-r--r--).
pub const FILE_PERM: u32 = 0o644;

/// Preferred I/O block size reported to the kernel.
pub const BLOCK_SIZE: u32 = 4096;

/// Largest write the kernel may send in one request.
pub const MAX_WRITE: u32 = 1024 * 1024;

/// Longest file name reported by statfs.
pub const MAX_NAME_LEN: u32 = 255;

/// `FOPEN_KEEP_CACHE`: keep the kernel page cache across opens.
pub const FOPEN_KEEP_CACHE: u32 = 1 << 1;
