//! Mount helpers for starting a monkfs session.
//!
//! Thin wrappers over the rfuse3 raw `Session` API. Unprivileged mounting
//! goes through `fusermount3` and is only available on Linux.

use std::path::Path;

use rfuse3::MountOptions;
use rfuse3::raw::{MountHandle, Session};
use tracing::info;

use super::MonkFs;
use crate::resolver::RemoteFilesystem;

/// Options every monkfs mount uses: read-only, owned by the calling user.
pub fn mount_options(allow_other: bool) -> MountOptions {
    let uid = unsafe { libc::getuid() };
    let gid = unsafe { libc::getgid() };

    let mut opts = MountOptions::default();
    opts.fs_name("monkfs")
        .read_only(true)
        .allow_other(allow_other)
        .uid(uid)
        .gid(gid);
    opts
}

/// Mount without root privileges (requires `fusermount3` in PATH).
#[cfg(target_os = "linux")]
pub async fn mount_unprivileged<R>(
    fs: MonkFs<R>,
    mount_point: impl AsRef<Path>,
    allow_other: bool,
) -> std::io::Result<MountHandle>
where
    R: RemoteFilesystem + 'static,
{
    let mount_point = mount_point.as_ref();
    info!(mountpoint = %mount_point.display(), "mounting (unprivileged)");
    Session::new(mount_options(allow_other))
        .mount_with_unprivileged(fs, mount_point)
        .await
}

#[cfg(not(target_os = "linux"))]
pub async fn mount_unprivileged<R>(
    _fs: MonkFs<R>,
    _mount_point: impl AsRef<Path>,
    _allow_other: bool,
) -> std::io::Result<MountHandle>
where
    R: RemoteFilesystem + 'static,
{
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "unprivileged FUSE mount is only supported on Linux",
    ))
}

/// Mount through the kernel directly; the caller needs CAP_SYS_ADMIN.
pub async fn mount_privileged<R>(
    fs: MonkFs<R>,
    mount_point: impl AsRef<Path>,
    allow_other: bool,
) -> std::io::Result<MountHandle>
where
    R: RemoteFilesystem + 'static,
{
    let mount_point = mount_point.as_ref();
    info!(mountpoint = %mount_point.display(), "mounting (privileged)");
    Session::new(mount_options(allow_other))
        .mount(fs, mount_point)
        .await
}
