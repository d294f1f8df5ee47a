//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::api::ClientConfig;
use crate::constants::{
    ATTR_TTL, DEFAULT_API_URL, DEFAULT_CACHE_TTL, DEFAULT_REQUEST_TIMEOUT, ENTRY_TTL,
};

#[derive(Parser, Debug)]
#[command(name = "monk-fuse", version, about = "Mount a Monk File API tree as a read-only filesystem")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mount the remote tree and serve it until interrupted
    Mount(MountArgs),
    /// Unmount a previously mounted tree
    Unmount(UnmountArgs),
}

#[derive(Args, Debug, Clone)]
pub struct MountArgs {
    /// Empty directory to mount on
    pub mountpoint: PathBuf,

    /// Base URL of the File API
    #[arg(long, env = "MONK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Bearer token; anonymous access when unset
    #[arg(long, env = "MONK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Metadata cache lifetime in seconds
    #[arg(long, env = "MONKFS_CACHE_TTL", default_value_t = DEFAULT_CACHE_TTL.as_secs())]
    pub cache_ttl: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "MONKFS_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Let other users access the mount
    #[arg(long, default_value_t = false)]
    pub allow_other: bool,

    /// Mount through the kernel instead of fusermount3
    #[arg(long, default_value_t = false)]
    pub privileged: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UnmountArgs {
    /// Mounted directory
    pub mountpoint: PathBuf,
}

impl MountArgs {
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.timeout));
        match &self.token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        }
    }

    pub fn fs_config(&self) -> FsConfig {
        FsConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl),
            ..Default::default()
        }
    }
}

/// Filesystem-side timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    /// Lifetime of a metadata cache entry
    pub cache_ttl: Duration,
    /// How long the kernel may trust returned attributes
    pub attr_ttl: Duration,
    /// How long the kernel may trust a name lookup
    pub entry_ttl: Duration,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            attr_ttl: ATTR_TTL,
            entry_ttl: ENTRY_TTL,
        }
    }
}
