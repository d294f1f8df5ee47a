use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::process::Command as ProcessCommand;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use monkfs::api::FileApiClient;
use monkfs::cache::MetadataCache;
use monkfs::config::{Cli, Command, MountArgs, UnmountArgs};
use monkfs::fuse::MonkFs;
use monkfs::fuse::mount::{mount_privileged, mount_unprivileged};
use monkfs::resolver::NodeResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let debug = matches!(&cli.command, Command::Mount(args) if args.debug);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Mount(args) => mount(args).await,
        Command::Unmount(args) => unmount(args).await,
    }
}

async fn mount(args: MountArgs) -> anyhow::Result<()> {
    let meta = tokio::fs::metadata(&args.mountpoint)
        .await
        .with_context(|| format!("mountpoint `{}` is not accessible", args.mountpoint.display()))?;
    if !meta.is_dir() {
        bail!("mountpoint `{}` is not a directory", args.mountpoint.display());
    }

    let client_config = args.client_config();
    if client_config.token.as_deref().is_none_or(str::is_empty) {
        warn!("MONK_TOKEN is not set, using anonymous access");
    }
    let client = FileApiClient::new(client_config).context("failed to build File API client")?;
    info!(api_url = client.base_url(), "using File API");

    let fs_config = args.fs_config();
    let cache = Arc::new(MetadataCache::new(fs_config.cache_ttl));
    let resolver = Arc::new(NodeResolver::new(Arc::new(client), cache));
    let fs = MonkFs::new(resolver, &fs_config);

    let mut mount_handle = if args.privileged {
        mount_privileged(fs, &args.mountpoint, args.allow_other).await
    } else {
        mount_unprivileged(fs, &args.mountpoint, args.allow_other).await
    }
    .with_context(|| format!("failed to mount on `{}`", args.mountpoint.display()))?;
    info!(mountpoint = %args.mountpoint.display(), "mounted, press Ctrl+C to unmount");

    let handle = &mut mount_handle;
    tokio::select! {
        res = handle => res.context("FUSE session terminated")?,
        _ = shutdown_signal() => {
            info!("unmounting");
            mount_handle.unmount().await.context("unmount failed")?;
        }
    }
    Ok(())
}

async fn unmount(args: UnmountArgs) -> anyhow::Result<()> {
    let mut cmd = if cfg!(target_os = "linux") {
        let mut cmd = ProcessCommand::new("fusermount3");
        cmd.arg("-u");
        cmd
    } else {
        ProcessCommand::new("umount")
    };
    let status = cmd
        .arg(&args.mountpoint)
        .status()
        .await
        .context("failed to run unmount helper")?;
    if !status.success() {
        bail!("unmount of `{}` failed: {status}", args.mountpoint.display());
    }
    info!(mountpoint = %args.mountpoint.display(), "unmounted");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
