//! The ordered mount list from `namespaces.mount.mounts`.
//!
//! Sources and targets are resolved against the working directory captured
//! once at the start of the pass; absolute paths are used verbatim. The
//! special type `pivot-root` switches the root filesystem instead of
//! mounting.

use std::path::Path;

use nix::mount::{mount, MsFlags};
use nix::unistd::getcwd;

use ccon_common::config::{Config, Mount};
use ccon_common::error::{CconError, Result};
use ccon_common::paths;

use super::pivot_root::pivot_root_remove_old;

/// Maps a symbolic mount-flag token to its kernel flag.
///
/// # Errors
///
/// Returns a configuration error for unrecognized tokens.
pub fn mount_flag(name: &str) -> Result<MsFlags> {
    let flag = match name {
        "MS_BIND" => MsFlags::MS_BIND,
        "MS_DIRSYNC" => MsFlags::MS_DIRSYNC,
        "MS_I_VERSION" => MsFlags::MS_I_VERSION,
        "MS_LAZYTIME" => MsFlags::MS_LAZYTIME,
        "MS_MANDLOCK" => MsFlags::MS_MANDLOCK,
        "MS_MOVE" => MsFlags::MS_MOVE,
        "MS_NOATIME" => MsFlags::MS_NOATIME,
        "MS_NODEV" => MsFlags::MS_NODEV,
        "MS_NODIRATIME" => MsFlags::MS_NODIRATIME,
        "MS_NOEXEC" => MsFlags::MS_NOEXEC,
        "MS_NOSUID" => MsFlags::MS_NOSUID,
        "MS_PRIVATE" => MsFlags::MS_PRIVATE,
        "MS_RDONLY" => MsFlags::MS_RDONLY,
        "MS_REC" => MsFlags::MS_REC,
        "MS_RELATIME" => MsFlags::MS_RELATIME,
        "MS_REMOUNT" => MsFlags::MS_REMOUNT,
        "MS_SHARED" => MsFlags::MS_SHARED,
        // MS_VERBOSE is the historical name for the MS_SILENT bit.
        "MS_SILENT" | "MS_VERBOSE" => MsFlags::MS_SILENT,
        "MS_SLAVE" => MsFlags::MS_SLAVE,
        "MS_STRICTATIME" => MsFlags::MS_STRICTATIME,
        "MS_SYNC" | "MS_SYNCHRONOUS" => MsFlags::MS_SYNCHRONOUS,
        "MS_UNBINDABLE" => MsFlags::MS_UNBINDABLE,
        _ => {
            return Err(CconError::Config {
                message: format!("unrecognized mount flag '{name}'"),
            })
        }
    };
    Ok(flag)
}

/// Folds a list of symbolic flag tokens into one flag set.
///
/// # Errors
///
/// Returns a configuration error for unrecognized tokens.
pub fn mount_flags(names: &[String]) -> Result<MsFlags> {
    let mut flags = MsFlags::empty();
    for name in names {
        flags |= mount_flag(name)?;
    }
    Ok(flags)
}

/// Performs every mount operation from the config, in order.
///
/// Must run inside the container's mount namespace, after any namespace
/// joins and before the setup-complete message.
///
/// # Errors
///
/// Returns an error for unresolvable paths, unknown flags, or a failed
/// mount or pivot.
pub fn apply_mounts(config: &Config) -> Result<()> {
    let mounts = config.mounts();
    if mounts.is_empty() {
        return Ok(());
    }

    let cwd = getcwd().map_err(|err| CconError::Sys {
        op: "getcwd",
        source: err.into(),
    })?;
    let cwd = cwd.to_str().ok_or_else(|| CconError::Config {
        message: format!("working directory {} is not valid UTF-8", cwd.display()),
    })?;
    if !cwd.starts_with('/') {
        return Err(CconError::Config {
            message: format!("current working directory is unreachable: {cwd}"),
        });
    }

    for (index, entry) in mounts.iter().enumerate() {
        apply_mount(index, entry, cwd)?;
    }
    Ok(())
}

fn apply_mount(index: usize, entry: &Mount, cwd: &str) -> Result<()> {
    let source = entry
        .source
        .as_deref()
        .map(|s| paths::resolve(cwd, s))
        .transpose()?;
    let target = entry
        .target
        .as_deref()
        .map(|t| paths::resolve(cwd, t))
        .transpose()?;
    let flags = mount_flags(&entry.flags)?;

    if entry.fstype.as_deref() == Some("pivot-root") {
        let source = source.ok_or_else(|| CconError::Config {
            message: format!("mount entry {index}: pivot-root requires a source"),
        })?;
        return pivot_root_remove_old(&source);
    }

    let target = target.ok_or_else(|| CconError::Config {
        message: format!("mount entry {index}: missing target"),
    })?;

    tracing::debug!(
        index,
        source = source.as_deref(),
        target = %target,
        fstype = entry.fstype.as_deref(),
        flags = ?flags,
        data = entry.data.as_deref(),
        "mounting"
    );
    mount(
        source.as_deref().map(Path::new),
        Path::new(&target),
        entry.fstype.as_deref(),
        flags,
        entry.data.as_deref(),
    )
    .map_err(|err| CconError::Privilege {
        message: format!("mount of {target} failed: {err}"),
    })
}
