//! User-namespace ID mappings, written from the host side.
//!
//! While the container blocks on the handshake pipe, the host writes
//! `/proc/<pid>/uid_map`, `/proc/<pid>/setgroups`, and `/proc/<pid>/gid_map`
//! in that order. setgroups must be written before gid_map when denying.
//! Each mapping line goes out in a single `write(2)`.

use std::os::fd::{FromRawFd, OwnedFd};
use std::path::Path;

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{write, Pid};

use ccon_common::config::{Config, IdMapping};
use ccon_common::error::{CconError, Result};

/// Writes all configured user-namespace mappings for the container `cpid`.
///
/// `child_alive` is consulted before each `/proc` file is opened; a dead
/// container aborts the sequence.
///
/// # Errors
///
/// Returns an error if the container has died or any `/proc` write fails.
pub fn apply_mappings(
    config: &Config,
    cpid: Pid,
    child_alive: &dyn Fn() -> bool,
) -> Result<()> {
    let Some(user) = config.namespace("user") else {
        return Ok(());
    };

    write_id_map(&user.uid_mappings, cpid, "uid_map", child_alive)?;
    write_setgroups(user.setgroups, cpid, child_alive)?;
    write_id_map(&user.gid_mappings, cpid, "gid_map", child_alive)?;
    Ok(())
}

/// Formats one mapping as a `"container host size"` map line.
fn map_line(mapping: &IdMapping) -> String {
    format!(
        "{} {} {}\n",
        mapping.container_id, mapping.host_id, mapping.size
    )
}

fn write_id_map(
    mappings: &[IdMapping],
    cpid: Pid,
    filename: &str,
    child_alive: &dyn Fn() -> bool,
) -> Result<()> {
    if mappings.is_empty() {
        return Ok(());
    }

    let path = format!("/proc/{cpid}/{filename}");
    if !child_alive() {
        return Err(CconError::PeerDead);
    }

    let fd = open_for_write(&path)?;
    for mapping in mappings {
        let line = map_line(mapping);
        tracing::debug!(path = %path, line = line.trim_end(), "writing id mapping");
        write_all_once(&fd, line.as_bytes(), &path)?;
    }
    Ok(())
}

fn write_setgroups(setgroups: Option<bool>, cpid: Pid, child_alive: &dyn Fn() -> bool) -> Result<()> {
    let Some(allow) = setgroups else {
        return Ok(());
    };
    let value = setgroups_value(allow);

    let path = format!("/proc/{cpid}/setgroups");
    if !child_alive() {
        return Err(CconError::PeerDead);
    }

    tracing::debug!(path = %path, value, "writing setgroups");
    let fd = open_for_write(&path)?;
    write_all_once(&fd, value.as_bytes(), &path)
}

/// Value written to `/proc/<pid>/setgroups`.
fn setgroups_value(allow: bool) -> &'static str {
    if allow {
        "allow"
    } else {
        "deny"
    }
}

fn open_for_write(path: &str) -> Result<OwnedFd> {
    let raw = open(Path::new(path), OFlag::O_WRONLY, Mode::empty()).map_err(|err| {
        CconError::Io {
            path: path.into(),
            source: err.into(),
        }
    })?;
    Ok(unsafe { OwnedFd::from_raw_fd(raw) })
}

/// Writes `data` with one syscall; the kernel rejects partial map lines, so
/// a short write is treated as failure.
fn write_all_once(fd: &OwnedFd, data: &[u8], path: &str) -> Result<()> {
    let written = write(fd, data).map_err(|err| CconError::Io {
        path: path.into(),
        source: err.into(),
    })?;
    if written != data.len() {
        return Err(CconError::Io {
            path: path.into(),
            source: std::io::Error::from(std::io::ErrorKind::WriteZero),
        });
    }
    Ok(())
}
