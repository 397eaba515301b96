//! Exec dispatch and host executable resolution.
//!
//! Three exec paths, in priority order: a pre-opened host fd via
//! `execveat(fd, "", …, AT_EMPTY_PATH)`, an explicit `process.path` via
//! `execvpe`, or `args[0]` via `execvpe`. The host fd, when requested, is
//! resolved and opened before the mount view changes.

use std::convert::Infallible;
use std::ffi::CString;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{execvpe, getcwd};

use ccon_common::config::{Config, Process};
use ccon_common::error::{CconError, Result};
use ccon_common::paths;

/// Opens the container-process executable from the host filesystem.
///
/// Returns `None` unless `process.host` is true and an executable name is
/// available. Resolution of the name (`process.path`, else `args[0]`):
/// absolute paths open directly, names containing `/` resolve against the
/// working directory, and bare names walk the `PATH` list. The open uses
/// path-only close-on-exec semantics; the fd is only ever consumed by
/// [`exec_into`].
///
/// # Errors
///
/// Returns an error when resolution or the open fails.
pub fn host_exec_fd(config: &Config) -> Result<Option<OwnedFd>> {
    let Some(process) = &config.process else {
        return Ok(None);
    };
    if !process.host {
        return Ok(None);
    }
    let arg0 = match (&process.path, process.args.first()) {
        (Some(path), _) => path.as_str(),
        (None, Some(arg0)) => arg0.as_str(),
        (None, None) => return Ok(None),
    };
    open_in_path(arg0, OFlag::O_PATH | OFlag::O_CLOEXEC).map(Some)
}

/// Resolves `name` against the host filesystem and opens it with `flags`.
///
/// # Errors
///
/// Returns an error for over-long paths, a missing `PATH`, or when no
/// candidate can be opened.
pub fn open_in_path(name: &str, flags: OFlag) -> Result<OwnedFd> {
    if name.starts_with('/') {
        tracing::debug!(path = name, "opening host executable");
        return open_fd(name, flags);
    }

    if name.contains('/') {
        let cwd = getcwd().map_err(|err| CconError::Sys {
            op: "getcwd",
            source: err.into(),
        })?;
        let cwd = cwd.to_str().ok_or_else(|| CconError::Config {
            message: format!("working directory {} is not valid UTF-8", cwd.display()),
        })?;
        let full = paths::join(cwd, name)?;
        tracing::debug!(path = %full, "opening host executable");
        return open_fd(&full, flags);
    }

    let path_list = std::env::var("PATH").map_err(|_| CconError::Config {
        message: "failed to get host PATH".into(),
    })?;
    for dir in path_list.split(':') {
        let candidate = paths::join(dir, name)?;
        if let Ok(fd) = open_fd(&candidate, flags) {
            tracing::debug!(path = %candidate, "opening host executable");
            return Ok(fd);
        }
    }
    Err(CconError::Config {
        message: format!("failed to find {name} in the host PATH"),
    })
}

fn open_fd(path: &str, flags: OFlag) -> Result<OwnedFd> {
    let raw = open(Path::new(path), flags, Mode::empty()).map_err(|err| CconError::Io {
        path: path.into(),
        source: err.into(),
    })?;
    Ok(unsafe { OwnedFd::from_raw_fd(raw) })
}

/// Replaces the current process image with the configured program.
///
/// Only ever returns on failure; the caller decides whether that is fatal.
/// The caller is responsible for handling an empty `args` list before
/// calling.
///
/// # Errors
///
/// Returns a configuration error for unrepresentable strings and a
/// resource error when the exec syscall itself fails.
pub fn exec_into(process: &Process, exec_fd: Option<&OwnedFd>) -> Result<Infallible> {
    let argv = cstring_vec(&process.args)?;
    let env = match &process.env {
        Some(env) => cstring_vec(env)?,
        None => ambient_env()?,
    };

    if let Some(fd) = exec_fd {
        tracing::debug!(args = ?process.args, "exec host executable by fd");
        let argv_ptrs = ptr_vec(&argv);
        let env_ptrs = ptr_vec(&env);
        // nix has no execveat wrapper at this layer; raw syscall, exactly
        // one shot, returns only on failure.
        unsafe {
            libc::syscall(
                libc::SYS_execveat,
                fd.as_raw_fd(),
                c"".as_ptr(),
                argv_ptrs.as_ptr(),
                env_ptrs.as_ptr(),
                libc::AT_EMPTY_PATH,
            );
        }
        return Err(CconError::Sys {
            op: "execveat",
            source: std::io::Error::last_os_error(),
        });
    }

    let file = match &process.path {
        Some(path) => to_cstring(path)?,
        None => argv[0].clone(),
    };
    tracing::debug!(file = ?file, args = ?process.args, "exec");
    match execvpe(&file, &argv, &env) {
        Ok(never) => match never {},
        Err(err) => Err(CconError::Sys {
            op: "execvpe",
            source: err.into(),
        }),
    }
}

fn to_cstring(value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| CconError::Config {
        message: format!("string contains an interior NUL byte: {value:?}"),
    })
}

/// Converts an ordered string list into the exec-boundary CString form.
fn cstring_vec(values: &[String]) -> Result<Vec<CString>> {
    values.iter().map(|value| to_cstring(value)).collect()
}

/// Snapshot of the ambient environment as `KEY=VALUE` CStrings.
fn ambient_env() -> Result<Vec<CString>> {
    std::env::vars_os()
        .map(|(key, value)| {
            let mut entry = key.as_bytes().to_vec();
            entry.push(b'=');
            entry.extend_from_slice(value.as_bytes());
            CString::new(entry).map_err(|_| CconError::Config {
                message: "environment entry contains an interior NUL byte".into(),
            })
        })
        .collect()
}

/// NULL-terminated pointer array over a CString list, for the raw syscall.
fn ptr_vec(strings: &[CString]) -> Vec<*const libc::c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect()
}
