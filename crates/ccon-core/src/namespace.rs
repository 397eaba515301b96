//! Namespace tables, clone-flag computation, and namespace joining.
//!
//! A namespace entry without a `path` is created fresh via the clone flags;
//! an entry with a `path` is joined from inside the container with
//! `setns(2)`. Joins happen in configuration order.

use std::os::fd::{FromRawFd, OwnedFd};
use std::path::Path;

use nix::fcntl::{open, OFlag};
use nix::sched::{setns, CloneFlags};
use nix::sys::stat::Mode;

use ccon_common::config::Config;
use ccon_common::error::{CconError, Result};

/// Maps a namespace name to its namespace-type flag.
///
/// # Errors
///
/// Returns a configuration error for unrecognized names.
pub fn namespace_type(name: &str) -> Result<CloneFlags> {
    match name {
        "mount" => Ok(CloneFlags::CLONE_NEWNS),
        "uts" => Ok(CloneFlags::CLONE_NEWUTS),
        "ipc" => Ok(CloneFlags::CLONE_NEWIPC),
        "net" => Ok(CloneFlags::CLONE_NEWNET),
        "pid" => Ok(CloneFlags::CLONE_NEWPID),
        "user" => Ok(CloneFlags::CLONE_NEWUSER),
        _ => Err(CconError::Config {
            message: format!("unrecognized namespace '{name}'"),
        }),
    }
}

/// Computes the `CLONE_NEW*` flags for every namespace to be created.
///
/// # Errors
///
/// Returns a configuration error for unrecognized namespace names.
pub fn clone_flags(config: &Config) -> Result<CloneFlags> {
    let mut flags = CloneFlags::empty();
    for (name, descriptor) in &config.namespaces {
        if descriptor.path.is_some() {
            continue;
        }
        flags |= namespace_type(name)?;
    }
    Ok(flags)
}

/// Joins every preexisting namespace named in the config, in order.
///
/// Must run inside the container process, after the user-namespace
/// mappings have been written and before any mount handling.
///
/// # Errors
///
/// Returns an error if a namespace path cannot be opened or entered.
pub fn join_namespaces(config: &Config) -> Result<()> {
    for (name, descriptor) in &config.namespaces {
        let Some(path) = descriptor.path.as_deref() else {
            continue;
        };
        let nstype = namespace_type(name)?;
        tracing::debug!(namespace = name.as_str(), path, "joining namespace");
        let raw = open(Path::new(path), OFlag::O_RDONLY, Mode::empty()).map_err(|err| {
            CconError::Io {
                path: path.into(),
                source: err.into(),
            }
        })?;
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        setns(&fd, nstype).map_err(|err| CconError::Privilege {
            message: format!("setns into {name} namespace at {path} failed: {err}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_six_namespace_names_resolve() {
        assert_eq!(
            namespace_type("mount").expect("mount"),
            CloneFlags::CLONE_NEWNS
        );
        assert_eq!(namespace_type("uts").expect("uts"), CloneFlags::CLONE_NEWUTS);
        assert_eq!(namespace_type("ipc").expect("ipc"), CloneFlags::CLONE_NEWIPC);
        assert_eq!(namespace_type("net").expect("net"), CloneFlags::CLONE_NEWNET);
        assert_eq!(namespace_type("pid").expect("pid"), CloneFlags::CLONE_NEWPID);
        assert_eq!(
            namespace_type("user").expect("user"),
            CloneFlags::CLONE_NEWUSER
        );
    }

    #[test]
    fn unknown_namespace_name_is_fatal() {
        assert!(namespace_type("cgroup").is_err());
        assert!(namespace_type("").is_err());
    }

    #[test]
    fn clone_flags_skip_joined_namespaces() {
        let config = Config::from_json(
            r#"{
                "version": "0.2.0",
                "namespaces": {
                    "uts": {},
                    "pid": {},
                    "net": {"path": "/proc/1/ns/net"}
                }
            }"#,
        )
        .expect("parse");
        let flags = clone_flags(&config).expect("clone flags");
        assert!(flags.contains(CloneFlags::CLONE_NEWUTS));
        assert!(flags.contains(CloneFlags::CLONE_NEWPID));
        assert!(!flags.contains(CloneFlags::CLONE_NEWNET));
    }

    #[test]
    fn clone_flags_reject_unknown_names() {
        let config = Config::from_json(
            r#"{"version":"0.2.0","namespaces":{"time":{}}}"#,
        )
        .expect("parse");
        assert!(clone_flags(&config).is_err());
    }

    #[test]
    fn empty_config_yields_no_flags() {
        let config = Config::from_json(r#"{"version":"0.2.0"}"#).expect("parse");
        assert_eq!(clone_flags(&config).expect("clone flags"), CloneFlags::empty());
    }
}
