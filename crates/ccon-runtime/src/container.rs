//! Container-side orchestration, entered from the clone callback.
//!
//! Runs inside any freshly created namespaces. The sequence: release the
//! host-owned pipe ends, wait for the mapping message, pre-open the host
//! executable, join preexisting namespaces, apply mounts, report setup,
//! wait for the exec signal, then chdir, drop identity and capabilities,
//! and exec the user program.

use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::path::Path;

use nix::unistd::chdir;

use ccon_common::config::Config;
use ccon_common::constants::{
    CONTAINER_SETUP_COMPLETE, EXEC_PROCESS, USER_NAMESPACE_MAPPING_COMPLETE,
};
use ccon_common::error::{CconError, Result};
use ccon_core::{capability, filesystem, identity, namespace};

use crate::{exec, pipes};

/// Raw pipe ends inherited across `clone`, as seen by the new container
/// process. Both processes hold all four descriptors immediately after the
/// clone; each side closes the pair the other owns.
#[derive(Debug, Clone, Copy)]
pub struct InheritedPipes {
    /// Read end of the host → container pipe (container-owned).
    pub to_child_read: RawFd,
    /// Write end of the host → container pipe (host-owned).
    pub to_child_write: RawFd,
    /// Read end of the container → host pipe (host-owned).
    pub from_child_read: RawFd,
    /// Write end of the container → host pipe (container-owned).
    pub from_child_write: RawFd,
}

/// Container entry point; the return value becomes the process exit code.
pub fn main(config: &Config, inherited: InheritedPipes) -> i32 {
    // Assume ownership of all four inherited ends, then release the pair
    // the host keeps.
    let from_parent = unsafe { OwnedFd::from_raw_fd(inherited.to_child_read) };
    let host_write = unsafe { OwnedFd::from_raw_fd(inherited.to_child_write) };
    let host_read = unsafe { OwnedFd::from_raw_fd(inherited.from_child_read) };
    let to_parent = unsafe { OwnedFd::from_raw_fd(inherited.from_child_write) };
    drop(host_write);
    drop(host_read);

    match run(config, to_parent, from_parent) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = %err, "container setup failed");
            1
        }
    }
}

fn run(config: &Config, to_parent: OwnedFd, from_parent: OwnedFd) -> Result<i32> {
    pipes::expect_message(&from_parent, USER_NAMESPACE_MAPPING_COMPLETE, "host")?;

    // The host view of the filesystem disappears once mounts run; resolve
    // and open a host executable first.
    let exec_fd = exec::host_exec_fd(config)?;

    namespace::join_namespaces(config)?;
    filesystem::apply_mounts(config)?;

    pipes::write_message(&to_parent, CONTAINER_SETUP_COMPLETE)?;
    drop(to_parent);

    // Blocks while the host runs pre-start hooks.
    pipes::expect_message(&from_parent, EXEC_PROCESS, "host")?;
    drop(from_parent);

    set_working_directory(config)?;
    identity::apply(config)?;
    capability::apply(config)?;

    let Some(process) = &config.process else {
        tracing::debug!("process not defined, exiting");
        return Ok(0);
    };
    if process.args.is_empty() {
        tracing::debug!("args not specified, exiting");
        return Ok(0);
    }

    match exec::exec_into(process, exec_fd.as_ref()) {
        Ok(never) => match never {},
        Err(err) => Err(err),
    }
}

fn set_working_directory(config: &Config) -> Result<()> {
    let Some(cwd) = config.process.as_ref().and_then(|p| p.cwd.as_deref()) else {
        return Ok(());
    };
    tracing::debug!(cwd, "changing working directory");
    chdir(Path::new(cwd)).map_err(|err| CconError::Io {
        path: cwd.into(),
        source: err.into(),
    })
}
