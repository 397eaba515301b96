//! Host-side orchestration: clone, handshake, hooks, and the final reap.

use std::os::fd::{AsRawFd, OwnedFd};

use nix::sched::{self, CloneFlags};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use ccon_common::config::Config;
use ccon_common::constants::{
    CONTAINER_SETUP_COMPLETE, EXEC_PROCESS, STACK_SIZE, USER_NAMESPACE_MAPPING_COMPLETE,
};
use ccon_common::error::{CconError, Result};
use ccon_core::{namespace, userns};

use crate::{container, hooks, pipes, reap, signal};

/// Runs the container described by `config` to completion.
///
/// Returns the container's exit status on a clean lifecycle; any setup,
/// protocol, privilege, or pre-start hook failure is an error (and the
/// container, if it was started, does not survive it).
///
/// # Errors
///
/// Returns the first failure of any lifecycle step.
pub fn run(config: &Config) -> Result<i32> {
    let flags = namespace::clone_flags(config)?;

    let (to_child_read, to_child_write) = pipes::create()?;
    let (from_child_read, from_child_write) = pipes::create()?;
    let inherited = container::InheritedPipes {
        to_child_read: to_child_read.as_raw_fd(),
        to_child_write: to_child_write.as_raw_fd(),
        from_child_read: from_child_read.as_raw_fd(),
        from_child_write: from_child_write.as_raw_fd(),
    };

    // The stack is owned here until the final reap.
    let mut stack = vec![0u8; STACK_SIZE];
    let cpid = spawn(config, &mut stack, flags, inherited)?;
    signal::set_child(cpid);
    signal::install()?;
    tracing::debug!(pid = cpid.as_raw(), "launched container process");

    // Transfer the container-owned ends: close our copies.
    drop(to_child_read);
    drop(from_child_write);

    let result = parent(config, cpid, to_child_write, from_child_read);

    // No container outlives the runtime, whichever way the run went.
    signal::kill_lingering_child();
    result
}

fn spawn(
    config: &Config,
    stack: &mut [u8],
    flags: CloneFlags,
    inherited: container::InheritedPipes,
) -> Result<Pid> {
    let callback = Box::new(move || container::main(config, inherited) as isize);
    unsafe { sched::clone(callback, stack, flags, Some(libc::SIGCHLD)) }.map_err(|err| {
        CconError::Sys {
            op: "clone",
            source: err.into(),
        }
    })
}

fn parent(config: &Config, cpid: Pid, to_child: OwnedFd, from_child: OwnedFd) -> Result<i32> {
    userns::apply_mappings(config, cpid, &signal::child_alive)?;

    pipes::write_message(&to_child, USER_NAMESPACE_MAPPING_COMPLETE)?;
    pipes::expect_message(&from_child, CONTAINER_SETUP_COMPLETE, "container")?;
    drop(from_child);

    let hook_result = hooks::run_hooks(&config.hooks.pre_start, "pre-start", Some(cpid));
    match &hook_result {
        Ok(()) => pipes::write_message(&to_child, EXEC_PROCESS)?,
        Err(err) => {
            tracing::warn!(error = %err, "pre-start hook failed, killing the container");
            if signal::child_alive() {
                let _ = kill(cpid, Signal::SIGKILL);
            }
        }
    }
    // Closing the write end releases a container still blocked on the
    // exec message.
    drop(to_child);

    let status = reap::wait_exit(cpid, "container");
    signal::clear_child();

    // Best effort, no PID on stdin, failures ignored.
    let _ = hooks::run_hooks(&config.hooks.post_stop, "post-stop", None);

    let status = status?;
    hook_result.map(|()| status)
}
