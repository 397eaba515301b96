//! Lifecycle hook processes.
//!
//! Each hook is forked on the host and exec'd through the shared
//! dispatcher. When a container PID is supplied (pre-start), the hook
//! receives it as a single decimal line on stdin via a dedicated pipe; the
//! line is written before the fork and is far below the kernel pipe buffer,
//! so the write cannot block. A failing hook aborts pre-start and is
//! ignored for post-stop.

use std::os::fd::{AsRawFd, OwnedFd};

use nix::unistd::{dup2, fork, ForkResult, Pid};

use ccon_common::config::Process;
use ccon_common::error::{CconError, Result};

use crate::{exec, pipes, reap, signal};

/// Runs every hook in `hooks` in order.
///
/// `cpid` carries the container PID for pre-start hooks and is `None` for
/// post-stop, where the hook inherits the runtime's stdin and failures are
/// ignored.
///
/// # Errors
///
/// With `cpid` set: returns the first hook failure, a dead container, or
/// any resource error. Without `cpid`: only resource errors surface.
pub fn run_hooks(hooks: &[Process], name: &str, cpid: Option<Pid>) -> Result<()> {
    for (index, hook) in hooks.iter().enumerate() {
        tracing::debug!(hook = index, "running {name} hook");

        let stdin_pipe = match cpid {
            Some(pid) => {
                let (read_end, write_end) = pipes::create()?;
                pipes::write_message(&write_end, &format!("{pid}\n"))?;
                drop(write_end);
                if !signal::child_alive() {
                    return Err(CconError::PeerDead);
                }
                Some(read_end)
            }
            None => None,
        };

        let hpid = match unsafe { fork() }.map_err(|err| CconError::Sys {
            op: "fork",
            source: err.into(),
        })? {
            ForkResult::Child => hook_child(hook, stdin_pipe),
            ForkResult::Parent { child } => {
                signal::set_hook(child);
                // The parent keeps no end of the hook pipe.
                drop(stdin_pipe);
                child
            }
        };

        tracing::debug!(hook = index, pid = hpid.as_raw(), "launched {name} hook");
        let status = reap::wait_exit(hpid, "hook")?;
        signal::clear_hook();

        if cpid.is_some() && status != 0 {
            return Err(CconError::Hook { status });
        }
    }
    Ok(())
}

/// Hook child body: wire up stdin, exec, and never return.
fn hook_child(hook: &Process, stdin_pipe: Option<OwnedFd>) -> ! {
    if let Some(read_end) = stdin_pipe {
        if dup2(read_end.as_raw_fd(), libc::STDIN_FILENO).is_err() {
            unsafe { libc::_exit(1) }
        }
        drop(read_end);
    }
    if hook.args.is_empty() {
        unsafe { libc::_exit(0) }
    }
    let _err = exec::exec_into(hook, None);
    unsafe { libc::_exit(1) }
}
