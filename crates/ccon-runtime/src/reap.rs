//! Blocking reap of a known PID.

use nix::errno::Errno;
use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use ccon_common::error::{CconError, Result};

/// Waits for `pid` to exit and returns its exit status.
///
/// A normal exit yields its status code; a death by signal (with or
/// without a core dump) yields 1. The wait retries on `EINTR` since the
/// host's SIGCHLD handler interrupts blocking syscalls.
///
/// # Errors
///
/// Returns a resource error if `waitid` fails for any other reason.
pub fn wait_exit(pid: Pid, name: &str) -> Result<i32> {
    let status = loop {
        match waitid(Id::Pid(pid), WaitPidFlag::WEXITED) {
            Ok(status) => break status,
            Err(Errno::EINTR) => continue,
            Err(err) => {
                return Err(CconError::Sys {
                    op: "waitid",
                    source: err.into(),
                })
            }
        }
    };

    match status {
        WaitStatus::Exited(_, code) => {
            tracing::debug!(pid = pid.as_raw(), code, "{name} process exited");
            Ok(code)
        }
        WaitStatus::Signaled(_, sig, core_dumped) => {
            tracing::debug!(
                pid = pid.as_raw(),
                signal = %sig,
                core_dumped,
                "{name} process killed"
            );
            Ok(1)
        }
        other => {
            tracing::debug!(pid = pid.as_raw(), status = ?other, "unrecognized {name} exit condition");
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{fork, ForkResult};

    #[test]
    fn reaps_exit_status_of_forked_child() {
        match unsafe { fork() }.expect("fork") {
            ForkResult::Child => unsafe { libc::_exit(7) },
            ForkResult::Parent { child } => {
                let status = wait_exit(child, "test").expect("wait");
                assert_eq!(status, 7);
            }
        }
    }

    #[test]
    fn signaled_child_reports_failure() {
        match unsafe { fork() }.expect("fork") {
            ForkResult::Child => unsafe {
                libc::raise(libc::SIGKILL);
                libc::_exit(0)
            },
            ForkResult::Parent { child } => {
                let status = wait_exit(child, "test").expect("wait");
                assert_eq!(status, 1);
            }
        }
    }
}
