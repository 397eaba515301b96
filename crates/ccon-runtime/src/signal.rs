//! Process-wide signal disposition and the container/hook PID cells.
//!
//! Both cells are read and written with single-word semantics by the main
//! flow and the handlers. Handler bodies stay async-signal-safe: atomic
//! stores plus direct `kill(2)`/`waitid(2)` only, never allocation or
//! logging.

use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;

use ccon_common::error::{CconError, Result};

/// PID of the container process, or -1 when none is alive.
pub static CHILD_PID: AtomicI32 = AtomicI32::new(-1);

/// PID of the currently running hook process, or -1 when none is alive.
pub static HOOK_PID: AtomicI32 = AtomicI32::new(-1);

/// Records the freshly cloned container PID.
pub fn set_child(pid: Pid) {
    CHILD_PID.store(pid.as_raw(), Ordering::SeqCst);
}

/// Clears the container PID cell after the final reap.
pub fn clear_child() {
    CHILD_PID.store(-1, Ordering::SeqCst);
}

/// True while the SIGCHLD handler has not observed the container's exit.
pub fn child_alive() -> bool {
    CHILD_PID.load(Ordering::SeqCst) >= 0
}

/// Records the forked hook PID.
pub fn set_hook(pid: Pid) {
    HOOK_PID.store(pid.as_raw(), Ordering::SeqCst);
}

/// Clears the hook PID cell after the hook has been reaped.
pub fn clear_hook() {
    HOOK_PID.store(-1, Ordering::SeqCst);
}

/// SIGKILLs the container if the cell still holds a live PID, clearing it.
///
/// Used on the way out of the orchestrator so no container outlives the
/// runtime.
pub fn kill_lingering_child() {
    let pid = CHILD_PID.swap(-1, Ordering::SeqCst);
    if pid > 0 {
        let _ = nix::sys::signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
    }
}

/// SIGHUP/SIGINT/SIGTERM: forward SIGKILL to the container snapshot.
extern "C" fn forward_sigkill(
    _signum: libc::c_int,
    _info: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    let cpid = CHILD_PID.load(Ordering::SeqCst);
    if cpid > 0 {
        unsafe {
            libc::kill(cpid, libc::SIGKILL);
        }
    }
}

/// SIGCHLD: mark the container or hook cell dead, or reap an unknown PID.
extern "C" fn reap_exited(
    _signum: libc::c_int,
    info: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    let pid = unsafe { (*info).si_pid() };
    if pid == CHILD_PID.load(Ordering::SeqCst) {
        CHILD_PID.store(-1, Ordering::SeqCst);
    } else if pid == HOOK_PID.load(Ordering::SeqCst) {
        HOOK_PID.store(-1, Ordering::SeqCst);
    } else {
        let mut status: libc::siginfo_t = unsafe { std::mem::zeroed() };
        unsafe {
            libc::waitid(libc::P_PID, pid as libc::id_t, &mut status, libc::WEXITED);
        }
    }
}

/// Installs the host-side signal disposition.
///
/// # Errors
///
/// Returns a resource error if any `sigaction` call fails.
pub fn install() -> Result<()> {
    let forward = SigAction::new(
        SigHandler::SigAction(forward_sigkill),
        SaFlags::SA_SIGINFO,
        SigSet::empty(),
    );
    for sig in [Signal::SIGHUP, Signal::SIGINT, Signal::SIGTERM] {
        unsafe { sigaction(sig, &forward) }.map_err(|err| CconError::Sys {
            op: "sigaction",
            source: err.into(),
        })?;
    }

    let reap = SigAction::new(
        SigHandler::SigAction(reap_exited),
        SaFlags::SA_SIGINFO | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGCHLD, &reap) }.map_err(|err| CconError::Sys {
        op: "sigaction",
        source: err.into(),
    })?;
    Ok(())
}
