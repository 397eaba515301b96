//! # ccon-runtime
//!
//! The two-process container lifecycle orchestrator. The host side clones a
//! container process into the configured namespaces, performs privileged
//! setup from outside, and synchronizes with the container side over a pair
//! of anonymous pipes carrying a three-message line protocol:
//!
//! ```text
//! host:       READY → wrote_mapping → read_setup → ran_hooks → wrote_exec → waited
//! container:  READY → read_mapping  → joined_ns → mounted → wrote_setup → read_exec → execed
//! ```
//!
//! Hook processes run on the host at the pre-start and post-stop phases;
//! signal pressure (SIGHUP/SIGINT/SIGTERM) forwards SIGKILL to the
//! container, and SIGCHLD keeps the process-wide PID cells honest.

pub mod container;
pub mod exec;
pub mod hooks;
pub mod host;
pub mod pipes;
pub mod reap;
pub mod signal;
