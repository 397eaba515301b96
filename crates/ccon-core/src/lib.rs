//! # ccon-core
//!
//! Low-level Linux isolation primitives for the ccon runtime:
//!
//! - **Namespaces**: name tables, clone-flag computation, and `setns(2)`
//!   joining of preexisting namespaces.
//! - **User-namespace mappings**: host-side `/proc/<pid>/{uid_map,
//!   setgroups,gid_map}` writes.
//! - **Filesystem**: the ordered mount list and `pivot_root(2)` with
//!   old-root cleanup.
//! - **Identity**: UID/GID/supplementary-group application.
//! - **Capabilities**: reconstruction of an exact named capability set
//!   across the effective, permitted, inheritable, and bounding sets.

#[cfg(not(target_os = "linux"))]
compile_error!("ccon-core requires Linux (namespaces, pivot_root, capabilities)");

pub mod capability;
pub mod filesystem;
pub mod identity;
pub mod namespace;
pub mod userns;
