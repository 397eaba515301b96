//! Unified error types for the ccon workspace.
//!
//! Every fallible operation in the core and runtime crates surfaces one of
//! these variants; the orchestrator converts the result into the process
//! exit status.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CconError {
    /// An I/O operation on a named path failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A syscall failed while acquiring or releasing a resource.
    #[error("{op} failed: {source}")]
    Sys {
        /// Name of the failed operation.
        op: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The peer sent an unexpected handshake message.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the observed deviation.
        message: String,
    },

    /// A privileged operation was refused by the kernel.
    #[error("permission denied: {message}")]
    Privilege {
        /// Description of the denied operation.
        message: String,
    },

    /// The container process died before setup completed.
    #[error("container process died during setup")]
    PeerDead,

    /// A lifecycle hook exited with a non-zero status.
    #[error("hook exited with status {status}")]
    Hook {
        /// The hook's exit status.
        status: i32,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_message() {
        let err = CconError::Config {
            message: "bad value".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("bad value"));
    }

    #[test]
    fn sys_error_display_op() {
        let err = CconError::Sys {
            op: "pipe",
            source: std::io::Error::from(std::io::ErrorKind::OutOfMemory),
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("pipe failed"));
    }

    #[test]
    fn hook_error_display_status() {
        let err = CconError::Hook { status: 3 };
        assert_eq!(format!("{err}"), "hook exited with status 3");
    }

    #[test]
    fn serialization_error_from_serde_json() {
        let bad_json = "not json";
        let serde_err = serde_json::from_str::<serde_json::Value>(bad_json).unwrap_err();
        let err: CconError = serde_err.into();
        assert!(matches!(err, CconError::Serialization { .. }));
    }
}
