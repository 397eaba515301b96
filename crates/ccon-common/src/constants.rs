//! Runtime-wide constants and protocol literals.

/// Application name used in CLI output.
pub const APP_NAME: &str = "ccon";

/// Runtime version reported by `--version`.
pub const VERSION: &str = "0.2.0";

/// Config `version` prefixes this runtime accepts.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.1.0", "0.2.0"];

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Stack size for the cloned container process.
pub const STACK_SIZE: usize = 1024 * 1024;

/// Maximum path length in bytes, terminating NUL included.
pub const MAX_PATH: usize = 1024;

/// Maximum handshake line length accepted by the pipe reader.
pub const MAX_LINE: usize = 16384;

/// Host → container: user-namespace mappings have been written.
pub const USER_NAMESPACE_MAPPING_COMPLETE: &str = "user-namespace-mapping-complete\n";

/// Container → host: namespaces joined and mounts applied.
pub const CONTAINER_SETUP_COMPLETE: &str = "container-setup-complete\n";

/// Host → container: pre-start hooks passed, exec the user process.
pub const EXEC_PROCESS: &str = "exec-process\n";
