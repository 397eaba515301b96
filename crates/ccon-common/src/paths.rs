//! Bounded path helpers.
//!
//! All paths handled by the runtime are limited to [`MAX_PATH`] bytes
//! including the terminating NUL, so a string may hold at most
//! `MAX_PATH - 1` bytes. Longer paths are a fatal configuration error.

use crate::constants::MAX_PATH;
use crate::error::{CconError, Result};

/// Checks that `path` fits within the runtime path bound.
///
/// # Errors
///
/// Returns a configuration error when the path is too long.
pub fn check(path: &str) -> Result<&str> {
    if path.len() >= MAX_PATH {
        return Err(CconError::Config {
            message: format!(
                "path {path} is too long ({} >= {MAX_PATH})",
                path.len()
            ),
        });
    }
    Ok(path)
}

/// Joins `base` and `rel` with a single separator, enforcing the bound.
///
/// # Errors
///
/// Returns a configuration error when the joined path is too long.
pub fn join(base: &str, rel: &str) -> Result<String> {
    let joined = format!("{base}/{rel}");
    check(&joined)?;
    Ok(joined)
}

/// Resolves `path` against `cwd`: absolute paths are used verbatim,
/// relative ones are joined onto `cwd`. Both forms are length-checked.
///
/// # Errors
///
/// Returns a configuration error when the resolved path is too long.
pub fn resolve(cwd: &str, path: &str) -> Result<String> {
    if path.starts_with('/') {
        check(path)?;
        Ok(path.to_owned())
    } else {
        join(cwd, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_accepted_path_is_max_minus_nul() {
        let path = "/".repeat(MAX_PATH - 1);
        assert!(check(&path).is_ok());
        let too_long = "/".repeat(MAX_PATH);
        assert!(check(&too_long).is_err());
    }

    #[test]
    fn join_inserts_separator() {
        assert_eq!(join("/tmp", "rootfs").expect("join"), "/tmp/rootfs");
    }

    #[test]
    fn join_rejects_overflow() {
        let base = "/".repeat(MAX_PATH - 4);
        assert!(join(&base, "ab").is_ok());
        assert!(join(&base, "abc").is_err());
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        assert_eq!(
            resolve("/work", "/etc/hosts").expect("resolve"),
            "/etc/hosts"
        );
        assert_eq!(resolve("/work", "rootfs").expect("resolve"), "/work/rootfs");
    }
}
