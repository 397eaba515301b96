//! Root filesystem switching via `pivot_root(2)` with old-root cleanup.

use std::path::Path;

use nix::mount::{umount2, MntFlags};
use nix::unistd::{chdir, mkdtemp, pivot_root};

use ccon_common::error::{CconError, Result};
use ccon_common::paths;

/// Pivots the root filesystem to `new_root` and removes the old root.
///
/// The sequence:
/// 1. Create the holding directory `<new_root>/pivot-root.XXXXXX`.
/// 2. `chdir` into the new root.
/// 3. `pivot_root(new_root, put_old)`.
/// 4. `chdir("/")`.
/// 5. Lazily detach the old root from the holding directory.
/// 6. Remove the holding directory.
///
/// On success nothing named `pivot-root.*` remains under the new root.
///
/// # Errors
///
/// Returns an error if any step fails; a failed pivot removes the holding
/// directory before reporting.
pub fn pivot_root_remove_old(new_root: &str) -> Result<()> {
    let template = paths::join(new_root, "pivot-root.XXXXXX")?;
    let put_old = mkdtemp(Path::new(&template)).map_err(|err| CconError::Sys {
        op: "mkdtemp",
        source: err.into(),
    })?;

    if let Err(err) = chdir(Path::new(new_root)) {
        let _ = std::fs::remove_dir(&put_old);
        return Err(CconError::Io {
            path: new_root.into(),
            source: err.into(),
        });
    }

    tracing::debug!(new_root, put_old = %put_old.display(), "pivoting root");
    if let Err(err) = pivot_root(Path::new(new_root), &put_old) {
        let _ = std::fs::remove_dir(&put_old);
        return Err(CconError::Privilege {
            message: format!("pivot_root to {new_root} failed: {err}"),
        });
    }

    // The holding directory now sits directly under the new root; address
    // it by name relative to "/".
    let old_name = put_old
        .file_name()
        .map(Path::new)
        .ok_or_else(|| CconError::Config {
            message: format!("holding directory {} has no name", put_old.display()),
        })?;

    chdir("/").map_err(|err| CconError::Io {
        path: "/".into(),
        source: err.into(),
    })?;

    tracing::debug!(old_root = %old_name.display(), "unmounting old root");
    let unmounted = umount2(old_name, MntFlags::MNT_DETACH);
    let removed = std::fs::remove_dir(old_name);

    unmounted.map_err(|err| CconError::Privilege {
        message: format!(
            "unmounting old root from {} failed: {err}",
            old_name.display()
        ),
    })?;
    removed.map_err(|source| CconError::Io {
        path: old_name.into(),
        source,
    })?;
    Ok(())
}
