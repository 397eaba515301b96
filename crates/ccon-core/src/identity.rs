//! Container process identity: UID, GID, and supplementary groups.
//!
//! Applied in the container after the exec signal, in an order that never
//! attempts a privileged step after the UID drop: setgid, then setgroups,
//! then setuid.

use nix::unistd::{setgid, setgroups, setuid, Gid, Uid};

use ccon_common::config::Config;
use ccon_common::error::{CconError, Result};

/// Applies `process.user` from the config. Absent fields are skipped.
///
/// # Errors
///
/// Returns a privilege error if any identity syscall fails.
pub fn apply(config: &Config) -> Result<()> {
    let Some(user) = config.process.as_ref().and_then(|p| p.user.as_ref()) else {
        return Ok(());
    };

    if let Some(gid) = user.gid {
        tracing::debug!(gid, "setting GID");
        setgid(Gid::from_raw(gid)).map_err(|err| CconError::Privilege {
            message: format!("setgid({gid}) failed: {err}"),
        })?;
    }

    if let Some(gids) = &user.additional_gids {
        let groups: Vec<Gid> = gids.iter().copied().map(Gid::from_raw).collect();
        tracing::debug!(groups = ?gids, "setting additional GIDs");
        setgroups(&groups).map_err(|err| CconError::Privilege {
            message: format!("setgroups({gids:?}) failed: {err}"),
        })?;
    }

    if let Some(uid) = user.uid {
        tracing::debug!(uid, "setting UID");
        setuid(Uid::from_raw(uid)).map_err(|err| CconError::Privilege {
            message: format!("setuid({uid}) failed: {err}"),
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_without_user_is_a_no_op() {
        let config =
            Config::from_json(r#"{"version":"0.2.0","process":{"args":["/bin/true"]}}"#)
                .expect("parse");
        apply(&config).expect("no identity requested");
    }

    #[test]
    fn config_without_process_is_a_no_op() {
        let config = Config::from_json(r#"{"version":"0.2.0"}"#).expect("parse");
        apply(&config).expect("no process");
    }
}
