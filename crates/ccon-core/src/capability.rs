//! Capability state reconstruction.
//!
//! When `process.capabilities` is present, the applied state holds exactly
//! the named capabilities and nothing else: every other capability is
//! dropped from the bounding set, then the effective, permitted, and
//! inheritable sets are replaced with the named set. The bounding drops run
//! first, while the privilege to perform them is still in effect.

use std::str::FromStr;

use caps::{CapSet, Capability, CapsHashSet};

use ccon_common::config::Config;
use ccon_common::error::{CconError, Result};

/// Parses a `CAP_`-prefixed capability name. Unknown names are fatal.
///
/// # Errors
///
/// Returns a configuration error for names shorter than the prefix,
/// missing the prefix, or naming no known capability.
pub fn parse_capability(name: &str) -> Result<Capability> {
    if name.len() < 4 || !name.starts_with("CAP_") {
        return Err(CconError::Config {
            message: format!("malformed capability name: {name}"),
        });
    }
    Capability::from_str(name).map_err(|_| CconError::Config {
        message: format!("unrecognized capability name: {name}"),
    })
}

/// Applies `process.capabilities` from the config, if present.
///
/// # Errors
///
/// Returns a configuration error for bad names and a privilege error when
/// the kernel refuses a capability update.
pub fn apply(config: &Config) -> Result<()> {
    let Some(names) = config
        .process
        .as_ref()
        .and_then(|p| p.capabilities.as_ref())
    else {
        return Ok(());
    };

    let mut wanted = CapsHashSet::new();
    for name in names {
        wanted.insert(parse_capability(name)?);
    }
    tracing::debug!(capabilities = ?wanted, "restricting to named capability set");

    // Bounding drops need CAP_SETPCAP, so they happen before the effective
    // set shrinks.
    for cap in caps::all() {
        if wanted.contains(&cap) {
            continue;
        }
        caps::drop(None, CapSet::Bounding, cap).map_err(|err| CconError::Privilege {
            message: format!("dropping {cap} from the bounding set failed: {err}"),
        })?;
    }

    for set in [CapSet::Effective, CapSet::Permitted, CapSet::Inheritable] {
        caps::set(None, set, &wanted).map_err(|err| CconError::Privilege {
            message: format!("applying {set:?} capability set failed: {err}"),
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_names_parse() {
        assert_eq!(
            parse_capability("CAP_CHOWN").expect("CAP_CHOWN"),
            Capability::CAP_CHOWN
        );
        assert_eq!(
            parse_capability("CAP_NET_BIND_SERVICE").expect("CAP_NET_BIND_SERVICE"),
            Capability::CAP_NET_BIND_SERVICE
        );
        assert_eq!(
            parse_capability("CAP_SYS_ADMIN").expect("CAP_SYS_ADMIN"),
            Capability::CAP_SYS_ADMIN
        );
    }

    #[test]
    fn short_names_are_fatal() {
        assert!(parse_capability("CAP").is_err());
        assert!(parse_capability("").is_err());
    }

    #[test]
    fn unprefixed_names_are_fatal() {
        assert!(parse_capability("SYS_ADMIN").is_err());
        assert!(parse_capability("chown").is_err());
    }

    #[test]
    fn unknown_names_are_fatal() {
        assert!(parse_capability("CAP_DOES_NOT_EXIST").is_err());
    }

    #[test]
    fn config_without_capabilities_is_a_no_op() {
        let config =
            Config::from_json(r#"{"version":"0.2.0","process":{"args":["/bin/true"]}}"#)
                .expect("parse");
        apply(&config).expect("no capability change requested");
    }

    #[test]
    fn bad_capability_fails_before_any_kernel_update() {
        let config = Config::from_json(
            r#"{"version":"0.2.0","process":{"args":["/bin/true"],"capabilities":["CAP_BOGUS"]}}"#,
        )
        .expect("parse");
        assert!(matches!(apply(&config), Err(CconError::Config { .. })));
    }
}
