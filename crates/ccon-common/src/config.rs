//! Container configuration model.
//!
//! Mirrors the JSON schema accepted by the runtime. Unknown keys are
//! ignored; only the `version` field is validated beyond type shape.
//! The `namespaces` object is an ordered map so that namespace joining and
//! mount handling follow configuration order.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::SUPPORTED_VERSIONS;
use crate::error::{CconError, Result};

/// Root configuration for a single container run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Specification version; accepted when prefixed by a supported version.
    pub version: String,
    /// Namespaces to create (no `path`) or join (`path` present), in
    /// configuration order.
    #[serde(default)]
    pub namespaces: IndexMap<String, Namespace>,
    /// Lifecycle hook processes.
    #[serde(default)]
    pub hooks: Hooks,
    /// The container process; when absent the container exits 0 after setup.
    #[serde(default)]
    pub process: Option<Process>,
}

/// Descriptor for one namespace entry.
///
/// The mapping fields are only meaningful under the `user` key, and
/// `mounts` only under the `mount` key; other entries carry just `path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Namespace {
    /// Path to a preexisting namespace to join instead of creating one.
    pub path: Option<String>,
    /// UID mappings written to `/proc/<pid>/uid_map`.
    pub uid_mappings: Vec<IdMapping>,
    /// GID mappings written to `/proc/<pid>/gid_map`.
    pub gid_mappings: Vec<IdMapping>,
    /// Value for `/proc/<pid>/setgroups`: allow when true, deny when false.
    pub setgroups: Option<bool>,
    /// Ordered mount operations performed inside the mount namespace.
    pub mounts: Vec<Mount>,
}

/// One line of a uid_map or gid_map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    /// First ID inside the container.
    #[serde(rename = "containerID")]
    pub container_id: u32,
    /// First ID on the host.
    #[serde(rename = "hostID")]
    pub host_id: u32,
    /// Number of consecutive IDs mapped.
    pub size: i32,
}

/// A single mount operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Mount {
    /// Mount source; resolved against the working directory when relative.
    pub source: Option<String>,
    /// Mount target; resolved against the working directory when relative.
    pub target: Option<String>,
    /// Filesystem type. The value `pivot-root` switches the root filesystem
    /// to `source` instead of mounting.
    #[serde(rename = "type")]
    pub fstype: Option<String>,
    /// Symbolic mount-flag tokens, OR-ed together.
    pub flags: Vec<String>,
    /// Filesystem-specific option string.
    pub data: Option<String>,
}

/// Lifecycle hook lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hooks {
    /// Run after container setup, before the exec signal. A failure aborts
    /// the run.
    #[serde(rename = "pre-start", default)]
    pub pre_start: Vec<Process>,
    /// Run after the container has been reaped. Failures are ignored.
    #[serde(rename = "post-stop", default)]
    pub post_stop: Vec<Process>,
}

/// A process descriptor, used for both the container process and hooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Process {
    /// Argument vector; an empty vector means "exit 0 without exec".
    pub args: Vec<String>,
    /// `KEY=VALUE` environment entries; the ambient environment is
    /// inherited when absent.
    pub env: Option<Vec<String>>,
    /// Executable path overriding `args[0]` for the exec call.
    pub path: Option<String>,
    /// Working directory applied before identity changes.
    pub cwd: Option<String>,
    /// When true, the executable is opened from the host filesystem before
    /// the mount view changes and exec'd by file descriptor.
    pub host: bool,
    /// Identity applied after the exec signal.
    pub user: Option<User>,
    /// `CAP_`-prefixed capability names retained across the exec.
    pub capabilities: Option<Vec<String>>,
}

/// UID/GID identity for the container process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// UID applied last, after all privileged setup.
    pub uid: Option<u32>,
    /// GID applied first.
    pub gid: Option<u32>,
    /// Supplementary groups; an empty list clears them, absence skips the
    /// call entirely.
    pub additional_gids: Option<Vec<u32>>,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid JSON
    /// for this schema.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| CconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Parses a configuration from an inline JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON for this schema.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks that the config version is supported.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unsupported versions.
    pub fn validate(&self) -> Result<()> {
        if SUPPORTED_VERSIONS
            .iter()
            .any(|supported| self.version.starts_with(supported))
        {
            Ok(())
        } else {
            Err(CconError::Config {
                message: format!("config version {} is not supported", self.version),
            })
        }
    }

    /// Returns the named namespace descriptor, if configured.
    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Returns the ordered mount list from the mount namespace entry.
    #[must_use]
    pub fn mounts(&self) -> &[Mount] {
        match self.namespace("mount") {
            Some(ns) => &ns.mounts,
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses() {
        let config =
            Config::from_json(r#"{"version":"0.2.0","process":{"args":["/bin/true"]}}"#)
                .expect("minimal config should parse");
        assert_eq!(config.version, "0.2.0");
        let process = config.process.expect("process present");
        assert_eq!(process.args, vec!["/bin/true"]);
        assert!(process.env.is_none());
        assert!(!process.host);
        assert!(config.namespaces.is_empty());
    }

    #[test]
    fn version_prefixes_accepted() {
        for version in ["0.1.0", "0.2.0", "0.1.0-rc1", "0.2.0+build"] {
            let config =
                Config::from_json(&format!(r#"{{"version":"{version}"}}"#)).expect("parse");
            assert!(config.validate().is_ok(), "version {version} should pass");
        }
    }

    #[test]
    fn unsupported_version_rejected() {
        for version in ["0.3.0", "1.0.0", ""] {
            let config =
                Config::from_json(&format!(r#"{{"version":"{version}"}}"#)).expect("parse");
            assert!(config.validate().is_err(), "version {version} should fail");
        }
    }

    #[test]
    fn namespaces_preserve_configuration_order() {
        let config = Config::from_json(
            r#"{
                "version": "0.2.0",
                "namespaces": {
                    "uts": {},
                    "net": {"path": "/proc/1/ns/net"},
                    "ipc": {}
                }
            }"#,
        )
        .expect("parse");
        let names: Vec<&str> = config.namespaces.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["uts", "net", "ipc"]);
        assert!(config.namespace("uts").expect("uts").path.is_none());
        assert_eq!(
            config.namespace("net").expect("net").path.as_deref(),
            Some("/proc/1/ns/net")
        );
    }

    #[test]
    fn user_namespace_mappings_parse() {
        let config = Config::from_json(
            r#"{
                "version": "0.2.0",
                "namespaces": {
                    "user": {
                        "uidMappings": [{"containerID": 0, "hostID": 1000, "size": 1}],
                        "gidMappings": [{"containerID": 0, "hostID": 1000, "size": 1}],
                        "setgroups": false
                    }
                }
            }"#,
        )
        .expect("parse");
        let user = config.namespace("user").expect("user namespace");
        assert_eq!(
            user.uid_mappings,
            vec![IdMapping {
                container_id: 0,
                host_id: 1000,
                size: 1
            }]
        );
        assert_eq!(user.setgroups, Some(false));
    }

    #[test]
    fn hooks_use_dashed_keys() {
        let config = Config::from_json(
            r#"{
                "version": "0.2.0",
                "hooks": {
                    "pre-start": [{"args": ["/bin/cat"]}],
                    "post-stop": [{"args": ["/bin/true"], "env": []}]
                }
            }"#,
        )
        .expect("parse");
        assert_eq!(config.hooks.pre_start.len(), 1);
        assert_eq!(config.hooks.post_stop.len(), 1);
        assert_eq!(config.hooks.pre_start[0].args, vec!["/bin/cat"]);
        assert_eq!(
            config.hooks.post_stop[0].env,
            Some(vec![]),
            "empty env list is distinct from an absent one"
        );
    }

    #[test]
    fn mount_entries_parse() {
        let config = Config::from_json(
            r#"{
                "version": "0.2.0",
                "namespaces": {
                    "mount": {
                        "mounts": [
                            {"type": "pivot-root", "source": "rootfs"},
                            {
                                "source": "proc",
                                "target": "/proc",
                                "type": "proc",
                                "flags": ["MS_NOSUID", "MS_NODEV"],
                                "data": "hidepid=2"
                            }
                        ]
                    }
                }
            }"#,
        )
        .expect("parse");
        let mounts = config.mounts();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].fstype.as_deref(), Some("pivot-root"));
        assert_eq!(mounts[1].flags, vec!["MS_NOSUID", "MS_NODEV"]);
        assert_eq!(mounts[1].data.as_deref(), Some("hidepid=2"));
    }

    #[test]
    fn additional_gids_absent_vs_empty() {
        let absent = Config::from_json(
            r#"{"version":"0.2.0","process":{"args":["/bin/id"],"user":{"uid":0}}}"#,
        )
        .expect("parse");
        let empty = Config::from_json(
            r#"{"version":"0.2.0","process":{"args":["/bin/id"],"user":{"additionalGids":[]}}}"#,
        )
        .expect("parse");
        let absent_user = absent.process.expect("process").user.expect("user");
        let empty_user = empty.process.expect("process").user.expect("user");
        assert!(absent_user.additional_gids.is_none());
        assert_eq!(empty_user.additional_gids, Some(vec![]));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = Config::from_json(
            r#"{"version":"0.2.0","platform":{"os":"linux"},"process":{"args":["/bin/true"],"terminal":false}}"#,
        )
        .expect("unknown keys should be ignored");
        assert!(config.process.is_some());
    }
}
