//! YAML configuration parser.
//!
//! Parses `approvedrevs.yaml` into [`Config`]. Every key is optional; missing
//! keys keep their defaults.
//!
//! # Example:
//! ```yaml
//! namespaces: [Main, Help, 100]
//! self_owned_namespaces: User
//! blank_if_unapproved: true
//! group_permissions:
//!   sysop: [approverevisions]
//!   editors: approverevisions
//! ```

use crate::config::types::Config;
use crate::permission::Capability;
use crate::wiki::types::Namespace;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Raw YAML representation before conversion to internal types.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    namespaces: Option<OneOrMany<NamespaceValue>>,
    #[serde(default)]
    self_owned_namespaces: Option<OneOrMany<NamespaceValue>>,
    #[serde(default)]
    file_namespace_approvable: bool,
    #[serde(default)]
    blank_if_unapproved: Option<bool>,
    #[serde(default)]
    automatic_approvals: Option<bool>,
    #[serde(default)]
    show_approve_latest: Option<bool>,
    #[serde(default)]
    group_permissions: Option<BTreeMap<String, OneOrMany<String>>>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    audit_log: Option<PathBuf>,
}

/// Allows YAML fields to be either a single value or a list:
/// ```yaml
/// self_owned_namespaces: User          # single value
/// self_owned_namespaces: [User, Help]  # or a list
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Namespaces may be written by number or by name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamespaceValue {
    Number(i32),
    Name(String),
}

impl NamespaceValue {
    fn resolve(self) -> Result<Namespace> {
        match self {
            NamespaceValue::Number(n) => Ok(Namespace(n)),
            NamespaceValue::Name(name) => Namespace::from_str_loose(&name)
                .ok_or_else(|| anyhow!("Unknown namespace '{}'", name)),
        }
    }
}

/// Parse a YAML config file from a file path.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse a YAML config string.
pub fn parse_config_str(yaml: &str) -> Result<Config> {
    let mut config = Config::default();
    if yaml.lines().all(|l| l.trim().is_empty() || l.trim_start().starts_with('#')) {
        return Ok(config);
    }

    let raw: RawConfig =
        serde_yaml::from_str(yaml).context("Invalid YAML syntax in config file")?;

    if let Some(namespaces) = raw.namespaces {
        config.namespaces = resolve_namespaces(namespaces).context("Invalid 'namespaces'")?;
    }
    if raw.file_namespace_approvable {
        config.namespaces.insert(Namespace::FILE);
    }
    if let Some(namespaces) = raw.self_owned_namespaces {
        config.self_owned_namespaces =
            resolve_namespaces(namespaces).context("Invalid 'self_owned_namespaces'")?;
    }
    if let Some(v) = raw.blank_if_unapproved {
        config.blank_if_unapproved = v;
    }
    if let Some(v) = raw.automatic_approvals {
        config.automatic_approvals = v;
    }
    if let Some(v) = raw.show_approve_latest {
        config.show_approve_latest = v;
    }
    if let Some(groups) = raw.group_permissions {
        config.group_permissions = groups
            .into_iter()
            .map(|(group, caps)| -> Result<(String, BTreeSet<Capability>)> {
                let caps = caps
                    .into_vec()
                    .iter()
                    .map(|c| {
                        Capability::from_str_loose(c).ok_or_else(|| {
                            anyhow!("Unknown capability '{}' for group '{}'", c, group)
                        })
                    })
                    .collect::<Result<BTreeSet<_>>>()?;
                Ok((group.trim().to_lowercase(), caps))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
    }
    if let Some(database) = raw.database {
        if database.trim().is_empty() {
            anyhow::bail!("'database' must not be empty");
        }
        config.database = database;
    }
    config.audit_log = raw.audit_log;

    Ok(config)
}

fn resolve_namespaces(values: OneOrMany<NamespaceValue>) -> Result<BTreeSet<Namespace>> {
    values.into_vec().into_iter().map(NamespaceValue::resolve).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::DEFAULT_CONFIG_YAML;

    #[test]
    fn test_default_yaml_matches_default_config() {
        let config = parse_config_str(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = parse_config_str("# nothing here\n\n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_names_numbers_and_single_values() {
        let yaml = r#"
namespaces: [Main, help, 100]
self_owned_namespaces: User
file_namespace_approvable: true
"#;
        let config = parse_config_str(yaml).unwrap();
        assert!(config.is_approvable_namespace(Namespace::MAIN));
        assert!(config.is_approvable_namespace(Namespace::HELP));
        assert!(config.is_approvable_namespace(Namespace(100)));
        assert!(config.files_statically_approvable());
        assert!(!config.is_approvable_namespace(Namespace::USER));
        assert!(config.is_self_owned_namespace(Namespace::USER));
    }

    #[test]
    fn test_group_permissions() {
        let yaml = r#"
group_permissions:
  Editors: approverevisions
  "*": []
"#;
        let config = parse_config_str(yaml).unwrap();
        assert_eq!(config.group_permissions.len(), 2);
        assert!(config.group_permissions["editors"].contains(&Capability::ApproveRevisions));
        assert!(config.group_permissions["*"].is_empty());
    }

    #[test]
    fn test_reject_unknown_namespace() {
        assert!(parse_config_str("namespaces: [Main, Nowhere]").is_err());
    }

    #[test]
    fn test_reject_unknown_capability() {
        let yaml = "group_permissions:\n  sysop: [delete_everything]\n";
        assert!(parse_config_str(yaml).is_err());
    }

    #[test]
    fn test_reject_unknown_key() {
        assert!(parse_config_str("namespace: [Main]").is_err());
    }
}
