//! Inventory sources.
//!
//! An inventory comes from one of three places: an inline `host[:port],...`
//! list, an executable program speaking the dynamic inventory protocol, or a
//! structured file handed to an [`InventoryParser`]. Executables and files both
//! produce an [`InventoryDocument`], so the inventory itself only ever sees
//! groups of host names with variable mappings.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

use super::{Group, InventoryError, InventoryResult};
use crate::vars::Variables;

/// Where an inventory was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventorySource {
    /// Inline host tokens, each `name[:port]`
    Inline(Vec<String>),
    /// Dynamic inventory program
    Executable(PathBuf),
    /// Structured inventory file
    File(PathBuf),
}

impl InventorySource {
    /// Decide what kind of source a host-list string names.
    ///
    /// A string containing a comma is an inline list. Otherwise it is a path:
    /// executable files are dynamic inventories, anything else is a file.
    pub fn detect(host_list: &str) -> Self {
        if host_list.contains(',') {
            return Self::Inline(split_inline(host_list));
        }

        let path = PathBuf::from(host_list);
        if is_executable(&path) {
            Self::Executable(path)
        } else {
            Self::File(path)
        }
    }

    /// Whether host variables must be fetched on demand from a program.
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Executable(_))
    }
}

impl std::fmt::Display for InventorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(hosts) => write!(f, "{}", hosts.join(",")),
            Self::Executable(path) | Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Split an inline host list, dropping empty tokens.
fn split_inline(host_list: &str) -> Vec<String> {
    host_list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

/// Group entry in an inventory document: a bare host list or a detailed
/// mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum GroupEntry {
    Hosts(Vec<String>),
    Detailed {
        #[serde(default)]
        hosts: Vec<String>,
        #[serde(default)]
        vars: Variables,
        #[serde(default)]
        children: Vec<String>,
    },
}

/// The normalized shape every non-inline source produces.
#[derive(Debug, Clone, Default)]
pub struct InventoryDocument {
    /// Groups in document order
    pub groups: Vec<Group>,
    /// Per-host variables from `_meta.hostvars`
    pub hostvars: IndexMap<String, Variables>,
}

impl InventoryDocument {
    /// Interpret a decoded document.
    pub fn from_mapping(mapping: IndexMap<String, serde_yaml::Value>) -> InventoryResult<Self> {
        let mut document = Self::default();

        for (name, value) in mapping {
            if name == "_meta" {
                document.hostvars = parse_meta(value)?;
                continue;
            }

            let entry: GroupEntry = serde_yaml::from_value(value).map_err(|e| {
                InventoryError::InvalidDocument(format!("group '{}': {}", name, e))
            })?;

            let mut group = Group::new(name);
            match entry {
                GroupEntry::Hosts(hosts) => {
                    for host in hosts {
                        group.add_host(host);
                    }
                }
                GroupEntry::Detailed {
                    hosts,
                    vars,
                    children,
                } => {
                    for host in hosts {
                        group.add_host(host);
                    }
                    for child in children {
                        group.add_child(child);
                    }
                    group.vars = vars;
                }
            }
            document.groups.push(group);
        }

        Ok(document)
    }

    /// Decode a JSON document, as emitted by dynamic inventory programs.
    pub fn from_json(bytes: &[u8]) -> InventoryResult<Self> {
        let mapping: IndexMap<String, serde_yaml::Value> = serde_json::from_slice(bytes)?;
        Self::from_mapping(mapping)
    }

    /// Decode a YAML (or JSON) document.
    pub fn from_yaml(content: &str) -> InventoryResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mapping: IndexMap<String, serde_yaml::Value> = serde_yaml::from_str(content)?;
        Self::from_mapping(mapping)
    }
}

fn parse_meta(value: serde_yaml::Value) -> InventoryResult<IndexMap<String, Variables>> {
    #[derive(Deserialize)]
    struct Meta {
        #[serde(default)]
        hostvars: IndexMap<String, Variables>,
    }

    let meta: Meta = serde_yaml::from_value(value)
        .map_err(|e| InventoryError::InvalidDocument(format!("_meta: {}", e)))?;
    Ok(meta.hostvars)
}

/// Parser for structured inventory files.
///
/// Richer file formats plug in here; the inventory only consumes the
/// resulting document.
pub trait InventoryParser: Send + Sync {
    /// Parse the file at `path`.
    fn parse(&self, path: &Path) -> InventoryResult<InventoryDocument>;
}

/// Default parser: the file holds an inventory document in YAML or JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentParser;

impl InventoryParser for DocumentParser {
    fn parse(&self, path: &Path) -> InventoryResult<InventoryDocument> {
        let content = std::fs::read_to_string(path).map_err(|e| InventoryError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        InventoryDocument::from_yaml(&content)
    }
}

/// Client for the dynamic inventory protocol.
#[derive(Debug, Clone)]
pub struct InventoryScript {
    path: PathBuf,
}

impl InventoryScript {
    /// Wrap the program at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the program.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Invoke the program with no arguments and decode its group listing.
    ///
    /// Runs once while the inventory is loaded, before any session starts.
    pub fn list(&self) -> InventoryResult<InventoryDocument> {
        debug!(program = %self.path.display(), "Listing inventory program");
        let output = Command::new(&self.path)
            .output()
            .map_err(|e| self.failed(e.to_string()))?;
        let stdout = self.check(output)?;
        InventoryDocument::from_json(&stdout)
    }

    /// Invoke the program with `--host <name>` and decode the variables.
    pub async fn host_vars(&self, name: &str) -> InventoryResult<Variables> {
        debug!(program = %self.path.display(), host = name, "Asking inventory program for host");
        let output = tokio::process::Command::new(&self.path)
            .arg("--host")
            .arg(name)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.failed(e.to_string()))?;

        let stdout = self.check(output)?;
        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(Variables::new());
        }
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&stdout)?;
        Ok(crate::vars::from_json_object(object)?)
    }

    fn check(&self, output: Output) -> InventoryResult<Vec<u8>> {
        if !output.status.success() {
            return Err(self.failed(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    fn failed(&self, message: String) -> InventoryError {
        InventoryError::DynamicInventoryFailed {
            path: self.path.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_inline() {
        assert_eq!(
            InventorySource::detect("web1,web2:2222,"),
            InventorySource::Inline(vec!["web1".into(), "web2:2222".into()])
        );
    }

    #[test]
    fn test_detect_missing_path_is_file() {
        assert_eq!(
            InventorySource::detect("/nonexistent/hosts"),
            InventorySource::File(PathBuf::from("/nonexistent/hosts"))
        );
    }

    #[test]
    fn test_document_both_group_shapes() {
        let doc = InventoryDocument::from_json(
            br#"{
                "web": ["web1", "web2"],
                "db": {"hosts": ["db1"], "vars": {"port": 5432}},
                "prod": {"children": ["web", "db"]},
                "_meta": {"hostvars": {"web1": {"role": "front"}}}
            }"#,
        )
        .unwrap();

        let names: Vec<_> = doc.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["web", "db", "prod"]);
        assert!(doc.groups[0].has_host("web2"));
        assert_eq!(
            doc.groups[1].get_var("port"),
            Some(&serde_yaml::Value::from(5432))
        );
        assert!(doc.groups[2].has_child("db"));
        assert_eq!(
            doc.hostvars["web1"]["role"],
            serde_yaml::Value::from("front")
        );
    }

    #[test]
    fn test_document_rejects_bad_group() {
        let err = InventoryDocument::from_json(br#"{"web": 42}"#).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidDocument(_)));
    }

    #[test]
    fn test_empty_yaml_document() {
        let doc = InventoryDocument::from_yaml("  \n").unwrap();
        assert!(doc.groups.is_empty());
    }
}
