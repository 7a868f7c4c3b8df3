//! Inventory management for hostexec.
//!
//! This module provides:
//! - Loading from inline host lists, dynamic inventory programs and
//!   structured files
//! - Host pattern matching with subtraction and restriction
//! - Group hierarchy and variable inheritance

pub mod group;
pub mod host;
pub mod pattern;
pub mod source;

pub use group::{Group, GroupBuilder, ALL_GROUP};
pub use host::{Host, HostParseError};
pub use pattern::{HostPattern, SubPattern};
pub use source::{
    DocumentParser, InventoryDocument, InventoryParser, InventoryScript, InventorySource,
};

use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::vars::{self, Variables};

/// Errors that can occur during inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("host not found: {0}")]
    HostNotFound(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("invalid host entry '{0}'")]
    InvalidHost(String),

    #[error("invalid port '{port}' for host '{host}'")]
    InvalidPort { host: String, port: String },

    #[error("invalid inventory document: {0}")]
    InvalidDocument(String),

    #[error("failed to load inventory {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("dynamic inventory {} failed: {message}", path.display())]
    DynamicInventoryFailed { path: PathBuf, message: String },
}

/// Result type for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Allow-list applied to every host selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Restriction {
    /// Every host may be selected
    #[default]
    Unrestricted,
    /// Only the named hosts may be selected; an empty set selects nothing
    Only(BTreeSet<String>),
}

impl Restriction {
    /// Whether `host` may appear in a selection.
    pub fn allows(&self, host: &str) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Only(names) => names.contains(host),
        }
    }

    /// Whether this is the unrestricted state.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

impl From<&str> for Restriction {
    fn from(name: &str) -> Self {
        Self::Only(BTreeSet::from([name.to_string()]))
    }
}

impl From<String> for Restriction {
    fn from(name: String) -> Self {
        Self::Only(BTreeSet::from([name]))
    }
}

impl From<Vec<String>> for Restriction {
    fn from(names: Vec<String>) -> Self {
        Self::Only(names.into_iter().collect())
    }
}

impl From<Vec<&str>> for Restriction {
    fn from(names: Vec<&str>) -> Self {
        Self::Only(names.into_iter().map(String::from).collect())
    }
}

impl From<BTreeSet<String>> for Restriction {
    fn from(names: BTreeSet<String>) -> Self {
        Self::Only(names)
    }
}

/// The main inventory structure holding all hosts and groups
#[derive(Debug, Clone)]
pub struct Inventory {
    /// Where the inventory came from
    source: InventorySource,

    /// Groups in insertion order; `all` is always first
    groups: Vec<Group>,

    /// All hosts indexed by name
    hosts: IndexMap<String, Host>,

    /// Allow-list narrowing every selection
    restriction: Restriction,
}

impl Inventory {
    fn empty(source: InventorySource) -> Self {
        Self {
            source,
            groups: vec![Group::all()],
            hosts: IndexMap::new(),
            restriction: Restriction::Unrestricted,
        }
    }

    /// Load the inventory named by a host-list string, detecting its kind.
    pub fn load(host_list: &str) -> InventoryResult<Self> {
        match InventorySource::detect(host_list) {
            InventorySource::Inline(tokens) => Self::from_host_list(&tokens),
            InventorySource::Executable(path) => Self::from_executable(path),
            InventorySource::File(path) => Self::from_file(path),
        }
    }

    /// Load the inventory configured in `config.host_list`.
    pub fn from_config(config: &Config) -> InventoryResult<Self> {
        Self::load(&config.host_list)
    }

    /// Build an inventory from inline `host[:port]` tokens; every host lands
    /// in `all`.
    pub fn from_host_list<S: AsRef<str>>(tokens: &[S]) -> InventoryResult<Self> {
        let tokens: Vec<String> = tokens
            .iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut inventory = Self::empty(InventorySource::Inline(tokens.clone()));
        for token in &tokens {
            let host = parse_host(token)?;
            inventory.insert_host(host, None);
        }

        debug!(hosts = inventory.host_count(), "Loaded inline inventory");
        Ok(inventory)
    }

    /// Build an inventory from a dynamic inventory program.
    pub fn from_executable(path: impl Into<PathBuf>) -> InventoryResult<Self> {
        let path = path.into();
        let document = InventoryScript::new(&path).list()?;
        Self::from_document(InventorySource::Executable(path), document)
    }

    /// Build an inventory from a structured file using the default parser.
    pub fn from_file(path: impl Into<PathBuf>) -> InventoryResult<Self> {
        Self::from_file_with(path, &DocumentParser)
    }

    /// Build an inventory from a structured file using `parser`.
    pub fn from_file_with(
        path: impl Into<PathBuf>,
        parser: &dyn InventoryParser,
    ) -> InventoryResult<Self> {
        let path = path.into();
        let document = parser.parse(&path)?;
        Self::from_document(InventorySource::File(path), document)
    }

    /// Build an inventory from an already-parsed document.
    pub fn from_document(
        source: InventorySource,
        document: InventoryDocument,
    ) -> InventoryResult<Self> {
        let mut inventory = Self::empty(source);

        for mut group in document.groups {
            let members = std::mem::take(&mut group.hosts);
            for entry in members {
                let host = parse_host(&entry)?;
                group.add_host(host.name.clone());
                inventory.insert_host(host, Some(&group.name));
            }

            if group.is_all() {
                // The document's `all` only contributes variables and children
                let all = &mut inventory.groups[0];
                vars::merge_into(&mut all.vars, &group.vars);
                all.children.extend(group.children);
                continue;
            }
            inventory.groups.push(group);
        }

        for (name, hostvars) in document.hostvars {
            let host = parse_host(&name)?;
            let name = host.name.clone();
            inventory.insert_host(host, None);
            if let Some(host) = inventory.hosts.get_mut(&name) {
                host.merge_vars(&hostvars);
            }
        }

        debug!(
            source = %inventory.source,
            hosts = inventory.host_count(),
            groups = inventory.group_count(),
            "Loaded inventory"
        );
        Ok(inventory)
    }

    /// Register a host, optionally as a direct member of `group`. The host
    /// always joins `all`.
    fn insert_host(&mut self, host: Host, group: Option<&str>) {
        let name = host.name.clone();
        let entry = self.hosts.entry(name.clone()).or_insert_with(|| Host::new(&name));
        if host.port.is_some() {
            entry.port = host.port;
        }
        entry.merge_vars(&host.vars);
        if let Some(group) = group {
            entry.add_to_group(group);
        }
        entry.add_to_group(ALL_GROUP);

        if let Some(all) = self.groups.iter_mut().find(|g| g.is_all()) {
            all.add_host(name);
        }
    }

    /// Append a group. Duplicate names are not checked.
    pub fn add_group(&mut self, group: Group) {
        for name in &group.hosts {
            if !self.hosts.contains_key(name) {
                self.insert_host(Host::new(name), None);
            }
            if let Some(host) = self.hosts.get_mut(name) {
                host.add_to_group(group.name.clone());
            }
        }
        self.groups.push(group);
    }

    /// Add a host as a direct member of an existing group.
    pub fn add_host(&mut self, host: Host, group: &str) -> InventoryResult<()> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .ok_or_else(|| InventoryError::GroupNotFound(group.to_string()))?;
        group.add_host(host.name.clone());
        let group_name = group.name.clone();

        self.insert_host(host, Some(&group_name));
        Ok(())
    }

    /// Where this inventory was loaded from
    pub fn source(&self) -> &InventorySource {
        &self.source
    }

    /// Get all hosts
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    /// Get all groups
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Count total hosts
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Count total groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Get a host by name
    pub fn get_host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    /// Get the first group with the given name
    pub fn get_group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Names of all groups, in insertion order
    pub fn list_groups(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    /// Names of the hosts selected by `pattern`
    pub fn list_hosts(&self, pattern: &str) -> Vec<String> {
        self.select_hosts(pattern)
            .into_iter()
            .map(|h| h.name.clone())
            .collect()
    }

    /// The current restriction
    pub fn restriction(&self) -> &Restriction {
        &self.restriction
    }

    /// Narrow every later selection to the given host name(s).
    pub fn restrict_to(&mut self, restriction: impl Into<Restriction>) {
        self.restriction = restriction.into();
    }

    /// Remove the restriction.
    pub fn lift_restriction(&mut self) {
        self.restriction = Restriction::Unrestricted;
    }

    /// Hosts selected by `pattern` under the stored restriction, sorted by
    /// name.
    pub fn select_hosts(&self, pattern: &str) -> Vec<&Host> {
        self.select_hosts_with(pattern, &self.restriction)
    }

    /// Hosts selected by `pattern` under an explicit restriction, sorted by
    /// name.
    ///
    /// Sub-patterns apply in order: a matching additive sub-pattern inserts a
    /// host, a matching subtractive one removes it. A later additive
    /// sub-pattern may therefore re-include a host removed earlier.
    pub fn select_hosts_with(&self, pattern: &str, restriction: &Restriction) -> Vec<&Host> {
        let pattern = HostPattern::parse(pattern);
        let membership: Vec<(&str, BTreeSet<&str>)> = self
            .groups
            .iter()
            .map(|g| (g.name.as_str(), self.group_members(g)))
            .collect();

        let mut selected: BTreeMap<&str, &Host> = BTreeMap::new();
        for sub in pattern.parts() {
            for (group, members) in &membership {
                for &name in members {
                    if !sub.matches(group, name) || !restriction.allows(name) {
                        continue;
                    }
                    if sub.is_subtractive() {
                        selected.remove(name);
                    } else if let Some(host) = self.hosts.get(name) {
                        selected.insert(name, host);
                    }
                }
            }
        }

        debug!(
            pattern = ?pattern.parts().iter().map(SubPattern::text).collect::<Vec<_>>(),
            matched = selected.len(),
            "Selected hosts"
        );
        selected.into_values().collect()
    }

    /// Host names in a group, including those of its descendant groups.
    fn group_members<'a>(&'a self, group: &'a Group) -> BTreeSet<&'a str> {
        let mut members = BTreeSet::new();
        let mut visited = HashSet::new();
        self.collect_members(group, &mut members, &mut visited);
        members
    }

    fn collect_members<'a>(
        &'a self,
        group: &'a Group,
        members: &mut BTreeSet<&'a str>,
        visited: &mut HashSet<&'a str>,
    ) {
        if !visited.insert(group.name.as_str()) {
            return;
        }
        members.extend(group.hosts.iter().map(String::as_str));
        for child in &group.children {
            if let Some(child) = self.get_group(child) {
                self.collect_members(child, members, visited);
            }
        }
    }

    /// Variables of a group, without inheritance.
    pub fn group_variables(&self, name: &str) -> InventoryResult<&Variables> {
        self.get_group(name)
            .map(|g| &g.vars)
            .ok_or_else(|| InventoryError::GroupNotFound(name.to_string()))
    }

    /// Merged variables for a host.
    ///
    /// Executable inventories are asked for the host's variables on every
    /// call. Static inventories merge group variables by ascending depth,
    /// then the host's own variables. Both add `inventory_hostname` and the
    /// sorted `group_names`.
    pub async fn host_variables(&self, name: &str) -> InventoryResult<Variables> {
        let host = self
            .get_host(name)
            .ok_or_else(|| InventoryError::HostNotFound(name.to_string()))?;

        let groups = self.host_groups(host);
        let mut result = match &self.source {
            InventorySource::Executable(path) => InventoryScript::new(path).host_vars(name).await?,
            _ => {
                let depths = self.group_depths();
                let mut ordered: Vec<&Group> =
                    groups.iter().filter_map(|g| self.get_group(g)).collect();
                ordered.sort_by(|a, b| {
                    let da = depths.get(a.name.as_str()).copied().unwrap_or(0);
                    let db = depths.get(b.name.as_str()).copied().unwrap_or(0);
                    da.cmp(&db).then_with(|| a.name.cmp(&b.name))
                });

                let mut merged = Variables::new();
                for group in ordered {
                    vars::merge_into(&mut merged, &group.vars);
                }
                vars::merge_into(&mut merged, &host.vars);
                merged
            }
        };

        result.insert(
            "inventory_hostname".to_string(),
            serde_yaml::Value::from(name),
        );
        result.insert(
            "group_names".to_string(),
            serde_yaml::Value::Sequence(
                groups
                    .into_iter()
                    .filter(|g| g != ALL_GROUP)
                    .map(serde_yaml::Value::from)
                    .collect(),
            ),
        );
        Ok(result)
    }

    /// Names of every group a host belongs to, directly or through a child
    /// group, sorted.
    pub fn host_groups(&self, host: &Host) -> BTreeSet<String> {
        let parents = self.parent_map();
        let mut result = BTreeSet::new();
        let mut pending: Vec<&str> = host.groups.iter().map(String::as_str).collect();

        while let Some(name) = pending.pop() {
            if !result.insert(name.to_string()) {
                continue;
            }
            if let Some(ps) = parents.get(name) {
                pending.extend(ps.iter().copied());
            }
        }
        result
    }

    /// child name -> names of the groups listing it as a child
    fn parent_map(&self) -> HashMap<&str, Vec<&str>> {
        let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
        for group in &self.groups {
            for child in &group.children {
                parents
                    .entry(child.as_str())
                    .or_default()
                    .push(group.name.as_str());
            }
        }
        parents
    }

    /// Depth of each group below `all`. Top-level groups sit at depth 1; a
    /// child sits one below its deepest parent.
    fn group_depths(&self) -> HashMap<&str, usize> {
        fn depth_of<'a>(
            name: &'a str,
            parents: &HashMap<&'a str, Vec<&'a str>>,
            memo: &mut HashMap<&'a str, usize>,
            visiting: &mut HashSet<&'a str>,
        ) -> usize {
            if name == ALL_GROUP {
                return 0;
            }
            if let Some(&d) = memo.get(name) {
                return d;
            }
            if !visiting.insert(name) {
                // cycle
                return 1;
            }
            let depth = parents
                .get(name)
                .into_iter()
                .flatten()
                .map(|&p| depth_of(p, parents, memo, visiting) + 1)
                .max()
                .unwrap_or(1);
            visiting.remove(name);
            memo.insert(name, depth);
            depth
        }

        let parents = self.parent_map();
        let mut memo = HashMap::new();
        let mut visiting = HashSet::new();
        for group in &self.groups {
            depth_of(group.name.as_str(), &parents, &mut memo, &mut visiting);
        }
        memo.insert(ALL_GROUP, 0);
        memo
    }
}

fn parse_host(token: &str) -> InventoryResult<Host> {
    Host::parse(token).map_err(|e| match e {
        HostParseError::EmptyInput => InventoryError::InvalidHost(token.to_string()),
        HostParseError::InvalidPort(port) => InventoryError::InvalidPort {
            host: token.split(':').next().unwrap_or_default().to_string(),
            port,
        },
    })
}

impl std::fmt::Display for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Inventory ({} hosts, {} groups)",
            self.hosts.len(),
            self.groups.len()
        )?;

        for group in &self.groups {
            if group.hosts.is_empty() && group.children.is_empty() {
                continue;
            }
            writeln!(f, "  [{}]", group.name)?;
            for host_name in &group.hosts {
                if let Some(host) = self.hosts.get(host_name) {
                    writeln!(f, "    {}", host)?;
                }
            }
        }

        Ok(())
    }
}
