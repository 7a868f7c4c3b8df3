//! Group definition for the hostexec inventory system.
//!
//! This module provides the `Group` structure representing a named set of
//! hosts with shared variables and optional child groups.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::vars::Variables;

/// Name of the universal group present in every inventory.
pub const ALL_GROUP: &str = "all";

/// A group of hosts in the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Group name
    pub name: String,

    /// Names of the hosts belonging directly to this group
    #[serde(default)]
    pub hosts: IndexSet<String>,

    /// Child group names
    #[serde(default)]
    pub children: IndexSet<String>,

    /// Group-specific variables
    #[serde(default)]
    pub vars: Variables,
}

impl Group {
    /// Create a new group with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: IndexSet::new(),
            children: IndexSet::new(),
            vars: Variables::new(),
        }
    }

    /// Create the special "all" group
    pub fn all() -> Self {
        Self::new(ALL_GROUP)
    }

    /// Add a host to this group; adding a name twice is a no-op
    pub fn add_host(&mut self, host: impl Into<String>) {
        self.hosts.insert(host.into());
    }

    /// Check if a host belongs directly to this group
    pub fn has_host(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    /// Add a child group
    pub fn add_child(&mut self, child: impl Into<String>) {
        self.children.insert(child.into());
    }

    /// Check if a group is a direct child of this group
    pub fn has_child(&self, child: &str) -> bool {
        self.children.contains(child)
    }

    /// Set a variable on this group
    pub fn set_var(&mut self, key: impl Into<String>, value: serde_yaml::Value) {
        self.vars.insert(key.into(), value);
    }

    /// Get a variable from this group
    pub fn get_var(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.vars.get(key)
    }

    /// Get the number of direct host members
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Whether this is the universal group
    pub fn is_all(&self) -> bool {
        self.name == ALL_GROUP
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Group {}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} hosts", self.name, self.hosts.len())?;
        if !self.children.is_empty() {
            write!(f, ", {} children", self.children.len())?;
        }
        write!(f, ")")
    }
}

/// Builder for creating groups with a fluent API
#[derive(Debug, Default)]
pub struct GroupBuilder {
    name: String,
    hosts: IndexSet<String>,
    children: IndexSet<String>,
    vars: Variables,
}

impl GroupBuilder {
    /// Create a new group builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a host to the group
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.hosts.insert(host.into());
        self
    }

    /// Add multiple hosts to the group
    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for host in hosts {
            self.hosts.insert(host.into());
        }
        self
    }

    /// Add a child group
    pub fn child(mut self, child: impl Into<String>) -> Self {
        self.children.insert(child.into());
        self
    }

    /// Add a variable
    pub fn var(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Build the group
    pub fn build(self) -> Group {
        Group {
            name: self.name,
            hosts: self.hosts,
            children: self.children,
            vars: self.vars,
        }
    }
}
