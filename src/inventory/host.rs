//! Host definition for the hostexec inventory system.
//!
//! This module provides the `Host` structure representing a managed node
//! with an optional port override, its own variables and the names of the
//! groups it was placed in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::vars::Variables;

/// A managed host in the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    /// Host name, unique within an inventory
    pub name: String,

    /// Port override for the transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Host-specific variables
    #[serde(default)]
    pub vars: Variables,

    /// Names of the groups this host was placed in directly
    #[serde(skip)]
    pub groups: BTreeSet<String>,
}

impl Host {
    /// Create a new host with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: None,
            vars: Variables::new(),
            groups: BTreeSet::new(),
        }
    }

    /// Create a new host with a port override
    pub fn with_port(name: impl Into<String>, port: u16) -> Self {
        let mut host = Self::new(name);
        host.port = Some(port);
        host
    }

    /// Parse an inline `name[:port]` token.
    pub fn parse(token: &str) -> Result<Self, HostParseError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(HostParseError::EmptyInput);
        }

        match token.split_once(':') {
            Some((name, port)) => {
                if name.is_empty() {
                    return Err(HostParseError::EmptyInput);
                }
                let port = port
                    .parse()
                    .map_err(|_| HostParseError::InvalidPort(port.to_string()))?;
                Ok(Self::with_port(name, port))
            }
            None => Ok(Self::new(token)),
        }
    }

    /// Set a variable on this host
    pub fn set_var(&mut self, key: impl Into<String>, value: serde_yaml::Value) {
        self.vars.insert(key.into(), value);
    }

    /// Get a variable from this host
    pub fn get_var(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.vars.get(key)
    }

    /// Record membership in a group
    pub fn add_to_group(&mut self, group: impl Into<String>) {
        self.groups.insert(group.into());
    }

    /// Check if host was placed directly in a group
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Merge variables from another source (other takes precedence)
    pub fn merge_vars(&mut self, other: &Variables) {
        crate::vars::merge_into(&mut self.vars, other);
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Host {}

impl std::hash::Hash for Host {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

/// Errors that can occur when parsing an inline host token
#[derive(Debug, thiserror::Error)]
pub enum HostParseError {
    #[error("empty host name")]
    EmptyInput,
    #[error("invalid port: {0}")]
    InvalidPort(String),
}
