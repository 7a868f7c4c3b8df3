//! Shared test utilities and fixtures for the hostexec test suite.
//!
//! This module provides:
//! - Inventory document fixtures
//! - Fake executables (inventory programs, ssh and sftp stand-ins)
//! - Temporary directory management
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use hostexec::inventory::Inventory;

/// A YAML inventory with nested groups and `_meta.hostvars`.
pub const SAMPLE_INVENTORY: &str = r#"
all:
  vars:
    ntp_server: ntp.example.com
    http_port: 80
webservers:
  hosts: [web1, web2, "web3:2222"]
  vars:
    http_port: 8080
    role: web
databases:
  hosts: [db1, db2]
  vars:
    role: db
production:
  children: [webservers, databases]
  vars:
    env: prod
    role: generic
_meta:
  hostvars:
    web1:
      http_port: 9090
      packages: [nginx, curl]
      owner:
        name: ops
        ids: [7, 9]
"#;

/// Same groups as [`SAMPLE_INVENTORY`] in the dynamic inventory JSON shape.
pub const SAMPLE_LISTING: &str = r#"{
  "webservers": {"hosts": ["web1", "web2"], "vars": {"role": "web"}},
  "databases": ["db1"],
  "production": {"children": ["webservers", "databases"]}
}"#;

/// Scratch directory that lives as long as the value.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a plain file.
    pub fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write file");
        path
    }

    /// Write a shell script and mark it executable.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.file(name, &format!("#!/bin/sh\n{}\n", body));
        let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod script");
        path
    }

    /// Write [`SAMPLE_INVENTORY`] and load it.
    pub fn sample_inventory(&self) -> Inventory {
        let path = self.file("hosts.yml", SAMPLE_INVENTORY);
        Inventory::from_file(path).expect("load sample inventory")
    }

    /// A dynamic inventory program: no arguments prints [`SAMPLE_LISTING`],
    /// `--host web1` prints a variable mapping, other hosts print `{}`.
    pub fn inventory_script(&self) -> PathBuf {
        let body = format!(
            r#"if [ "$1" = "--host" ]; then
  if [ "$2" = "web1" ]; then
    echo '{{"http_port": 8081, "asked": "'"$2"'"}}'
  else
    echo '{{}}'
  fi
  exit 0
fi
[ "$#" -eq 0 ] || exit 9
cat <<'EOF'
{}
EOF"#,
            SAMPLE_LISTING
        );
        self.script("inventory.sh", &body)
    }

    /// Fake `ssh` that records its arguments, one per line, and exits 0.
    pub fn recording_ssh(&self) -> (PathBuf, PathBuf) {
        let log = self.path().join("ssh.args");
        let body = format!(
            r#"for arg in "$@"; do printf '%s\n' "$arg" >> '{}'; done
echo remote-output"#,
            log.display()
        );
        (self.script("fake-ssh", &body), log)
    }

    /// Fake `ssh` that prints the sudo prompt embedded in its last
    /// argument, reads a password and echoes it back.
    pub fn prompting_ssh(&self) -> PathBuf {
        let body = r#"for last in "$@"; do :; done
key=$(printf '%s' "$last" | sed -n 's/.*key=\([a-z]*\)\].*/\1/p')
printf '[sudo via hostexec, key=%s] password: ' "$key"
read -r pw
echo "authenticated:$pw"
echo "diagnostics" >&2"#;
        self.script("prompting-ssh", body)
    }

    /// Fake `sftp` that stores its batch script and exits with `code`.
    pub fn sftp(&self, code: i32) -> (PathBuf, PathBuf) {
        let batch = self.path().join("sftp.batch");
        let body = format!(
            r#"cat > '{}'
echo "sftp: transfer attempted"
echo "sftp: permission denied" >&2
exit {}"#,
            batch.display(),
            code
        );
        (self.script(&format!("fake-sftp-{}", code), &body), batch)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of a list of hosts.
pub fn names<'a, I>(hosts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a hostexec::inventory::Host>,
{
    hosts.into_iter().map(|h| h.name.clone()).collect()
}
