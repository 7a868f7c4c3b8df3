//! Error types for hostexec.
//!
//! Each component owns its error enum; this module gathers them into one
//! type for callers that drive the whole pipeline.

use thiserror::Error;

use crate::config::ConfigError;
use crate::connection::ConnectionError;
use crate::inventory::InventoryError;
use crate::template::TemplateError;

/// Result type alias for hostexec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for hostexec.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Inventory load or lookup failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Brace-expression rendering failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Transport failure.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A pattern selected no hosts.
    #[error("no hosts matched pattern '{0}'")]
    NoHostsMatched(String),

    /// I/O failure outside a transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Connection(_) => 3,
            Error::Config(_) => 4,
            Error::Inventory(InventoryError::HostNotFound(_) | InventoryError::GroupNotFound(_))
            | Error::NoHostsMatched(_) => 5,
            Error::Inventory(_) => 6,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let err: Error = InventoryError::HostNotFound("web9".into()).into();
        assert_eq!(err.exit_code(), 5);
        assert_eq!(err.to_string(), "host not found: web9");

        let err: Error = ConnectionError::PromptClosed {
            host: "web1".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 3);

        let err: Error = ConfigError::UnknownTransport("paramiko".into()).into();
        assert_eq!(err.exit_code(), 4);

        assert_eq!(Error::NoHostsMatched("x".into()).exit_code(), 5);
    }
}
