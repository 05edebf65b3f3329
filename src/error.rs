//! Error types for burrow
//!
//! All modules use `BurrowResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for burrow operations
pub type BurrowResult<T> = Result<T, BurrowError>;

/// All errors that can occur in burrow
#[derive(Error, Debug)]
pub enum BurrowError {
    // Configuration errors
    #[error("Toolset not found: {0}")]
    ToolsetNotFound(String),

    #[error("Unknown backend '{0}'. Supported backends: cowbuilder, mock")]
    UnknownBackend(String),

    #[error("Invalid toolset registry at {path}: {reason}")]
    RegistryInvalid { path: PathBuf, reason: String },

    #[error("Toolset registry not found: {0}")]
    RegistryNotFound(PathBuf),

    #[error("Packages file '{0}' is not an existing file")]
    PackagesFileMissing(PathBuf),

    // Environment lifecycle errors
    #[error("Could not set up chroot environment for toolset '{0}'")]
    SetupFailed(String),

    #[error("Backend tool for '{name}' is not usable on this node")]
    BackendUnavailable { name: &'static str },

    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    // Execution errors
    #[error("Invalid number of source packages matching '{pattern}': {count} (must be 1)")]
    SourcePackageCount { pattern: String, count: usize },

    #[error("Invalid source package pattern '{pattern}': {reason}")]
    SourcePackagePattern { pattern: String, reason: String },

    #[error("Bind mounts are not supported by the mock backend")]
    BindMountsUnsupported,

    #[error("Could not determine invoking user identity: {0}")]
    HostUserProbe(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed to launch: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Failure(String),
}

impl BurrowError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::BackendUnavailable { name } => match *name {
                "cowbuilder" => Some(
                    "Check that cowbuilder is installed and the invoking user may run it with sudo",
                ),
                "mock" => Some("Check that mock is installed and configured under /etc/mock"),
                _ => None,
            },
            Self::RegistryNotFound(_) => {
                Some("Create a toolsets.toml registry or point --registry at one")
            }
            Self::ToolsetNotFound(_) => Some("List configured toolsets with: burrow list"),
            _ => None,
        }
    }
}
