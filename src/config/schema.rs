//! Toolset registry schema.
//!
//! The registry is stored at `~/.config/burrow/toolsets.toml`:
//!
//! ```toml
//! [[toolset]]
//! name = "bookworm-amd64"
//! backend = "cowbuilder"
//! packages = "gcc, make; devscripts"
//! setup_command = "apt-get install -y ca-certificates"
//!
//! [[toolset.repository]]
//! source = "deb http://deb.example.org/debian bookworm main"
//! key_url = "http://deb.example.org/key.asc"
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root registry structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryFile {
    /// Named toolsets
    #[serde(rename = "toolset")]
    pub toolsets: Vec<ToolsetEntry>,
}

/// One named toolset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsetEntry {
    /// Unique toolset name
    pub name: String,

    /// Backend id: "cowbuilder" or "mock"
    pub backend: String,

    /// Extra packages, free-form list (commas, semicolons or whitespace)
    pub packages: String,

    /// Custom repositories applied after environment creation
    #[serde(rename = "repository")]
    pub repositories: Vec<RepositoryEntry>,

    /// Shell command run once after setup
    pub setup_command: String,

    /// Extra arguments for the backend's creation command
    pub setup_arguments: Vec<String>,

    /// Explicit invalidation timestamp; bump to force a rebuild.
    /// Defaults to the registry file's own modification time.
    pub last_modified: Option<DateTime<Utc>>,
}

impl Default for ToolsetEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            backend: "cowbuilder".to_string(),
            packages: String::new(),
            repositories: Vec::new(),
            setup_command: String::new(),
            setup_arguments: Vec::new(),
            last_modified: None,
        }
    }
}

/// One custom repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryEntry {
    /// Source line, e.g. `deb http://host/debian stable main`
    pub source: String,

    /// Optional signing key URL
    pub key_url: Option<String>,
}
