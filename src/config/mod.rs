//! Toolset registry loading and resolution.
//!
//! The registry is explicit read-only state passed into the engine at
//! invocation time; reload and list are exposed for front ends that need
//! to refresh or enumerate toolset names.

pub mod schema;

pub use schema::{RegistryFile, RepositoryEntry, ToolsetEntry};

use crate::error::{BurrowError, BurrowResult};
use crate::toolset::{Backend, Repository, Toolset};
use crate::util;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// Loaded toolset registry bound to its file on disk.
#[derive(Debug)]
pub struct ToolsetRegistry {
    path: PathBuf,
    file: RegistryFile,
    file_mtime: SystemTime,
}

impl ToolsetRegistry {
    /// Default registry path: `~/.config/burrow/toolsets.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("burrow")
            .join("toolsets.toml")
    }

    /// Load the registry from a file.
    pub async fn load(path: &Path) -> BurrowResult<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BurrowError::RegistryNotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(BurrowError::io(
                    format!("reading registry from {}", path.display()),
                    e,
                ))
            }
        };
        let file: RegistryFile =
            toml::from_str(&content).map_err(|e| BurrowError::RegistryInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let file_mtime = fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        debug!(
            "Loaded {} toolset(s) from {}",
            file.toolsets.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            file,
            file_mtime,
        })
    }

    /// Re-read the registry file in place.
    pub async fn reload(&mut self) -> BurrowResult<()> {
        *self = Self::load(&self.path).await?;
        Ok(())
    }

    /// Names of all configured toolsets, in file order.
    pub fn list(&self) -> Vec<&str> {
        self.file.toolsets.iter().map(|t| t.name.as_str()).collect()
    }

    /// Resolve a named toolset to its immutable per-build view.
    ///
    /// The toolset's last-modified timestamp is the explicit registry value
    /// when present, otherwise the registry file's own modification time;
    /// either way a base environment must be strictly newer to be reused.
    pub fn resolve(&self, name: &str) -> BurrowResult<Toolset> {
        let entry = self
            .file
            .toolsets
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| BurrowError::ToolsetNotFound(name.to_string()))?;
        let backend = Backend::parse(&entry.backend)?;
        let last_modified = entry
            .last_modified
            .map(SystemTime::from)
            .unwrap_or(self.file_mtime);
        Ok(Toolset {
            name: entry.name.clone(),
            backend,
            packages: util::split_list(&entry.packages),
            repositories: entry
                .repositories
                .iter()
                .map(|r| Repository {
                    source: r.source.clone(),
                    key_url: r.key_url.clone(),
                })
                .collect(),
            setup_command: entry.setup_command.clone(),
            setup_arguments: entry.setup_arguments.clone(),
            last_modified,
        })
    }

    /// The registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_registry(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("toolsets.toml");
        fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn missing_registry_is_reported() {
        let temp = TempDir::new().unwrap();
        let err = ToolsetRegistry::load(&temp.path().join("absent.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, BurrowError::RegistryNotFound(_)));
    }

    #[tokio::test]
    async fn invalid_registry_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = write_registry(&temp, "[[toolset]\nname=").await;
        let err = ToolsetRegistry::load(&path).await.unwrap_err();
        assert!(matches!(err, BurrowError::RegistryInvalid { .. }));
    }

    #[tokio::test]
    async fn resolve_splits_packages_and_parses_backend() {
        let temp = TempDir::new().unwrap();
        let path = write_registry(
            &temp,
            r#"
            [[toolset]]
            name = "sid"
            backend = "cowbuilder"
            packages = "gcc, make; devscripts"
            "#,
        )
        .await;
        let registry = ToolsetRegistry::load(&path).await.unwrap();
        assert_eq!(registry.list(), vec!["sid"]);

        let toolset = registry.resolve("sid").unwrap();
        assert_eq!(toolset.backend, Backend::Cowbuilder);
        assert_eq!(toolset.packages, vec!["gcc", "make", "devscripts"]);
    }

    #[tokio::test]
    async fn resolve_unknown_name_fails() {
        let temp = TempDir::new().unwrap();
        let path = write_registry(&temp, "").await;
        let registry = ToolsetRegistry::load(&path).await.unwrap();
        assert!(matches!(
            registry.resolve("missing"),
            Err(BurrowError::ToolsetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn resolve_unknown_backend_fails() {
        let temp = TempDir::new().unwrap();
        let path = write_registry(
            &temp,
            r#"
            [[toolset]]
            name = "x"
            backend = "docker"
            "#,
        )
        .await;
        let registry = ToolsetRegistry::load(&path).await.unwrap();
        assert!(matches!(
            registry.resolve("x"),
            Err(BurrowError::UnknownBackend(_))
        ));
    }

    #[tokio::test]
    async fn explicit_last_modified_wins_over_file_mtime() {
        let temp = TempDir::new().unwrap();
        let path = write_registry(
            &temp,
            r#"
            [[toolset]]
            name = "pinned"
            backend = "mock"
            last_modified = "2001-01-01T00:00:00Z"
            "#,
        )
        .await;
        let registry = ToolsetRegistry::load(&path).await.unwrap();
        let toolset = registry.resolve("pinned").unwrap();
        // well in the past, far from the file's just-written mtime
        assert!(toolset.last_modified < SystemTime::now() - std::time::Duration::from_secs(60));
    }

    #[tokio::test]
    async fn reload_picks_up_changes() {
        let temp = TempDir::new().unwrap();
        let path = write_registry(&temp, "").await;
        let mut registry = ToolsetRegistry::load(&path).await.unwrap();
        assert!(registry.list().is_empty());

        fs::write(
            &path,
            r#"
            [[toolset]]
            name = "new"
            backend = "mock"
            "#,
        )
        .await
        .unwrap();
        registry.reload().await.unwrap();
        assert_eq!(registry.list(), vec!["new"]);
    }
}
