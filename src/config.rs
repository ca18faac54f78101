// Configuration for todostore

use crate::filter::{SortKey, StatusFilter};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage backend for the task slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `todos.json` in the store directory
    #[default]
    File,
    /// `todostore.db` in the store directory
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::File => write!(f, "file"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the persisted tasks
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    #[serde(default)]
    pub backend: Backend,

    /// Filter used by `list` when none is given
    #[serde(default)]
    pub default_filter: StatusFilter,

    /// Sort used by `list` when none is given
    #[serde(default)]
    pub default_sort: SortKey,
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todostore")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            backend: Backend::default(),
            default_filter: StatusFilter::default(),
            default_sort: SortKey::default(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_file(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("todostore").join("config.yml")),
            Some(PathBuf::from("todostore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_file(path);
            }
        }

        Ok(Config::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config file {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).context(format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.default_filter, StatusFilter::All);
        assert_eq!(config.default_sort, SortKey::Date);
        assert!(config.store_path.ends_with("todostore"));
    }

    #[test]
    fn test_load_partial_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        std::fs::write(&path, "backend: sqlite\ndefault_sort: priority\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.default_sort, SortKey::Priority);
        assert_eq!(config.default_filter, StatusFilter::All);
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");

        let config = Config {
            store_path: temp.path().join("data"),
            backend: Backend::Sqlite,
            default_filter: StatusFilter::Active,
            default_sort: SortKey::Alphabetical,
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        std::fs::write(&path, "backend: [not, a, backend]\n").unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }
}
