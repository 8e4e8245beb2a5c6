//! Store configuration and the optional TOML file that overrides it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tickbox_core::{Filter, Task};
use tickbox_storage::{DEFAULT_PERSIST_KEY, StorageMedium};

const CONFIG_DIR: &str = "tickbox";
const CONFIG_FILE: &str = "config.toml";

/// Options accepted by [`create_store`](crate::create_store).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Key the state is persisted under.
    pub persist_key: String,
    /// Whether to hydrate from and write to storage at all.
    pub enable_persistence: bool,
    /// Backing medium.
    pub storage_medium: StorageMedium,
    /// Override for the durable storage directory.
    pub storage_dir: Option<PathBuf>,
    /// Tasks used when nothing is persisted.
    pub initial_tasks: Vec<Task>,
    /// Filter used when nothing is persisted.
    pub initial_filter: Filter,
    /// Trace every transition at `debug` level.
    pub enable_logging: bool,
    /// Name attached to transition traces.
    pub store_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist_key: DEFAULT_PERSIST_KEY.to_owned(),
            enable_persistence: true,
            storage_medium: StorageMedium::default(),
            storage_dir: None,
            initial_tasks: Vec::new(),
            initial_filter: Filter::default(),
            enable_logging: false,
            store_name: "TodoStore".to_owned(),
        }
    }
}

impl StoreConfig {
    /// Configuration without persistence (used mainly in tests).
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            enable_persistence: false,
            storage_medium: StorageMedium::Memory,
            ..Self::default()
        }
    }
}

/// Top-level file configuration loaded from `<config dir>/tickbox/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Store settings.
    #[serde(default)]
    pub store: StoreSection,
}

/// `[store]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Storage key override.
    pub persist_key: Option<String>,
    /// Medium override.
    pub storage_medium: Option<StorageMedium>,
    /// Durable directory override.
    pub storage_dir: Option<PathBuf>,
    /// Transition logging toggle.
    pub enable_logging: Option<bool>,
}

impl FileConfig {
    /// Platform location of the configuration file, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from `path`; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(key) = &self.store.persist_key
            && key.trim().is_empty()
        {
            bail!("store.persist_key must not be blank");
        }
        Ok(())
    }

    /// Overlay the file settings on `base`.
    #[must_use]
    pub fn apply_to(&self, mut base: StoreConfig) -> StoreConfig {
        let section = &self.store;
        if let Some(key) = &section.persist_key {
            key.trim().clone_into(&mut base.persist_key);
        }
        if let Some(medium) = section.storage_medium {
            base.storage_medium = medium;
        }
        if let Some(dir) = &section.storage_dir {
            base.storage_dir = Some(dir.clone());
        }
        if let Some(enabled) = section.enable_logging {
            base.enable_logging = enabled;
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap_or_else(|err| panic!("must create temp dir: {err}"));
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, contents).unwrap_or_else(|err| panic!("must write config: {err}"));
        (dir, path)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap_or_else(|err| panic!("must create temp dir: {err}"));
        let config = FileConfig::load(dir.path().join("absent.toml"))
            .unwrap_or_else(|err| panic!("must fall back to defaults: {err}"));
        let store = config.apply_to(StoreConfig::default());
        assert_eq!(store.persist_key, "tasks");
        assert_eq!(store.storage_medium, StorageMedium::Durable);
        assert!(!store.enable_logging);
    }

    #[test]
    fn store_section_overrides_defaults() {
        let (_dir, path) = write_config(
            r#"
[store]
persist_key = " work "
storage_medium = "session"
storage_dir = "/tmp/tickbox-data"
enable_logging = true
"#,
        );
        let config = FileConfig::load(&path).unwrap_or_else(|err| panic!("must parse config: {err}"));
        let store = config.apply_to(StoreConfig::default());
        assert_eq!(store.persist_key, "work");
        assert_eq!(store.storage_medium, StorageMedium::Session);
        assert_eq!(store.storage_dir.as_deref(), Some(Path::new("/tmp/tickbox-data")));
        assert!(store.enable_logging);
        assert!(store.enable_persistence);
    }

    #[test]
    fn blank_persist_key_is_rejected() {
        let (_dir, path) = write_config("[store]\npersist_key = \"   \"\n");
        let err = FileConfig::load(&path).err();
        assert!(err.is_some_and(|err| format!("{err:#}").contains("persist_key")));
    }

    #[test]
    fn unknown_medium_is_rejected() {
        let (_dir, path) = write_config("[store]\nstorage_medium = \"cloud\"\n");
        assert!(FileConfig::load(&path).is_err());
    }
}
