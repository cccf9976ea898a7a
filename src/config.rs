//! Storage and security configuration.
//!
//! The configuration is a two-level `section -> key -> string` mapping kept in
//! `config.toml` under the application root. Only two sections matter to the
//! store: `PATHS` (where the collection files live) and `SECURITY` (behaviour
//! flags). Lookups never fail; a missing key resolves to its fallback.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::collection_model::CollectionKind;

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const PATHS: &str = "PATHS";
pub const SECURITY: &str = "SECURITY";

pub const DEFAULT_DATA_PATH: &str = "../data";
pub const DEFAULT_BACKUP_PATH: &str = "../backups";

/// Keys `save` accepts for the `PATHS` section.
pub const PATH_KEYS: [&str; 6] = [
    "data_path",
    "services_file",
    "projects_file",
    "social_file",
    "blog_file",
    "backup_path",
];

/// Keys `save` accepts for the `SECURITY` section.
pub const SECURITY_KEYS: [&str; 4] = ["auto_backup", "validate_json", "log_changes", "confirm_delete"];

type Sections = BTreeMap<String, BTreeMap<String, String>>;

/// A resolved configuration snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    sections: Sections,
}

impl Config {
    /// The configuration written on first start: a storage path plus one file
    /// name per collection.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        config.set(PATHS, "data_path", DEFAULT_DATA_PATH);
        for kind in CollectionKind::ALL {
            config.set(PATHS, kind.file_key(), kind.default_file());
        }
        config
    }

    pub fn get(&self, section: &str, key: &str, fallback: &str) -> String {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Directory holding the collection files. Relative paths resolve against
    /// `app_root`.
    pub fn data_dir(&self, app_root: &Path) -> PathBuf {
        app_root.join(self.get(PATHS, "data_path", DEFAULT_DATA_PATH))
    }

    pub fn backup_dir(&self, app_root: &Path) -> PathBuf {
        app_root.join(self.get(PATHS, "backup_path", DEFAULT_BACKUP_PATH))
    }

    pub fn file_for(&self, kind: CollectionKind) -> String {
        self.get(PATHS, kind.file_key(), kind.default_file())
    }

    /// Reads a `SECURITY` flag. Absent flags are off.
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.get(SECURITY, key, "false").trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    }

    pub fn from_toml_str(text: &str) -> Result<Self, AppResponse> {
        let table: toml::Table = toml::from_str(text)?;
        let mut config = Config::default();

        for (section, entries) in table {
            let toml::Value::Table(entries) = entries else {
                warn!("Ignoring top-level config key outside a section: {section}");
                continue;
            };
            config.sections.entry(section.clone()).or_default();
            for (key, value) in entries {
                let value = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                config.set(&section, &key, value);
            }
        }

        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, AppResponse> {
        Ok(toml::to_string_pretty(&self.sections)?)
    }
}

/// Loads, initializes and saves the configuration file of one application root.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    app_root: PathBuf,
    path: PathBuf,
}

impl ConfigResolver {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        let app_root = app_root.into();
        let path = app_root.join(CONFIG_FILE_NAME);
        Self { app_root, path }
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the configuration, synthesizing and persisting the defaults when
    /// the file does not exist yet.
    ///
    /// An unreadable or unparsable file is reported and replaced by the
    /// defaults in memory only; the file itself is left untouched.
    pub fn load(&self) -> Config {
        match self.try_load() {
            Ok(Some(config)) => {
                debug!("Loaded configuration from {}", self.path.display());
                config
            }
            Ok(None) => {
                let config = Config::with_defaults();
                info!("No configuration at {}, writing defaults", self.path.display());
                if let Err(e) = self.write(&config) {
                    warn!("Could not persist default configuration: {e}");
                }
                config
            }
            Err(e) => {
                warn!("Invalid configuration at {}: {e}; using defaults", self.path.display());
                Config::with_defaults()
            }
        }
    }

    /// Reads the file as it is on disk. `None` when there is no file yet.
    pub fn try_load(&self) -> Result<Option<Config>, AppResponse> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        Config::from_toml_str(&text).map(Some)
    }

    /// Merges the recognised `PATHS` and `SECURITY` keys of `updates` into the
    /// on-disk configuration and rewrites it. Untouched keys are preserved.
    ///
    /// A file that fails to parse is never replaced: the parse error is
    /// returned and the file keeps its bytes.
    pub fn save(&self, updates: &JsonValue) -> Result<Config, AppResponse> {
        let updates = updates
            .as_object()
            .ok_or_else(|| AppResponse::BadRequest("Settings must be a JSON object".to_string()))?;

        let mut config = self.try_load()?.unwrap_or_else(Config::with_defaults);
        config.sections.entry(PATHS.to_string()).or_default();
        config.sections.entry(SECURITY.to_string()).or_default();

        for key in PATH_KEYS {
            if let Some(value) = updates.get(key) {
                config.set(PATHS, key, setting_to_string(value));
            }
        }
        for key in SECURITY_KEYS {
            if let Some(value) = updates.get(key) {
                config.set(SECURITY, key, setting_to_string(value).to_lowercase());
            }
        }

        self.write(&config)?;
        info!("Configuration saved to {}", self.path.display());
        Ok(config)
    }

    fn write(&self, config: &Config) -> Result<(), AppResponse> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, config.to_toml_string()?)?;
        Ok(())
    }
}

fn setting_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
