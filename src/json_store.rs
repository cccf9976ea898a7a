//! Load and save of whole collection documents.
//!
//! Reads are forgiving: a missing file or one holding invalid JSON yields an
//! empty [`Document`]. Writes go through a temporary file in the target
//! directory that is synced and then renamed over the old file, so a crash
//! mid-write leaves either the old or the new document on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::collection_model::{CollectionKind, Document};
use crate::config::Config;

/// Flags from the `SECURITY` section that change how documents are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub auto_backup: bool,
    pub validate_json: bool,
    pub log_changes: bool,
}

impl StoreOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auto_backup: config.flag("auto_backup"),
            validate_json: config.flag("validate_json"),
            log_changes: config.flag("log_changes"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonCollectionStore {
    config: Config,
    data_dir: PathBuf,
    backup_dir: PathBuf,
    options: StoreOptions,
}

impl JsonCollectionStore {
    pub fn new(app_root: &Path, config: Config) -> Self {
        let data_dir = config.data_dir(app_root);
        let backup_dir = config.backup_dir(app_root);
        let options = StoreOptions::from_config(&config);
        Self {
            config,
            data_dir,
            backup_dir,
            options,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub fn resolve(&self, filename: &str) -> PathBuf {
        self.data_dir.join(filename)
    }

    pub fn file_for(&self, kind: CollectionKind) -> String {
        self.config.file_for(kind)
    }

    pub fn read(&self, filename: &str) -> Document {
        let path = self.resolve(filename);
        debug!("Reading collection file {}", path.display());

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Document::new(),
            Err(e) => {
                warn!("Could not read {}: {e}", path.display());
                return Document::new();
            }
        };

        match serde_json::from_str::<JsonValue>(&text) {
            Ok(JsonValue::Object(document)) => document,
            Ok(_) => {
                warn!("{} does not hold a JSON object, treating as empty", path.display());
                Document::new()
            }
            Err(e) => {
                warn!("Invalid JSON in {}: {e}, treating as empty", path.display());
                Document::new()
            }
        }
    }

    pub fn write(&self, filename: &str, document: &Document) -> Result<(), AppResponse> {
        let path = self.resolve(filename);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.data_dir.clone());
        fs::create_dir_all(&dir)?;

        if self.options.auto_backup && path.exists() {
            if let Err(e) = self.backup(&path) {
                warn!("Backup of {} failed: {e}", path.display());
            }
        }

        let mut bytes = serde_json::to_vec_pretty(document)?;
        bytes.push(b'\n');

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| AppResponse::from(e.error))?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Copies the current contents of `path` into the backup directory as
    /// `<stem>-<YYYYMMDD-HHMMSS>.json`.
    fn backup(&self, path: &Path) -> Result<PathBuf, AppResponse> {
        fs::create_dir_all(&self.backup_dir)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("collection");
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let target = self.backup_dir.join(format!("{stem}-{stamp}.json"));
        fs::copy(path, &target)?;
        info!("Backed up {} to {}", path.display(), target.display());
        Ok(target)
    }
}
