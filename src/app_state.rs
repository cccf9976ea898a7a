use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::collection_engine::CollectionEngine;
use crate::collection_model::CollectionKind;
use crate::command_gateway::CommandGateway;
use crate::config::{Config, ConfigResolver};
use crate::json_store::JsonCollectionStore;

/// Process-wide state handed to every contract function.
///
/// Built once per application root: the configuration is resolved (and
/// written with defaults on first start) during [`AppState::init`] and only
/// changes through [`AppState::save_config`].
pub struct AppState {
    resolver: ConfigResolver,
    config: RwLock<Config>,
    engines: [CollectionEngine; 4],
    gateway: CommandGateway,
}

impl AppState {
    pub fn init(app_root: impl Into<PathBuf>) -> Result<Self, AppResponse> {
        let app_root = app_root.into();
        fs::create_dir_all(&app_root)?;
        let app_root = fs::canonicalize(&app_root)?;

        let resolver = ConfigResolver::new(&app_root);
        let config = resolver.load();

        let repo_dir = app_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| app_root.clone());
        let gateway = CommandGateway::new(repo_dir);

        info!(
            "Initialized content store at {} (data: {})",
            app_root.display(),
            config.data_dir(&app_root).display()
        );

        Ok(Self {
            resolver,
            config: RwLock::new(config),
            engines: CollectionKind::ALL.map(CollectionEngine::new),
            gateway,
        })
    }

    /// Swaps the command gateway, e.g. to point it at another repository.
    pub fn with_gateway(mut self, gateway: CommandGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn app_root(&self) -> &Path {
        self.resolver.app_root()
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// A store bound to the current configuration snapshot.
    pub fn store(&self) -> JsonCollectionStore {
        JsonCollectionStore::new(self.app_root(), self.config())
    }

    pub fn engine(&self, kind: CollectionKind) -> &CollectionEngine {
        &self.engines[kind.index()]
    }

    pub fn gateway(&self) -> &CommandGateway {
        &self.gateway
    }

    pub fn save_config(&self, updates: &JsonValue) -> Result<(), AppResponse> {
        let saved = self.resolver.save(updates)?;
        *self.config.write() = saved;
        Ok(())
    }
}
