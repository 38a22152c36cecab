//! File-backed persistence of the wallet configuration.
//!
//! The state file holds the configuration plus the last resolved document, so
//! the wallet can start without downloading its config again. Writes go to a
//! temporary file that is renamed over the old one.

use crate::collaborators::ConfigStore;
use crate::config::Config;
use crate::error::PersistError;
use crate::operation_log;
use crate::wallet_config::{ConfigurationSource, WalletConfiguration};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

const STATE_FILE: &str = "wallet_network.json";
const STATE_TMP_FILE: &str = "wallet_network.json.tmp";

/// The document that was validated and applied, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub source: ConfigurationSource,
    pub document: String,
    /// RFC 3339 timestamp of the apply
    pub applied_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredState {
    configuration: WalletConfiguration,
    #[serde(default)]
    resolved: Option<ResolvedConfig>,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_dir.clone())
    }

    /// Get the state file path
    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn read_state(&self) -> Option<StoredState> {
        let path = self.path();
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => {
                    tracing::info!("Loaded wallet configuration from {:?}", path);
                    Some(state)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse wallet configuration file: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read wallet configuration file: {}", e);
                None
            }
        }
    }

    /// Load the persisted configuration, or defaults if missing or unreadable
    pub fn load(&self) -> WalletConfiguration {
        match self.read_state() {
            Some(state) => state.configuration,
            None => {
                tracing::info!("Using default wallet configuration");
                WalletConfiguration::default()
            }
        }
    }

    /// The last applied document, if any
    pub fn resolved(&self) -> Option<ResolvedConfig> {
        self.read_state().and_then(|state| state.resolved)
    }

    pub fn resolved_document(&self) -> Option<String> {
        self.resolved().map(|resolved| resolved.document)
    }

    fn save(&self, state: &StoredState) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(state)?;
        let tmp = self.dir.join(STATE_TMP_FILE);
        let mut file = File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        // Contents must be on disk before the rename makes them visible
        file.sync_all()?;
        drop(file);
        if let Err(e) = fs::rename(&tmp, self.path()) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::info!("Saved wallet configuration to {:?}", self.path());
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn persist(
        &self,
        configuration: &WalletConfiguration,
        source: &ConfigurationSource,
        resolved_document: &str,
    ) -> Result<(), PersistError> {
        let state = StoredState {
            configuration: configuration.clone(),
            resolved: Some(ResolvedConfig {
                source: source.clone(),
                document: resolved_document.to_string(),
                applied_at: Utc::now().to_rfc3339(),
            }),
        };
        let network = configuration.active_network();
        let details = format!(
            "chain_name={}\nsource={}\nvalue={}",
            configuration.effective_chain_name(network),
            source.kind().label(),
            match source {
                ConfigurationSource::Url(url) => url.as_str(),
                ConfigurationSource::Document(_) => "(inline document)",
            }
        );

        let store = self.clone();
        tokio::task::spawn_blocking(move || -> Result<(), PersistError> {
            store.save(&state)?;
            if let Err(e) = operation_log::append_log(&store.dir, "apply_configuration", network, details) {
                tracing::warn!("Failed to log configuration change: {}", e);
            }
            Ok(())
        })
        .await
        .map_err(|e| PersistError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?
    }
}
