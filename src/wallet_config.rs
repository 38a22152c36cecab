//! Persistable wallet network configuration.
//!
//! A [`WalletConfiguration`] always holds exactly one [`BlockchainConfiguration`]
//! per registry network; deserialization fills any missing entry from the
//! registry defaults.

use crate::config::{is_testnet_chain_name, Network, MAINNET_CHAIN_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which kind of source a network's chain config comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    Document,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Url => "URL",
            SourceKind::Document => "JSON",
        }
    }
}

/// Where a network's chain-config document is obtained from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ConfigurationSource {
    Url(String),
    /// Inline document text
    Document(String),
}

impl ConfigurationSource {
    /// An empty source of the given kind
    pub fn empty(kind: SourceKind) -> Self {
        Self::from_parts(kind, String::new())
    }

    pub fn from_parts(kind: SourceKind, value: String) -> Self {
        match kind {
            SourceKind::Url => ConfigurationSource::Url(value),
            SourceKind::Document => ConfigurationSource::Document(value),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ConfigurationSource::Url(_) => SourceKind::Url,
            ConfigurationSource::Document(_) => SourceKind::Document,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ConfigurationSource::Url(v) | ConfigurationSource::Document(v) => v,
        }
    }
}

/// Per-network configuration: source plus optional custom chain identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainConfiguration {
    pub source: ConfigurationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

impl BlockchainConfiguration {
    pub fn new(source: ConfigurationSource, custom_id: Option<String>) -> Self {
        Self {
            source,
            custom_id: custom_id.and_then(normalize_custom_id),
        }
    }

    /// Registry default: the network's default config URL, no custom id
    pub fn default_for(network: Network) -> Self {
        Self::new(
            ConfigurationSource::Url(network.descriptor().default_config_url.to_string()),
            None,
        )
    }
}

/// Empty identifiers mean "not set".
pub fn normalize_custom_id(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Full wallet configuration: one entry per network and the active selector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WalletConfigurationFile", into = "WalletConfigurationFile")]
pub struct WalletConfiguration {
    networks: [BlockchainConfiguration; Network::COUNT],
    active_network: Network,
}

impl WalletConfiguration {
    pub fn new(active_network: Network) -> Self {
        Self {
            networks: Network::ALL.map(BlockchainConfiguration::default_for),
            active_network,
        }
    }

    pub fn active_network(&self) -> Network {
        self.active_network
    }

    pub fn get(&self, network: Network) -> &BlockchainConfiguration {
        &self.networks[network.index()]
    }

    /// Configuration of the active network
    pub fn active(&self) -> &BlockchainConfiguration {
        self.get(self.active_network)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Network, &BlockchainConfiguration)> {
        Network::ALL.into_iter().zip(self.networks.iter())
    }

    pub fn with_active_network(mut self, network: Network) -> Self {
        self.active_network = network;
        self
    }

    /// Replace one network's entry. Custom ids on networks that do not allow
    /// them are dropped.
    pub fn with_network(mut self, network: Network, mut configuration: BlockchainConfiguration) -> Self {
        if !network.descriptor().allows_custom_id {
            configuration.custom_id = None;
        }
        self.networks[network.index()] = configuration;
        self
    }

    /// Identity a network's document is validated against: the fixed mainnet
    /// name, the user's custom id, or the registry default.
    pub fn effective_chain_name(&self, network: Network) -> &str {
        if network.is_mainnet() {
            return MAINNET_CHAIN_NAME;
        }
        match self.get(network).custom_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => network.descriptor().default_chain_name,
        }
    }

    /// Whether the active network runs on a test chain
    pub fn is_testnet(&self) -> bool {
        is_testnet_chain_name(self.effective_chain_name(self.active_network))
    }

    /// Networks whose custom id collides with the reserved mainnet name
    pub fn reserved_name_conflicts(&self) -> impl Iterator<Item = Network> + '_ {
        self.iter()
            .filter(|(network, cfg)| {
                network.descriptor().forbids_mainnet_name && cfg.custom_id.as_deref() == Some(MAINNET_CHAIN_NAME)
            })
            .map(|(network, _)| network)
    }
}

impl Default for WalletConfiguration {
    fn default() -> Self {
        Self::new(Network::MainNet)
    }
}

/// On-disk shape of [`WalletConfiguration`].
#[derive(Serialize, Deserialize)]
struct WalletConfigurationFile {
    active_network: Network,
    #[serde(default)]
    networks: BTreeMap<Network, BlockchainConfiguration>,
}

impl From<WalletConfigurationFile> for WalletConfiguration {
    fn from(mut file: WalletConfigurationFile) -> Self {
        Network::ALL.into_iter().fold(
            WalletConfiguration::new(file.active_network),
            |acc, network| match file.networks.remove(&network) {
                Some(cfg) => acc.with_network(network, BlockchainConfiguration::new(cfg.source, cfg.custom_id)),
                None => acc,
            },
        )
    }
}

impl From<WalletConfiguration> for WalletConfigurationFile {
    fn from(configuration: WalletConfiguration) -> Self {
        let active_network = configuration.active_network;
        let networks = Network::ALL
            .into_iter()
            .zip(configuration.networks)
            .collect();
        Self {
            active_network,
            networks,
        }
    }
}
