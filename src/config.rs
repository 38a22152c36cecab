use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Chain name reserved for the main network's identity.
pub const MAINNET_CHAIN_NAME: &str = "mainnet";

/// Directory name used under the platform config dir.
pub const APP_DIR_NAME: &str = "wallet-netconf";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

/// A supported blockchain network. The set is closed; everything that varies
/// per network lives in [`NETWORKS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "mainnet")]
    MainNet,
    #[serde(rename = "testnet")]
    TestNet,
    #[serde(rename = "newton-testnet")]
    NewtonTestNet,
    #[serde(rename = "newton-testnet-2")]
    NewtonTestNet2,
    #[serde(rename = "toncommunity-testnet-3")]
    TonCommunityTestNet3,
}

impl Network {
    /// All networks in registry order.
    pub const ALL: [Network; 5] = [
        Network::MainNet,
        Network::TestNet,
        Network::NewtonTestNet,
        Network::NewtonTestNet2,
        Network::TonCommunityTestNet3,
    ];

    /// Size of every per-network array.
    pub const COUNT: usize = Self::ALL.len();

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Registry entry for this network
    pub fn descriptor(self) -> &'static NetworkDescriptor {
        &NETWORKS[self.index()]
    }

    pub fn tag(self) -> &'static str {
        self.descriptor().tag
    }

    pub fn label(self) -> &'static str {
        self.descriptor().label
    }

    pub fn is_mainnet(self) -> bool {
        self == Network::MainNet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network '{0}'")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        find_network_by_tag(s.trim())
            .map(|d| d.network)
            .ok_or_else(|| UnknownNetwork(s.trim().to_string()))
    }
}

/// Static description of a network: labels, identity defaults and the text
/// shown before switching the wallet onto it.
#[derive(Clone, Debug)]
pub struct NetworkDescriptor {
    pub network: Network,
    pub tag: &'static str,
    pub label: &'static str,
    /// Chain name used for validation when no custom identifier is set.
    pub default_chain_name: &'static str,
    pub allows_custom_id: bool,
    /// Whether a custom identifier equal to [`MAINNET_CHAIN_NAME`] is rejected.
    pub forbids_mainnet_name: bool,
    pub default_config_url: &'static str,
    pub switch_warning: &'static str,
}

impl NetworkDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        network: Network,
        tag: &'static str,
        label: &'static str,
        default_chain_name: &'static str,
        allows_custom_id: bool,
        forbids_mainnet_name: bool,
        default_config_url: &'static str,
        switch_warning: &'static str,
    ) -> Self {
        Self {
            network,
            tag,
            label,
            default_chain_name,
            allows_custom_id,
            forbids_mainnet_name,
            default_config_url,
            switch_warning,
        }
    }
}

/// Registry of supported networks, indexed by `Network as usize`.
pub const NETWORKS: &[NetworkDescriptor] = &[
    NetworkDescriptor::new(
        Network::MainNet,
        "mainnet",
        "Main Network",
        MAINNET_CHAIN_NAME,
        false,
        false,
        "https://ton.org/global-config.json",
        "Are you sure you want to switch to the Main Gram network? Grams will have real value there.\n\nIf you proceed, you will need to reconnect your wallet using 24 secret words.",
    ),
    NetworkDescriptor::new(
        Network::TestNet,
        "testnet",
        "Test Network",
        "testnet2",
        true,
        true,
        "https://ton.org/testnet-global.config.json",
        "Are you sure you want to switch to the Test Gram network? It exists only for testing purposes.\n\nIf you proceed, you will need to reconnect your wallet using 24 secret words.",
    ),
    NetworkDescriptor::new(
        Network::NewtonTestNet,
        "newton-testnet",
        "Newton Test Network",
        "Newton",
        true,
        false,
        "https://newton-blockchain.github.io/global.config.json",
        "Are you sure you want to switch to the NewTon Test network? It exists only for testing purposes.\n\nIf you proceed, you will need to reconnect your wallet using 24 secret words.",
    ),
    NetworkDescriptor::new(
        Network::NewtonTestNet2,
        "newton-testnet-2",
        "Newton TestNet 2",
        "Newton TestNet 2",
        true,
        false,
        "https://newton-blockchain.github.io/testnet-global.config.json",
        "Are you sure you want to switch to the NewTon TestNet 2 network? It exists only for testing purposes.\n\nIf you proceed, you will need to reconnect your wallet using 24 secret words.",
    ),
    NetworkDescriptor::new(
        Network::TonCommunityTestNet3,
        "toncommunity-testnet-3",
        "TONCommunity.org Network",
        "TONCommunity.org Network",
        true,
        false,
        "https://toncommunity.org/ton-global.config.json",
        "Are you sure you want to switch to the TONCommunity.org network? It exists only for testing purposes.\n\nIf you proceed, you will need to reconnect your wallet using 24 secret words.",
    ),
];

/// Find a network by its tag (case-insensitive)
pub fn find_network_by_tag(tag: &str) -> Option<&'static NetworkDescriptor> {
    NETWORKS.iter().find(|n| n.tag.eq_ignore_ascii_case(tag))
}

/// Whether a chain name identifies a test chain. Anything starting with
/// "test" (any case) counts.
pub fn is_testnet_chain_name(chain_name: &str) -> bool {
    chain_name.to_lowercase().starts_with("test")
}

/// Runtime settings for the configuration flow, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub fetch_timeout: Duration,
    pub max_document_bytes: usize,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            data_dir,
        }
    }

    pub fn from_env() -> Self {
        let fetch_timeout_secs = env::var("NETCONF_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        let max_document_bytes = env::var("NETCONF_MAX_DOCUMENT_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|bytes: &usize| *bytes > 0)
            .unwrap_or(DEFAULT_MAX_DOCUMENT_BYTES);

        let data_dir = env::var("NETCONF_DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Self {
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            max_document_bytes,
            data_dir,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_data_dir() -> PathBuf {
    // Fall back to the working directory when there is no platform config dir
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}
