//! Editable draft of the wallet configuration and its resolver.
//!
//! A [`DraftState`] keeps the staged URL *and* the staged document text for
//! every network, so flipping a network between URL and document mode never
//! loses what the user typed. Edits never mutate in place: each one derives a
//! new draft. Invalid drafts are only rejected by [`DraftState::resolve`] and
//! [`DraftState::readiness`].

use crate::config::Network;
use crate::wallet_config::{
    normalize_custom_id, BlockchainConfiguration, ConfigurationSource, SourceKind, WalletConfiguration,
};
use thiserror::Error;
use url::Url;

/// Why a draft cannot be applied yet. None of these are shown as dialogs;
/// they keep the apply action disabled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftRejection {
    #[error("{network}: the {} field is empty", .kind.label())]
    EmptyField { network: Network, kind: SourceKind },

    #[error("{network}: '{url}' is not a valid URL")]
    UrlInvalidSyntax { network: Network, url: String },

    #[error("the test network's blockchain ID cannot be \"mainnet\"")]
    ReservedNameConflict,
}

/// A single user edit. [`DraftState::apply_edit`] is the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEdit {
    SetActiveNetwork(Network),
    SetSourceKind(Network, SourceKind),
    SetStagedUrl(Network, String),
    SetStagedDocument(Network, String),
    SetCustomId(Network, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftState {
    configuration: WalletConfiguration,
    staged_url: [String; Network::COUNT],
    staged_document: [String; Network::COUNT],
}

impl DraftState {
    /// Start a draft from the persisted configuration. Each network's current
    /// source value is staged under its kind; the other field starts empty.
    pub fn from_configuration(configuration: WalletConfiguration) -> Self {
        let staged = |kind: SourceKind| {
            Network::ALL.map(|network| {
                let source = &configuration.get(network).source;
                if source.kind() == kind {
                    source.value().to_string()
                } else {
                    String::new()
                }
            })
        };
        let staged_url = staged(SourceKind::Url);
        let staged_document = staged(SourceKind::Document);
        Self {
            configuration,
            staged_url,
            staged_document,
        }
    }

    pub fn configuration(&self) -> &WalletConfiguration {
        &self.configuration
    }

    pub fn active_network(&self) -> Network {
        self.configuration.active_network()
    }

    pub fn source_kind(&self, network: Network) -> SourceKind {
        self.configuration.get(network).source.kind()
    }

    pub fn staged_url(&self, network: Network) -> &str {
        &self.staged_url[network.index()]
    }

    pub fn staged_document(&self, network: Network) -> &str {
        &self.staged_document[network.index()]
    }

    /// Staged text for whichever source kind the network currently uses
    pub fn staged_value(&self, network: Network) -> &str {
        match self.source_kind(network) {
            SourceKind::Url => self.staged_url(network),
            SourceKind::Document => self.staged_document(network),
        }
    }

    pub fn custom_id(&self, network: Network) -> Option<&str> {
        self.configuration.get(network).custom_id.as_deref()
    }

    // ==================== edits ====================

    pub fn apply_edit(&self, edit: DraftEdit) -> Self {
        match edit {
            DraftEdit::SetActiveNetwork(network) => self.set_active_network(network),
            DraftEdit::SetSourceKind(network, kind) => self.set_source_kind(network, kind),
            DraftEdit::SetStagedUrl(network, text) => self.set_staged_url(network, text),
            DraftEdit::SetStagedDocument(network, text) => self.set_staged_document(network, text),
            DraftEdit::SetCustomId(network, text) => self.set_custom_id(network, text),
        }
    }

    pub fn set_active_network(&self, network: Network) -> Self {
        let mut next = self.clone();
        next.configuration = next.configuration.with_active_network(network);
        next
    }

    /// Switch a network's source kind. The source resets to an empty value of
    /// the new kind; staged text is left alone so it resurfaces on flip-back.
    pub fn set_source_kind(&self, network: Network, kind: SourceKind) -> Self {
        let current = self.configuration.get(network);
        let updated = BlockchainConfiguration::new(ConfigurationSource::empty(kind), current.custom_id.clone());
        let mut next = self.clone();
        next.configuration = next.configuration.with_network(network, updated);
        next
    }

    pub fn set_staged_url(&self, network: Network, text: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.staged_url[network.index()] = text.into();
        next
    }

    pub fn set_staged_document(&self, network: Network, text: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.staged_document[network.index()] = text.into();
        next
    }

    /// Set the custom chain identifier. Ignored for networks without one.
    pub fn set_custom_id(&self, network: Network, text: impl Into<String>) -> Self {
        if !network.descriptor().allows_custom_id {
            return self.clone();
        }
        let current = self.configuration.get(network);
        let updated = BlockchainConfiguration {
            source: current.source.clone(),
            custom_id: normalize_custom_id(text.into()),
        };
        let mut next = self.clone();
        next.configuration = next.configuration.with_network(network, updated);
        next
    }

    // ==================== validation ====================

    fn check_reserved_name(&self) -> Result<(), DraftRejection> {
        match self.configuration.reserved_name_conflicts().next() {
            Some(_) => Err(DraftRejection::ReservedNameConflict),
            None => Ok(()),
        }
    }

    /// Validate one network's staged field for its selected kind and build
    /// the resulting source.
    fn resolve_source(&self, network: Network) -> Result<ConfigurationSource, DraftRejection> {
        let kind = self.source_kind(network);
        let text = self.staged_value(network);
        if text.is_empty() {
            return Err(DraftRejection::EmptyField { network, kind });
        }
        if kind == SourceKind::Url && !is_valid_config_url(text) {
            return Err(DraftRejection::UrlInvalidSyntax {
                network,
                url: text.to_string(),
            });
        }
        Ok(ConfigurationSource::from_parts(kind, text.to_string()))
    }

    /// Derive a fully validated configuration from the draft. Pure; no I/O.
    pub fn resolve(&self) -> Result<WalletConfiguration, DraftRejection> {
        self.check_reserved_name()?;
        Network::ALL.into_iter().try_fold(
            WalletConfiguration::new(self.active_network()),
            |resolved, network| -> Result<WalletConfiguration, DraftRejection> {
                let source = self.resolve_source(network)?;
                let custom_id = self.configuration.get(network).custom_id.clone();
                Ok(resolved.with_network(network, BlockchainConfiguration::new(source, custom_id)))
            },
        )
    }

    /// Cheap gate for the apply action: only the active network's field and
    /// the reserved-name rule are checked.
    pub fn readiness(&self) -> Result<(), DraftRejection> {
        self.check_reserved_name()?;
        self.resolve_source(self.active_network()).map(|_| ())
    }

    pub fn is_appliable(&self) -> bool {
        self.readiness().is_ok()
    }
}

/// A config URL must parse as absolute and carry a host.
pub fn is_valid_config_url(text: &str) -> bool {
    Url::parse(text).map(|u| u.has_host()).unwrap_or(false)
}
