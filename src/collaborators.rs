//! Traits for the outside world the configuration flow talks to.
//!
//! The pipeline only ever holds these as `Arc<dyn …>`, so the HTTP client,
//! the chain-config validator, the on-disk store and the UI can all be swapped
//! out (tests use in-memory versions).

use crate::error::{FetchError, PersistError, ValidationError};
use crate::pipeline::Confirmation;
use crate::wallet_config::{ConfigurationSource, WalletConfiguration};
use async_trait::async_trait;
use url::Url;

/// Downloads raw bytes from a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Checks a chain-config document against the chain name it must belong to.
#[async_trait]
pub trait ConfigValidator: Send + Sync {
    async fn validate(&self, document: &str, chain_name: &str) -> Result<(), ValidationError>;
}

/// Durable home of the wallet configuration. `persist` is all-or-nothing.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn persist(
        &self,
        configuration: &WalletConfiguration,
        source: &ConfigurationSource,
        resolved_document: &str,
    ) -> Result<(), PersistError>;
}

/// Modal UI boundary.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Ask the user to confirm; `false` means cancelled.
    async fn confirm(&self, confirmation: &Confirmation) -> bool;

    fn show_error(&self, title: &str, message: &str);

    fn show_info(&self, text: &str);
}
