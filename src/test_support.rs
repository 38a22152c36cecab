//! In-memory collaborators for unit tests.

use crate::collaborators::{ConfigStore, ConfigValidator, Fetcher, Presenter};
use crate::error::{FetchError, PersistError, ValidationError};
use crate::pipeline::Confirmation;
use crate::wallet_config::{ConfigurationSource, WalletConfiguration};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

enum FetchBehavior {
    Bytes(Vec<u8>),
    Fail,
    Never,
}

pub struct MockFetcher {
    behavior: FetchBehavior,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self::with(FetchBehavior::Bytes(bytes))
    }

    pub fn failing() -> Self {
        Self::with(FetchBehavior::Fail)
    }

    /// A download that never completes
    pub fn never() -> Self {
        Self::with(FetchBehavior::Never)
    }

    fn with(behavior: FetchBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, _url: &Url) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            FetchBehavior::Bytes(bytes) => Ok(bytes.clone()),
            FetchBehavior::Fail => Err(FetchError::Request("connection refused".to_string())),
            FetchBehavior::Never => std::future::pending().await,
        }
    }
}

pub struct MockValidator {
    accept: bool,
    hang: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockValidator {
    pub fn new(accept: bool) -> Self {
        Self {
            accept,
            hang: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A validation that never completes
    pub fn never() -> Self {
        Self {
            hang: true,
            ..Self::new(true)
        }
    }

    /// (document, chain_name) pairs seen so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigValidator for MockValidator {
    async fn validate(&self, document: &str, chain_name: &str) -> Result<(), ValidationError> {
        self.calls
            .lock()
            .unwrap()
            .push((document.to_string(), chain_name.to_string()));
        if self.hang {
            return std::future::pending().await;
        }
        if self.accept {
            Ok(())
        } else {
            Err(ValidationError::IdentityMismatch {
                expected: chain_name.to_string(),
            })
        }
    }
}

pub type StoreWrite = (WalletConfiguration, ConfigurationSource, String);

#[derive(Default)]
pub struct MemoryStore {
    fail: bool,
    writes: Mutex<Vec<StoreWrite>>,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn persist(
        &self,
        configuration: &WalletConfiguration,
        source: &ConfigurationSource,
        resolved_document: &str,
    ) -> Result<(), PersistError> {
        if self.fail {
            return Err(PersistError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.writes.lock().unwrap().push((
            configuration.clone(),
            source.clone(),
            resolved_document.to_string(),
        ));
        Ok(())
    }
}

/// Presenter that answers every confirmation the same way and records
/// everything shown.
pub struct ScriptedPresenter {
    answer: bool,
    confirmations: Mutex<Vec<Confirmation>>,
    errors: Mutex<Vec<(String, String)>>,
    infos: Mutex<Vec<String>>,
}

impl ScriptedPresenter {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            confirmations: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            infos: Mutex::new(Vec::new()),
        }
    }

    pub fn confirmations(&self) -> Vec<Confirmation> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }
}

#[async_trait]
impl Presenter for ScriptedPresenter {
    async fn confirm(&self, confirmation: &Confirmation) -> bool {
        self.confirmations.lock().unwrap().push(confirmation.clone());
        self.answer
    }

    fn show_error(&self, title: &str, message: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    fn show_info(&self, text: &str) {
        self.infos.lock().unwrap().push(text.to_string());
    }
}

pub fn mocks(
    fetcher: MockFetcher,
    validator_accepts: bool,
    confirm_answer: bool,
) -> (Arc<MockFetcher>, Arc<MockValidator>, Arc<MemoryStore>, Arc<ScriptedPresenter>) {
    (
        Arc::new(fetcher),
        Arc::new(MockValidator::new(validator_accepts)),
        Arc::new(MemoryStore::default()),
        Arc::new(ScriptedPresenter::new(confirm_answer)),
    )
}
