//! Asynchronous apply pipeline.
//!
//! Takes a resolved configuration and walks it through
//! compare → fetch (URL sources) → validate → confirm → persist. Every step
//! completes before the next starts. Fetching and validating are abandoned
//! as soon as the dismissal signal fires. Nothing is written unless every
//! step before `Applying` succeeded.

use crate::collaborators::{ConfigStore, ConfigValidator, Fetcher, Presenter};
use crate::config::Network;
use crate::error::ApplyError;
use crate::wallet_config::{ConfigurationSource, WalletConfiguration};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use url::Url;

const CONFIRMATION_TITLE: &str = "Warning";
const PROCEED_LABEL: &str = "Proceed";
const CHAIN_NAME_CHANGED_TEXT: &str = "Are you sure you want to change the blockchain ID? You don't need this unless you're testing your own network.\n\nIf you proceed, you will need to reconnect your wallet using 24 secret words.";

/// Where the pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    Idle,
    Comparing,
    NoChange,
    Fetching,
    Validating,
    AwaitingConfirmation,
    Applying,
    Applied,
    Failed,
}

impl ApplyPhase {
    /// An apply attempt is in flight; the apply action must stay disabled.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            ApplyPhase::Comparing
                | ApplyPhase::Fetching
                | ApplyPhase::Validating
                | ApplyPhase::AwaitingConfirmation
                | ApplyPhase::Applying
        )
    }
}

/// A question the user must answer before the configuration is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Destructive: the wallet moves to a different network.
    SwitchNetwork(Network),
    /// Milder: same network, different blockchain ID.
    ChainNameChanged { network: Network, chain_name: String },
}

impl Confirmation {
    /// Which confirmation, if any, moving from `current` to `resolved` needs.
    pub fn required(current: &WalletConfiguration, resolved: &WalletConfiguration) -> Option<Self> {
        let target = resolved.active_network();
        if current.active_network() != target {
            Some(Confirmation::SwitchNetwork(target))
        } else if current.get(target).custom_id != resolved.get(target).custom_id {
            Some(Confirmation::ChainNameChanged {
                network: target,
                chain_name: resolved.effective_chain_name(target).to_string(),
            })
        } else {
            None
        }
    }

    pub fn title(&self) -> &'static str {
        CONFIRMATION_TITLE
    }

    pub fn text(&self) -> &'static str {
        match self {
            Confirmation::SwitchNetwork(network) => network.descriptor().switch_warning,
            Confirmation::ChainNameChanged { .. } => CHAIN_NAME_CHANGED_TEXT,
        }
    }

    pub fn proceed_label(&self) -> &'static str {
        PROCEED_LABEL
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, Confirmation::SwitchNetwork(_))
    }
}

/// How an apply attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Nothing differs from the persisted configuration; close without writing.
    NoChange,
    /// Written; close the screen.
    Applied(WalletConfiguration),
    /// The user cancelled the confirmation.
    Declined,
    /// A step failed and the error was shown.
    Failed(ApplyError),
    /// The screen went away while fetching or validating.
    Dismissed,
}

pub struct ApplyPipeline {
    fetcher: Arc<dyn Fetcher>,
    validator: Arc<dyn ConfigValidator>,
    store: Arc<dyn ConfigStore>,
    presenter: Arc<dyn Presenter>,
    phase: watch::Sender<ApplyPhase>,
}

impl ApplyPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        validator: Arc<dyn ConfigValidator>,
        store: Arc<dyn ConfigStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let (phase, _) = watch::channel(ApplyPhase::Idle);
        Self {
            fetcher,
            validator,
            store,
            presenter,
            phase,
        }
    }

    pub fn phase(&self) -> ApplyPhase {
        *self.phase.borrow()
    }

    /// Observe phase changes
    pub fn subscribe(&self) -> watch::Receiver<ApplyPhase> {
        self.phase.subscribe()
    }

    pub fn presenter(&self) -> &Arc<dyn Presenter> {
        &self.presenter
    }

    fn set_phase(&self, phase: ApplyPhase) {
        debug!("apply phase -> {:?}", phase);
        self.phase.send_replace(phase);
    }

    fn fail(&self, err: ApplyError) -> ApplyOutcome {
        warn!("Apply failed: {}", err);
        self.set_phase(ApplyPhase::Failed);
        if err.shows_dialog() {
            self.presenter.show_error(err.title(), &err.to_string());
        }
        self.set_phase(ApplyPhase::Idle);
        ApplyOutcome::Failed(err)
    }

    fn dismissed(&self) -> ApplyOutcome {
        info!("Apply abandoned: screen dismissed");
        self.set_phase(ApplyPhase::Idle);
        ApplyOutcome::Dismissed
    }

    async fn fetch_document(&self, url: &str) -> Result<String, ApplyError> {
        let parsed = Url::parse(url).map_err(|_| ApplyError::UrlInvalidSyntax { url: url.to_string() })?;
        info!("Downloading chain config from {}", parsed);
        let bytes = self.fetcher.fetch(&parsed).await.map_err(|e| {
            warn!("Download from {} failed: {}", url, e);
            ApplyError::UrlUnreachable { url: url.to_string() }
        })?;
        String::from_utf8(bytes).map_err(|_| ApplyError::InvalidUrlData)
    }

    /// Apply `resolved` on top of the persisted `current` configuration.
    ///
    /// `dismissed` fires (or its sender is dropped) when the screen closes;
    /// an outstanding fetch or validation is then dropped and its result
    /// discarded.
    pub async fn apply(
        &self,
        current: &WalletConfiguration,
        resolved: WalletConfiguration,
        mut dismissed: oneshot::Receiver<()>,
    ) -> ApplyOutcome {
        self.set_phase(ApplyPhase::Comparing);
        let target = resolved.active_network();
        let target_cfg = resolved.get(target).clone();
        let switching = current.active_network() != target;

        if !switching && *current.get(target) == target_cfg {
            info!("Configuration for {} unchanged, nothing to apply", target);
            self.set_phase(ApplyPhase::NoChange);
            return ApplyOutcome::NoChange;
        }

        let document = match &target_cfg.source {
            ConfigurationSource::Url(url) => {
                self.set_phase(ApplyPhase::Fetching);
                let fetched = tokio::select! {
                    biased;
                    _ = &mut dismissed => return self.dismissed(),
                    fetched = self.fetch_document(url) => fetched,
                };
                match fetched {
                    Ok(document) => document,
                    Err(err) => return self.fail(err),
                }
            }
            ConfigurationSource::Document(text) => text.clone(),
        };

        self.set_phase(ApplyPhase::Validating);
        let chain_name = resolved.effective_chain_name(target).to_string();
        let validated = tokio::select! {
            biased;
            _ = &mut dismissed => return self.dismissed(),
            validated = self.validator.validate(&document, &chain_name) => validated,
        };
        if let Err(e) = validated {
            warn!("Config for {} rejected (chain name '{}'): {}", target, chain_name, e);
            return self.fail(ApplyError::InvalidJsonOrUrlData);
        }

        if let Some(confirmation) = Confirmation::required(current, &resolved) {
            self.set_phase(ApplyPhase::AwaitingConfirmation);
            if !self.presenter.confirm(&confirmation).await {
                info!("User cancelled {:?}", confirmation);
                self.set_phase(ApplyPhase::Idle);
                return ApplyOutcome::Declined;
            }
        }

        self.set_phase(ApplyPhase::Applying);
        if let Err(e) = self.store.persist(&resolved, &target_cfg.source, &document).await {
            return self.fail(e.into());
        }
        info!("Applied configuration: active network {} ({})", target, chain_name);
        self.set_phase(ApplyPhase::Applied);
        ApplyOutcome::Applied(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::wallet_config::BlockchainConfiguration;

    const CFG_URL: &str = "https://example.com/cfg.json";

    fn pipeline(fetcher: Arc<MockFetcher>, validator: Arc<MockValidator>, store: Arc<MemoryStore>, presenter: Arc<ScriptedPresenter>) -> ApplyPipeline {
        ApplyPipeline::new(fetcher, validator, store, presenter)
    }

    fn with_source(cfg: WalletConfiguration, network: Network, source: ConfigurationSource, custom_id: Option<&str>) -> WalletConfiguration {
        cfg.with_network(network, BlockchainConfiguration::new(source, custom_id.map(str::to_string)))
    }

    // ==================== Confirmation tests ====================

    #[test]
    fn test_confirmation_required() {
        let current = WalletConfiguration::default();
        assert_eq!(Confirmation::required(&current, &current), None);

        let switched = current.clone().with_active_network(Network::TestNet);
        let c = Confirmation::required(&current, &switched).unwrap();
        assert_eq!(c, Confirmation::SwitchNetwork(Network::TestNet));
        assert!(c.is_destructive());
        assert!(c.text().contains("Test Gram network"));

        let current = WalletConfiguration::new(Network::TestNet);
        let renamed = with_source(current.clone(), Network::TestNet, ConfigurationSource::Url(CFG_URL.into()), Some("t5"));
        let c = Confirmation::required(&current, &renamed).unwrap();
        assert_eq!(
            c,
            Confirmation::ChainNameChanged {
                network: Network::TestNet,
                chain_name: "t5".to_string()
            }
        );
        assert!(!c.is_destructive());
    }

    #[test]
    fn test_phase_is_busy() {
        assert!(ApplyPhase::Fetching.is_busy());
        assert!(ApplyPhase::AwaitingConfirmation.is_busy());
        assert!(!ApplyPhase::Idle.is_busy());
        assert!(!ApplyPhase::Applied.is_busy());
    }

    // ==================== apply tests ====================

    #[tokio::test]
    async fn test_unchanged_configuration_is_noop() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(b"{}".to_vec()), true, true);
        let p = pipeline(fetcher.clone(), validator.clone(), store.clone(), presenter.clone());
        let current = WalletConfiguration::default();
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, current.clone(), rx).await;

        assert_eq!(outcome, ApplyOutcome::NoChange);
        assert_eq!(p.phase(), ApplyPhase::NoChange);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(validator.calls().len(), 0);
        assert!(store.writes().is_empty());
        assert!(presenter.confirmations().is_empty());
    }

    #[tokio::test]
    async fn test_switch_network_declined_leaves_store_untouched() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(b"{}".to_vec()), true, false);
        let p = pipeline(fetcher.clone(), validator, store.clone(), presenter.clone());
        let current = WalletConfiguration::default();
        let resolved = current.clone().with_active_network(Network::NewtonTestNet);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert_eq!(outcome, ApplyOutcome::Declined);
        assert_eq!(presenter.confirmations(), vec![Confirmation::SwitchNetwork(Network::NewtonTestNet)]);
        assert_eq!(fetcher.calls(), 1);
        assert!(store.writes().is_empty());
        assert_eq!(p.phase(), ApplyPhase::Idle);
    }

    #[tokio::test]
    async fn test_switch_network_confirmed_persists() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(b"{\"ok\":1}".to_vec()), true, true);
        let p = pipeline(fetcher, validator.clone(), store.clone(), presenter);
        let current = WalletConfiguration::default();
        let resolved = current.clone().with_active_network(Network::TestNet);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved.clone(), rx).await;

        assert_eq!(outcome, ApplyOutcome::Applied(resolved.clone()));
        assert_eq!(p.phase(), ApplyPhase::Applied);
        assert_eq!(validator.calls(), vec![("{\"ok\":1}".to_string(), "testnet2".to_string())]);
        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, resolved);
        assert_eq!(writes[0].1, resolved.get(Network::TestNet).source);
        assert_eq!(writes[0].2, "{\"ok\":1}");
    }

    #[tokio::test]
    async fn test_custom_id_change_asks_milder_confirmation() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(b"{}".to_vec()), true, true);
        let p = pipeline(fetcher, validator.clone(), store.clone(), presenter.clone());
        let current = WalletConfiguration::new(Network::TestNet);
        let source = current.get(Network::TestNet).source.clone();
        let resolved = with_source(current.clone(), Network::TestNet, source, Some("testnet7"));
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert!(matches!(outcome, ApplyOutcome::Applied(_)));
        let confirmations = presenter.confirmations();
        assert_eq!(confirmations.len(), 1);
        assert!(!confirmations[0].is_destructive());
        assert_eq!(validator.calls()[0].1, "testnet7");
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_source_change_needs_no_confirmation() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(Vec::new()), true, false);
        let p = pipeline(fetcher.clone(), validator, store.clone(), presenter.clone());
        let current = WalletConfiguration::default();
        let resolved = with_source(current.clone(), Network::MainNet, ConfigurationSource::Document("{\"doc\":1}".into()), None);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert!(matches!(outcome, ApplyOutcome::Applied(_)));
        assert!(presenter.confirmations().is_empty());
        // Inline documents are never downloaded
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(store.writes()[0].2, "{\"doc\":1}");
    }

    #[tokio::test]
    async fn test_non_utf8_download_fails_with_invalid_url_data() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(vec![0xff, 0xfe, 0x00, 0x80]), true, true);
        let p = pipeline(fetcher, validator.clone(), store.clone(), presenter.clone());
        let current = WalletConfiguration::default();
        let resolved = with_source(current.clone(), Network::TestNet, ConfigurationSource::Url(CFG_URL.into()), None)
            .with_active_network(Network::TestNet);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert_eq!(outcome, ApplyOutcome::Failed(ApplyError::InvalidUrlData));
        assert!(validator.calls().is_empty());
        assert!(store.writes().is_empty());
        assert_eq!(presenter.errors().len(), 1);
        assert_eq!(presenter.errors()[0].0, "Error");
        assert_eq!(p.phase(), ApplyPhase::Idle);
    }

    #[tokio::test]
    async fn test_unreachable_url_reports_url() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::failing(), true, true);
        let p = pipeline(fetcher, validator, store.clone(), presenter.clone());
        let current = WalletConfiguration::default();
        let resolved = with_source(current.clone(), Network::MainNet, ConfigurationSource::Url(CFG_URL.into()), None);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert_eq!(outcome, ApplyOutcome::Failed(ApplyError::UrlUnreachable { url: CFG_URL.to_string() }));
        assert!(presenter.errors()[0].1.contains(CFG_URL));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_document_fails_with_same_error_for_inline() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(Vec::new()), false, true);
        let p = pipeline(fetcher, validator, store.clone(), presenter);
        let current = WalletConfiguration::default();
        let resolved = with_source(current.clone(), Network::MainNet, ConfigurationSource::Document("garbage".into()), None);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert_eq!(outcome, ApplyOutcome::Failed(ApplyError::InvalidJsonOrUrlData));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_download_fails_with_invalid_json_or_url_data() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(b"{}".to_vec()), false, true);
        let p = pipeline(fetcher, validator, store.clone(), presenter);
        let current = WalletConfiguration::default();
        let resolved = current.clone().with_active_network(Network::TestNet);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert_eq!(outcome, ApplyOutcome::Failed(ApplyError::InvalidJsonOrUrlData));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let (fetcher, validator, _, presenter) = mocks(MockFetcher::bytes(b"{}".to_vec()), true, true);
        let store = Arc::new(MemoryStore::failing());
        let p = pipeline(fetcher, validator, store, presenter.clone());
        let current = WalletConfiguration::default();
        let resolved = current.clone().with_active_network(Network::TestNet);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert!(matches!(outcome, ApplyOutcome::Failed(ApplyError::Persist(_))));
        assert_eq!(presenter.errors().len(), 1);
        assert_eq!(p.phase(), ApplyPhase::Idle);
    }

    #[tokio::test]
    async fn test_dismissal_during_fetch_discards_result() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::never(), true, true);
        let p = Arc::new(pipeline(fetcher, validator.clone(), store.clone(), presenter.clone()));
        let current = WalletConfiguration::default();
        let resolved = current.clone().with_active_network(Network::TestNet);
        let (tx, rx) = oneshot::channel();
        let mut phases = p.subscribe();

        let task = {
            let p = p.clone();
            tokio::spawn(async move { p.apply(&current, resolved, rx).await })
        };
        while *phases.borrow_and_update() != ApplyPhase::Fetching {
            phases.changed().await.unwrap();
        }
        tx.send(()).unwrap();
        let outcome = task.await.unwrap();

        assert_eq!(outcome, ApplyOutcome::Dismissed);
        assert!(validator.calls().is_empty());
        assert!(store.writes().is_empty());
        assert!(presenter.errors().is_empty());
        assert_eq!(p.phase(), ApplyPhase::Idle);
    }

    #[tokio::test]
    async fn test_dropped_dismiss_sender_counts_as_dismissal() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(b"{}".to_vec()), true, true);
        let p = pipeline(fetcher, validator, store.clone(), presenter);
        let current = WalletConfiguration::default();
        let resolved = current.clone().with_active_network(Network::TestNet);
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);

        let outcome = p.apply(&current, resolved, rx).await;

        assert_eq!(outcome, ApplyOutcome::Dismissed);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_dismissal_during_validation_discards_result() {
        let (fetcher, _, store, presenter) = mocks(MockFetcher::bytes(b"{}".to_vec()), true, true);
        let validator = Arc::new(MockValidator::never());
        let p = Arc::new(pipeline(fetcher, validator.clone(), store.clone(), presenter.clone()));
        let current = WalletConfiguration::default();
        let resolved = current.clone().with_active_network(Network::TestNet);
        let (tx, rx) = oneshot::channel();
        let mut phases = p.subscribe();

        let task = {
            let p = p.clone();
            tokio::spawn(async move { p.apply(&current, resolved, rx).await })
        };
        while *phases.borrow_and_update() != ApplyPhase::Validating {
            phases.changed().await.unwrap();
        }
        tx.send(()).unwrap();
        let outcome = task.await.unwrap();

        assert_eq!(outcome, ApplyOutcome::Dismissed);
        assert_eq!(validator.calls().len(), 1);
        assert!(presenter.confirmations().is_empty());
        assert!(presenter.errors().is_empty());
        assert!(store.writes().is_empty());
        assert_eq!(p.phase(), ApplyPhase::Idle);
    }

    #[tokio::test]
    async fn test_malformed_url_fails_without_dialog() {
        let (fetcher, validator, store, presenter) = mocks(MockFetcher::bytes(b"{}".to_vec()), true, true);
        let p = pipeline(fetcher.clone(), validator, store.clone(), presenter.clone());
        let current = WalletConfiguration::default();
        let resolved = with_source(current.clone(), Network::MainNet, ConfigurationSource::Url("not a url".into()), None);
        let (_tx, rx) = oneshot::channel();

        let outcome = p.apply(&current, resolved, rx).await;

        assert_eq!(
            outcome,
            ApplyOutcome::Failed(ApplyError::UrlInvalidSyntax {
                url: "not a url".to_string()
            })
        );
        assert_eq!(fetcher.calls(), 0);
        assert!(presenter.errors().is_empty());
        assert!(store.writes().is_empty());
        assert_eq!(p.phase(), ApplyPhase::Idle);
    }
}
