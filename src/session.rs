//! One configuration-screen session.
//!
//! The session owns the draft and reduces user edits into it one event at a
//! time. Apply runs the pipeline on a background task so edits keep flowing
//! while a download is outstanding; dismissing the screen cancels it.

use crate::draft::{DraftEdit, DraftRejection, DraftState};
use crate::pipeline::{ApplyOutcome, ApplyPipeline};
use crate::wallet_config::WalletConfiguration;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// Input to a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Edit(DraftEdit),
    Apply,
    Dismiss,
}

/// How the session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionExit {
    /// A new configuration was persisted.
    Applied(WalletConfiguration),
    /// Apply found nothing to change.
    Closed,
    /// The screen went away without applying.
    Dismissed,
}

/// Snapshot published to whoever renders the screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub draft: DraftState,
    pub applying: bool,
}

impl SessionView {
    pub fn apply_enabled(&self) -> bool {
        !self.applying && self.draft.is_appliable()
    }
}

struct ApplyJob {
    handle: JoinHandle<ApplyOutcome>,
    cancel: oneshot::Sender<()>,
}

enum Step {
    Finished(Result<ApplyOutcome, JoinError>),
    Event(Option<SessionEvent>),
}

pub struct Session {
    persisted: WalletConfiguration,
    pipeline: Arc<ApplyPipeline>,
    view: watch::Sender<SessionView>,
}

impl Session {
    pub fn new(persisted: WalletConfiguration, pipeline: Arc<ApplyPipeline>) -> Self {
        let draft = DraftState::from_configuration(persisted.clone());
        let (view, _) = watch::channel(SessionView {
            draft,
            applying: false,
        });
        Self {
            persisted,
            pipeline,
            view,
        }
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    fn reduce(&self, edit: DraftEdit) {
        debug!("draft edit: {:?}", edit);
        self.view.send_modify(|view| view.draft = view.draft.apply_edit(edit));
    }

    fn set_applying(&self, applying: bool) {
        self.view.send_modify(|view| view.applying = applying);
    }

    fn start_apply(&self) -> Option<ApplyJob> {
        let resolved = match self.view.borrow().draft.resolve() {
            Ok(resolved) => resolved,
            Err(rejection) => {
                debug!("Apply ignored: {}", rejection);
                if rejection == DraftRejection::ReservedNameConflict {
                    self.pipeline.presenter().show_info(&rejection.to_string());
                }
                return None;
            }
        };

        let (cancel, dismissed) = oneshot::channel();
        let pipeline = self.pipeline.clone();
        let current = self.persisted.clone();
        let handle = tokio::spawn(async move { pipeline.apply(&current, resolved, dismissed).await });
        self.set_applying(true);
        Some(ApplyJob { handle, cancel })
    }

    /// Map a finished apply onto the session: `Some` ends the session.
    fn finish(&self, joined: Result<ApplyOutcome, JoinError>) -> Option<SessionExit> {
        self.set_applying(false);
        match joined {
            Ok(ApplyOutcome::NoChange) => Some(SessionExit::Closed),
            Ok(ApplyOutcome::Applied(configuration)) => Some(SessionExit::Applied(configuration)),
            Ok(ApplyOutcome::Dismissed) => Some(SessionExit::Dismissed),
            Ok(ApplyOutcome::Declined) | Ok(ApplyOutcome::Failed(_)) => None,
            Err(e) => {
                warn!("Apply task ended abnormally: {}", e);
                None
            }
        }
    }

    /// Drive the session until it applies, closes, or is dismissed. A closed
    /// event channel counts as dismissal.
    pub async fn run(self, mut events: mpsc::Receiver<SessionEvent>) -> SessionExit {
        let mut job: Option<ApplyJob> = None;
        loop {
            let step = match job.as_mut() {
                Some(running) => tokio::select! {
                    joined = &mut running.handle => Step::Finished(joined),
                    event = events.recv() => Step::Event(event),
                },
                None => Step::Event(events.recv().await),
            };

            match step {
                Step::Finished(joined) => {
                    job = None;
                    if let Some(exit) = self.finish(joined) {
                        info!("Session finished: {:?}", exit);
                        return exit;
                    }
                }
                Step::Event(Some(SessionEvent::Edit(edit))) => self.reduce(edit),
                Step::Event(Some(SessionEvent::Apply)) => {
                    if job.is_some() {
                        debug!("Apply ignored: already applying");
                    } else {
                        job = self.start_apply();
                    }
                }
                Step::Event(Some(SessionEvent::Dismiss)) | Step::Event(None) => {
                    let exit = match job.take() {
                        Some(running) => {
                            let _ = running.cancel.send(());
                            // Confirmation and persistence are not interruptible
                            match self.finish(running.handle.await) {
                                Some(SessionExit::Applied(configuration)) => SessionExit::Applied(configuration),
                                _ => SessionExit::Dismissed,
                            }
                        }
                        None => SessionExit::Dismissed,
                    };
                    info!("Session finished: {:?}", exit);
                    return exit;
                }
            }
        }
    }
}
