//! Terminal front end: a line-based command reader and a [`Presenter`] that
//! prints to stdout.
//!
//! Every input line goes through [`drive`]. While a confirmation is pending
//! the next line answers it instead of being parsed as a command; answers
//! typed before the prompt appears are not kept. When input ends the pending
//! confirmation, and any later one, is declined.

use crate::collaborators::Presenter;
use crate::config::{Network, UnknownNetwork};
use crate::draft::DraftEdit;
use crate::pipeline::Confirmation;
use crate::session::{SessionEvent, SessionView};
use crate::wallet_config::SourceKind;
use async_trait::async_trait;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

pub const HELP: &str = "\
Commands:
  network <tag>            select the active network
  source <url|json>        choose how the active network is configured
  url <text>               set the config URL of the active network
  document <path>          load an inline config document from a file
  name <text>              set the blockchain ID (empty clears it)
  show                     print the draft
  apply                    apply the draft
  quit                     leave without applying
Confirmations are answered with 'proceed' (or 'yes') after the prompt.";

/// Answer channel for the confirmation currently on screen.
#[derive(Debug, Default)]
pub struct ConfirmationSlot {
    answer: Option<oneshot::Sender<bool>>,
    closed: bool,
}

impl ConfirmationSlot {
    pub fn shared() -> PendingConfirmation {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Start waiting for an answer. `None` once input has ended.
    pub fn open(&mut self) -> Option<oneshot::Receiver<bool>> {
        if self.closed {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.answer = Some(tx);
        Some(rx)
    }

    pub fn is_waiting(&self) -> bool {
        self.answer.is_some()
    }

    /// Deliver an answer; `false` if nothing was waiting for one.
    pub fn answer(&mut self, proceed: bool) -> bool {
        match self.answer.take() {
            Some(tx) => {
                let _ = tx.send(proceed);
                true
            }
            None => false,
        }
    }

    /// No more input: decline what is on screen and everything after.
    pub fn close(&mut self) {
        self.closed = true;
        self.answer(false);
    }
}

pub type PendingConfirmation = Arc<Mutex<ConfirmationSlot>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Edit(DraftEdit),
    LoadDocument(Network, PathBuf),
    Show,
    Apply,
    Quit,
    Help,
    /// A confirmation answer typed while nothing is being confirmed
    Answer(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error(transparent)]
    Network(#[from] UnknownNetwork),

    #[error("unknown source kind '{0}', expected 'url' or 'json'")]
    SourceKind(String),
}

/// Parse one input line. Edits target `active`, the draft's active network.
pub fn parse_command(line: &str, active: Network) -> Result<Command, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let required = |name: &'static str| {
        if rest.is_empty() {
            Err(CommandError::MissingArgument(name))
        } else {
            Ok(rest)
        }
    };

    match word.to_ascii_lowercase().as_str() {
        "network" => {
            let network: Network = required("network")?.parse()?;
            Ok(Command::Edit(DraftEdit::SetActiveNetwork(network)))
        }
        "source" => {
            let kind = match required("source")?.to_ascii_lowercase().as_str() {
                "url" => SourceKind::Url,
                "json" | "document" => SourceKind::Document,
                other => return Err(CommandError::SourceKind(other.to_string())),
            };
            Ok(Command::Edit(DraftEdit::SetSourceKind(active, kind)))
        }
        "url" => Ok(Command::Edit(DraftEdit::SetStagedUrl(active, rest.to_string()))),
        "document" => Ok(Command::LoadDocument(active, PathBuf::from(required("document")?))),
        "name" => Ok(Command::Edit(DraftEdit::SetCustomId(active, rest.to_string()))),
        "show" => Ok(Command::Show),
        "apply" => Ok(Command::Apply),
        "quit" | "exit" => Ok(Command::Quit),
        "help" | "?" => Ok(Command::Help),
        "y" | "yes" | "proceed" => Ok(Command::Answer(true)),
        "n" | "no" | "cancel" => Ok(Command::Answer(false)),
        _ => Err(CommandError::Unknown(word.to_string())),
    }
}

fn is_affirmative(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "proceed")
}

/// Human-readable dump of the draft
pub fn render(view: &SessionView) -> String {
    let draft = &view.draft;
    let mut out = String::new();
    for network in Network::ALL {
        let marker = if network == draft.active_network() { '*' } else { ' ' };
        let kind = draft.source_kind(network);
        let value = match kind {
            SourceKind::Url => draft.staged_url(network).to_string(),
            SourceKind::Document => format!("({} bytes)", draft.staged_document(network).len()),
        };
        out.push_str(&format!(
            "{} {:<24} {:<4} {}  [id: {}]\n",
            marker,
            network.label(),
            kind.label(),
            value,
            draft.configuration().effective_chain_name(network)
        ));
    }
    match (view.applying, draft.readiness()) {
        (true, _) => out.push_str("applying..."),
        (false, Ok(())) => out.push_str("ready to apply"),
        (false, Err(reason)) => out.push_str(&format!("not ready: {}", reason)),
    }
    out
}

/// Read stdin on a plain thread and forward lines. The thread is left
/// running when the session ends.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Turn input lines into session events until input ends, the user quits,
/// or the session stops listening.
pub async fn drive(
    mut lines: mpsc::UnboundedReceiver<String>,
    pending: PendingConfirmation,
    events: mpsc::Sender<SessionEvent>,
    view: watch::Receiver<SessionView>,
) {
    while let Some(line) = lines.recv().await {
        let answered = pending
            .lock()
            .map(|mut slot| slot.answer(is_affirmative(&line)))
            .unwrap_or(false);
        if answered {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let active = view.borrow().draft.active_network();
        let event = match parse_command(&line, active) {
            Ok(Command::Edit(edit)) => SessionEvent::Edit(edit),
            Ok(Command::LoadDocument(network, path)) => match tokio::fs::read_to_string(&path).await {
                Ok(text) => SessionEvent::Edit(DraftEdit::SetStagedDocument(network, text)),
                Err(e) => {
                    println!("Cannot read {}: {}", path.display(), e);
                    continue;
                }
            },
            Ok(Command::Apply) => SessionEvent::Apply,
            Ok(Command::Quit) => SessionEvent::Dismiss,
            Ok(Command::Show) => {
                println!("{}", render(&view.borrow()));
                continue;
            }
            Ok(Command::Help) => {
                println!("{}", HELP);
                continue;
            }
            Ok(Command::Answer(_)) => {
                println!("Nothing to confirm; answer after the prompt appears.");
                continue;
            }
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let quitting = event == SessionEvent::Dismiss;
        if events.send(event).await.is_err() || quitting {
            break;
        }
    }

    if let Ok(mut slot) = pending.lock() {
        slot.close();
    }
}

/// [`Presenter`] on stdout. Confirmations are answered by the next input line.
pub struct ConsolePresenter {
    pending: PendingConfirmation,
}

impl ConsolePresenter {
    pub fn new(pending: PendingConfirmation) -> Self {
        Self { pending }
    }
}

#[async_trait]
impl Presenter for ConsolePresenter {
    async fn confirm(&self, confirmation: &Confirmation) -> bool {
        let rx = match self.pending.lock() {
            Ok(mut slot) => slot.open(),
            Err(_) => None,
        };
        let Some(rx) = rx else {
            debug!("Input closed, declining {:?}", confirmation);
            return false;
        };
        println!("{}\n\n{}\n", confirmation.title(), confirmation.text());
        println!("Type '{}' to continue, anything else to cancel:", confirmation.proceed_label().to_lowercase());
        rx.await.unwrap_or(false)
    }

    fn show_error(&self, title: &str, message: &str) {
        println!("{}: {}", title, message);
    }

    fn show_info(&self, text: &str) {
        println!("{}", text);
    }
}
