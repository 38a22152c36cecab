//! Error types for the apply pipeline and its collaborators.

use thiserror::Error;

/// Title used for every apply failure dialog.
pub const APPLY_ERROR_TITLE: &str = "Error";

/// A failure surfaced to the user while applying a configuration. Persisted
/// state is never touched when one of these is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// Drafts with a malformed URL never resolve, so this only guards
    /// configurations built outside the draft. Logged, not shown.
    #[error("The URL {url} is invalid.")]
    UrlInvalidSyntax { url: String },

    #[error("Failed to download the configuration from {url}. Please check the URL and your connection.")]
    UrlUnreachable { url: String },

    #[error("The data downloaded from the URL is not a valid configuration.")]
    InvalidUrlData,

    /// Same message whether the document was downloaded or typed inline.
    #[error("The configuration is invalid for the selected blockchain.")]
    InvalidJsonOrUrlData,

    #[error("Failed to save the configuration: {0}")]
    Persist(String),
}

impl ApplyError {
    pub fn title(&self) -> &'static str {
        APPLY_ERROR_TITLE
    }

    /// Whether the failure gets an error dialog
    pub fn shows_dialog(&self) -> bool {
        !matches!(self, ApplyError::UrlInvalidSyntax { .. })
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("document is not a valid chain config: {0}")]
    Malformed(String),

    #[error("unexpected config type '{0}'")]
    WrongType(String),

    #[error("config has no lite servers")]
    NoLiteServers,

    #[error("config does not belong to blockchain '{expected}'")]
    IdentityMismatch { expected: String },
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<PersistError> for ApplyError {
    fn from(err: PersistError) -> Self {
        ApplyError::Persist(err.to_string())
    }
}
