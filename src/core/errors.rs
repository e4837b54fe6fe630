use std::time::Duration;
use thiserror::Error;

/// Raised while resolving a web target's login form. Never fatal to a run.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("page render failed: {0}")]
    Render(String),

    #[error("page render timed out after {0:?}")]
    Timeout(Duration),

    #[error("no password field found on {0}")]
    NoSecretField(String),
}

/// Raised by a wordlist source. The controller skips to the next source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("wordlist source unavailable: {name}: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("wordlist io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalogue request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SourceError {
    pub fn unavailable(name: impl Into<String>, reason: impl ToString) -> Self {
        SourceError::Unavailable {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors that stop a run from starting at all
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("target missing: {0}")]
    MissingTarget(String),

    #[error("no wordlist sources configured")]
    NoSourcesConfigured,

    #[error("http client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("target kind mismatch: {0}")]
    KindMismatch(String),
}

/// Outcome of preparing a target before the search starts
#[derive(Error, Debug)]
pub enum PrepareError {
    /// The target is malformed; the run ends as a structural failure
    #[error("structural failure: {0}")]
    Structural(String),

    #[error(transparent)]
    Fatal(#[from] EngineError),
}
