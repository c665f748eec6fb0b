use std::time::Duration;
use thiserror::Error;

/// Why a single page load produced no snapshot
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadFailure {
    /// Browser session could not be started (exit code 4)
    #[error("Failed to launch browser session: {0}")]
    Launch(String),
    /// Navigation itself failed (exit code 6)
    #[error("Failed to navigate to {url}: {message}")]
    Navigate { url: String, message: String },
    /// Navigation did not finish in time (exit code 5)
    #[error("Navigation to {url} timed out after {}s", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },
    /// Extraction script failed or returned an unexpected shape (exit code 6)
    #[error("Failed to extract DOM: {0}")]
    Extract(String),
}

/// Errors surfaced by the shell and the CLI subcommands
#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("Please enter a URL")]
    EmptyUrl,
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("A page load is already in progress")]
    LoadInProgress,
    #[error("Unknown command '{0}'. Type 'help' for a list of commands")]
    UnknownCommand(String),
    #[error("No element at '{0}'")]
    NoSuchElement(String),
    #[error("No page loaded yet. Use 'load <url>' first")]
    NothingLoaded,
    #[error(transparent)]
    Load(#[from] LoadFailure),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScribeError {
    /// Input problems are reported as warnings and never change shell state
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ScribeError::EmptyUrl
                | ScribeError::InvalidUrl { .. }
                | ScribeError::LoadInProgress
                | ScribeError::UnknownCommand(_)
                | ScribeError::NoSuchElement(_)
                | ScribeError::NothingLoaded
        )
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_input_error() => 2,
            ScribeError::Load(LoadFailure::Launch(_)) => 4,
            ScribeError::Load(LoadFailure::Timeout { .. }) => 5,
            ScribeError::Load(_) => 6,
            _ => 1,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ScribeError::Io {
            context: context.into(),
            source,
        }
    }
}
