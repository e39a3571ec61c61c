use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Evaluator state mismatch: strategy expects a {expected} reading, state holds {found}")]
    StateMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Transient broker / data failures. The polling loop treats these as
    /// "no signal this cycle" and keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Broker(_) | Error::DataUnavailable(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
