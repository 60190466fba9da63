use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinwireError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Unexpected payload: {0}")]
    Protocol(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("Collection cycle produced no items")]
    Degraded,

    #[error("Refresh failed: {0}")]
    Refresh(Arc<FinwireError>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl FinwireError {
    /// Errors that abort a whole refresh cycle instead of degrading one source.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ResourceExhausted(_) => true,
            Self::Refresh(inner) => inner.is_fatal(),
            _ => false,
        }
    }

    pub fn is_degraded(&self) -> bool {
        match self {
            Self::Degraded => true,
            Self::Refresh(inner) => inner.is_degraded(),
            _ => false,
        }
    }
}

/// A single record inside an otherwise valid payload could not be mapped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemParseError {
    #[error("entry has no title")]
    EmptyTitle,

    #[error("malformed entry: {0}")]
    Malformed(String),

    #[error("malformed XML in entry: {0}")]
    Xml(String),
}

pub type Result<T> = std::result::Result<T, FinwireError>;
