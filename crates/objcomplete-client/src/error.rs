use objcomplete_core::CompleteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup at {url} answered HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed lookup response: {0}")]
    Malformed(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Core(#[from] CompleteError),
}

/// Which user-visible failure a lookup error maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupErrorKind {
    /// The backend could not be reached (refused, timed out).
    Network,
    /// The backend answered, but not with a usable result.
    Backend,
}

impl LookupError {
    pub fn kind(&self) -> LookupErrorKind {
        match self {
            // A body that fails to decode still came from the backend.
            Self::Http(e) if e.is_decode() || e.is_status() => LookupErrorKind::Backend,
            Self::Http(_) | Self::InvalidUrl(_) => LookupErrorKind::Network,
            Self::Status { .. } | Self::Malformed(_) | Self::Core(_) => LookupErrorKind::Backend,
        }
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;
