use serde::{Deserialize, Serialize};

/// Coarse feedback about the current input, meant for colouring the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "count", rename_all = "snake_case")]
pub enum MatchFeedback {
    Idle,
    /// Shorter than the minimum query length.
    Incomplete,
    /// Cannot be an object id or a symbol name.
    Invalid,
    Pending,
    NoMatch,
    Unique,
    Few(usize),
    TooMany(usize),
    /// The last lookup failed.
    Unavailable,
}

impl MatchFeedback {
    pub fn from_count(count: usize, max_suggestions: usize) -> Self {
        match count {
            0 => Self::NoMatch,
            1 => Self::Unique,
            n if n <= max_suggestions => Self::Few(n),
            n => Self::TooMany(n),
        }
    }
}
