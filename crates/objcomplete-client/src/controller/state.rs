use std::fmt;
use std::time::Duration;

use objcomplete_core::InputConfig;

use crate::backend::RequestId;

/// Text of the bound input and the rules for when it may be queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    pub current_text: String,
    pub min_length: usize,
    pub debounce: Duration,
}

impl InputState {
    pub fn new(min_length: usize, debounce: Duration) -> Self {
        Self {
            current_text: String::new(),
            min_length,
            debounce,
        }
    }

    pub fn from_config(config: &InputConfig) -> Self {
        Self::new(config.min_length, config.debounce())
    }

    /// Length in characters, not bytes.
    pub fn len_of(text: &str) -> usize {
        text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub text: String,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    Idle,
    Debouncing,
    AwaitingResponse,
    /// Passed through when a keystroke lands while a request is in flight.
    Superseded,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Debouncing => "debouncing",
            Self::AwaitingResponse => "awaiting-response",
            Self::Superseded => "superseded",
        };
        f.write_str(name)
    }
}
