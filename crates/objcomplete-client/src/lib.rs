//! objcomplete client — debounced object lookup against a `complete_object` endpoint.

pub mod backend;
pub mod controller;
pub mod error;
pub mod http;

pub use backend::{BackendStatus, HttpBackend, LookupBackend, QueryRequest, RequestId};
pub use controller::{
    AutocompleteController, AutocompleteHooks, AutocompleteSession, Command, ControllerState,
    ErrorIndicator, NoopHooks, ResponseOutcome, SessionHandle, Snapshot,
};
pub use error::{LookupError, LookupErrorKind, Result};
pub use http::{Endpoint, LookupClient};
