//! objcomplete core — suggestion model, object identifiers, configuration.

pub mod config;
pub mod error;
pub mod models;

pub use config::{AppConfig, EndpointConfig, InputConfig};
pub use error::{CompleteError, Result};
pub use models::*;
