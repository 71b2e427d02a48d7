//! Infrastructure layer providing external service integrations.
//!
//! This module contains the HTTP transport, persisted session storage,
//! CSV export, configuration and logging setup.

pub mod config;
pub mod export;
pub mod logging;
pub mod persistence;
pub mod transport;

pub use config::*;
pub use export::*;
pub use logging::*;
pub use persistence::*;
pub use transport::*;
