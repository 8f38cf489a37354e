//! Client for the remote instrument tracking service.
//!
//! [`RemoteBackend`] is the seam the watcher talks through; [`HttpBackend`]
//! is the production implementation over the service's REST API.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpBackend, RemoteBackend};
pub use error::{BackendError, Result};
pub use types::*;
