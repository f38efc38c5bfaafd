//! deptrack core - configuration, logging and shared error types
//!
//! Everything here is infrastructure; the access-control and record logic
//! lives in `deptrack-applications`.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use error::*;
pub use logging::*;
pub use types::*;

pub use tracing;
