//! # oo-core
//!
//! Core types for the Ouroboros Compute API client.
//!
//! The remote service owns all workflow orchestration. This crate only
//! describes what travels over the wire and how failures are reported:
//!
//! - `OoError` is the single error type for every client operation
//! - `OoConfig` is the explicit configuration value handed to the client
//! - Request and response models keep unknown server fields so that the
//!   remote schema can grow without breaking deserialization

mod config;
mod error;
mod types;

pub use config::{OoConfig, CONFIG_FILE};
pub use error::{ErrorKind, OoError, Result};
pub use types::*;
