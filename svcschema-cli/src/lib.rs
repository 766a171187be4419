//! Library half of the `svcschema` binary.
//!
//! Kept separate from `main.rs` so the commands can be driven from tests
//! against a temporary store.

pub mod commands;
pub mod config;

pub use commands::{Outcome, ValidateRequest};
pub use config::CliConfig;
