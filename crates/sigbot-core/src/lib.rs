//! Core domain + application logic for the Signal command bot.
//!
//! This crate does not know how messages reach the bot. `signal-cli` lives in
//! its own adapter crate behind the ports in [`ports`].

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod ports;
pub mod validation;
pub mod wire;

pub use errors::{Error, Result};
