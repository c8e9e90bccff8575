//! Core domain + application logic for the Kalm support bot.
//!
//! This crate is intentionally framework-agnostic. Telegram / OpenAI / ElevenLabs
//! live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod crisis;
pub mod domain;
pub mod errors;
pub mod ingestion;
pub mod intent;
pub mod logging;
pub mod messaging;
pub mod orchestrator;
pub mod pending;
pub mod pipeline;
pub mod ports;
pub mod prompts;
pub mod voice_store;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
