//! agentparl - scheduled content pipelines for a Telegram channel
//!
//! This crate provides:
//! - A SQLite content store that remembers what has been posted
//! - Source connectors for Wikipedia, Wikidata, YouTube, RSS/Atom feeds and a local image folder
//! - A Gemini generator and a Telegram publisher behind small traits
//! - An orchestrator running select → generate → publish → record with at-most-once posting

pub mod commands;
pub mod config;
pub mod error;
pub mod generate;
pub mod logging;
pub mod media;
pub mod orchestrator;
pub mod pipelines;
pub mod publish;
pub mod retry;
pub mod sources;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
