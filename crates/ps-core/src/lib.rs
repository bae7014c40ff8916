//! Core types and utilities for proxysieve
//!
//! # Modules
//!
//! - `config`: Environment configuration loading
//! - `descriptor`: Connection descriptors and their identity keys
//! - `error`: Error types and Result alias
//! - `label`: Display labels carried in the descriptor fragment
//! - `network`: Allow-list prefix extraction
//! - `score`: Reliability score policy and thresholds

pub mod config;
pub mod descriptor;
pub mod error;
pub mod label;
pub mod network;
pub mod score;

// Re-exports
pub use descriptor::{CoarseIdentity, ConnectionParams, Descriptor, FineIdentity};
pub use error::{Error, Result};
pub use label::DisplayLabel;
pub use network::network_prefix;
pub use score::{ScorePolicy, Thresholds};
