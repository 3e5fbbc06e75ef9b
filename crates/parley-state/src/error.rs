//! Error types for state store operations.

use crate::request::RequestId;

/// Error type for state store operations.
///
/// A token that matches nothing is not an error: lookups return `Option`
/// and the conversation simply starts over.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tracked-entry ceiling was reached, even after expired entries
    /// were cleaned up.
    #[error("At maximum ongoing session limit ({max_sessions})")]
    CapacityExceeded { max_sessions: usize },

    /// Another in-flight request already holds the entry's payload.
    #[error("State entry {entry_id} has already been claimed by request {holder}")]
    AlreadyClaimed { entry_id: u64, holder: RequestId },

    /// The derived key is already present in the key index.
    #[error("Insertion into state index failed: duplicate key")]
    DuplicateKey,

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
}

impl Error {
    /// Whether the failure means no entry could be created for the
    /// conversation. Callers treat both cases the same way.
    pub fn is_create_failure(&self) -> bool {
        matches!(self, Error::CapacityExceeded { .. } | Error::DuplicateKey)
    }
}

/// Result type for state store operations.
pub type Result<T> = std::result::Result<T, Error>;
