//! Configuration for the state store.
//!
//! ```toml
//! max_sessions = 4096
//! timeout_secs = 30
//! server_id = 0
//! thread_safe = true
//! token_attribute = "State"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default maximum number of conversations tracked at once.
pub const DEFAULT_MAX_SESSIONS: usize = 4096;

/// Default lifetime of a parked conversation, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest accepted entry lifetime, in seconds (one year).
pub const MAX_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// Default name of the attribute carrying the token.
pub const DEFAULT_TOKEN_ATTRIBUTE: &str = "State";

/// Configuration for a [`StateStore`](crate::StateStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Maximum number of conversations tracked before new ones are refused.
    pub max_sessions: usize,

    /// Seconds a parked conversation survives without another round.
    pub timeout_secs: u64,

    /// Tag byte embedded in every minted token. Lets operators tell which
    /// backend server a conversation originated from.
    pub server_id: u8,

    /// Whether the store is shared between worker threads.
    pub thread_safe: bool,

    /// Attribute that carries the token in inbound and outbound messages.
    pub token_attribute: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            server_id: 0,
            thread_safe: true,
            token_attribute: DEFAULT_TOKEN_ATTRIBUTE.to_string(),
        }
    }
}

impl StateConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration for values the store cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Err(Error::Config("max_sessions must be at least 1".to_string()));
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::Config(format!(
                "timeout_secs must be at most {MAX_TIMEOUT_SECS}, got {}",
                self.timeout_secs
            )));
        }
        if self.token_attribute.is_empty() {
            return Err(Error::Config("token_attribute must not be empty".to_string()));
        }
        Ok(())
    }

    /// Entry lifetime as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Set the maximum number of tracked conversations.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the entry lifetime in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the server id tag byte.
    pub fn with_server_id(mut self, server_id: u8) -> Self {
        self.server_id = server_id;
        self
    }

    /// Enable or disable locking.
    pub fn with_thread_safe(mut self, thread_safe: bool) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    /// Set the token attribute name.
    pub fn with_token_attribute(mut self, name: impl Into<String>) -> Self {
        self.token_attribute = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StateConfig::default();
        assert_eq!(config.max_sessions, DEFAULT_MAX_SESSIONS);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.token_attribute, "State");
        assert!(config.thread_safe);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StateConfig::new()
            .with_max_sessions(2)
            .with_timeout_secs(5)
            .with_server_id(7)
            .with_thread_safe(false)
            .with_token_attribute("Proxy-State");

        assert_eq!(config.max_sessions, 2);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.server_id, 7);
        assert!(!config.thread_safe);
        assert_eq!(config.token_attribute, "Proxy-State");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = StateConfig::from_toml_str("max_sessions = 10\nserver_id = 3\n").unwrap();
        assert_eq!(config.max_sessions, 10);
        assert_eq!(config.server_id, 3);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_zero_sessions_rejected() {
        let result = StateConfig::from_toml_str("max_sessions = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_huge_timeout_rejected() {
        let result = StateConfig::from_toml_str("timeout_secs = 9223372036854775807");
        assert!(matches!(result, Err(Error::Config(_))));

        let longest = StateConfig::new().with_timeout_secs(MAX_TIMEOUT_SECS);
        assert!(longest.validate().is_ok());
        assert!(longest.with_timeout_secs(MAX_TIMEOUT_SECS + 1).validate().is_err());
    }

    #[test]
    fn test_bad_toml() {
        let result = StateConfig::from_toml_str("max_sessions = \"lots\"");
        assert!(matches!(result, Err(Error::ParseConfig(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = 120\nthread_safe = false").unwrap();

        let config = StateConfig::load(file.path()).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert!(!config.thread_safe);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = StateConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::ReadConfig { .. })));
    }
}
