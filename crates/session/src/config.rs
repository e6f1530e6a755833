//! Session configuration (TOML-serializable).

use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use rendezvous_net_chunk::DEFAULT_MAX_FRAGMENT_LEN;
use rendezvous_net_trackers::AnnounceOptions;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::events::DEFAULT_EVENT_CHANNEL_CAPACITY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Application identifier; hashed into the lookup key announced to trackers.
    #[serde(default)]
    pub identifier: String,

    /// Tracker announce URLs, in the order they are started.
    #[serde(default)]
    pub trackers: Vec<String>,

    /// Options used for every announce unless overridden per call.
    #[serde(default)]
    pub announce: AnnounceOptions,

    /// Largest payload carried by one outbound fragment.
    #[serde(default = "default_max_fragment_len")]
    pub max_fragment_len: usize,

    /// Broadcast capacity for session events.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            trackers: Vec::new(),
            announce: AnnounceOptions::default(),
            max_fragment_len: default_max_fragment_len(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_max_fragment_len() -> usize {
    DEFAULT_MAX_FRAGMENT_LEN
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

impl SessionConfig {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn with_trackers<I, S>(mut self, trackers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trackers = trackers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_announce(mut self, announce: AnnounceOptions) -> Self {
        self.announce = announce;
        self
    }

    pub fn with_max_fragment_len(mut self, max_fragment_len: usize) -> Self {
        self.max_fragment_len = max_fragment_len;
        self
    }

    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml(&content)
            .wrap_err_with(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)
            .wrap_err_with(|| format!("failed to write config: {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.identifier.is_empty() {
            return Err(SessionError::Config("identifier must not be empty".into()));
        }
        if self.max_fragment_len == 0 {
            return Err(SessionError::Config(
                "max_fragment_len must be greater than zero".into(),
            ));
        }
        if let Some(url) = self.trackers.iter().find(|url| url.trim().is_empty()) {
            return Err(SessionError::Config(format!("invalid tracker url {url:?}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(config.trackers.is_empty());
        assert_eq!(config.announce, AnnounceOptions::default());
        assert_eq!(config.max_fragment_len, DEFAULT_MAX_FRAGMENT_LEN);
        assert_eq!(config.event_channel_capacity, 256);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = SessionConfig::from_toml(
            r#"
            identifier = "chat"
            trackers = ["wss://a.example", "wss://b.example"]

            [announce]
            numwant = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.identifier, "chat");
        assert_eq!(config.trackers.len(), 2);
        assert_eq!(config.announce.numwant, 10);
        assert_eq!(config.announce.uploaded, 0);
        assert_eq!(config.max_fragment_len, DEFAULT_MAX_FRAGMENT_LEN);
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(SessionConfig::load(None).unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.toml");
        let config = SessionConfig::new("files").with_trackers(["wss://t.example"]);

        config.save(&path).unwrap();
        assert_eq!(SessionConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SessionConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(SessionConfig::new("app").validate().is_ok());
        assert!(matches!(
            SessionConfig::default().validate(),
            Err(SessionError::Config(_))
        ));
        assert!(
            SessionConfig::new("app")
                .with_max_fragment_len(0)
                .validate()
                .is_err()
        );
        assert!(
            SessionConfig::new("app")
                .with_trackers(["wss://ok", " "])
                .validate()
                .is_err()
        );
    }
}
