//! Config entry types
//!
//! A ConfigEntry represents one registered remote instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Source of the config entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntrySource {
    /// Configured via the UI wizard
    #[default]
    User,
    /// Imported from YAML config
    Import,
    /// mDNS/Bonjour discovery broadcast
    Zeroconf,
}

/// A configuration entry for one remote instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique identifier (ULID)
    pub entry_id: String,

    /// Integration domain
    pub domain: String,

    /// Human-readable display name
    pub title: String,

    /// Immutable connection data (host, port, token, ...)
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    /// User-configurable options written by the options flow
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,

    /// Unique identifier of the remote, for duplicate prevention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Origin type
    #[serde(default)]
    pub source: ConfigEntrySource,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl ConfigEntry {
    /// Create a new config entry
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entry_id: ulid::Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: HashMap::new(),
            options: HashMap::new(),
            unique_id: None,
            source: ConfigEntrySource::User,
            created_at: now,
            modified_at: now,
        }
    }

    /// Set entry data
    pub fn with_data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// Set entry options
    pub fn with_options(mut self, options: HashMap<String, serde_json::Value>) -> Self {
        self.options = options;
        self
    }

    /// Set unique_id
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// Set source
    pub fn with_source(mut self, source: ConfigEntrySource) -> Self {
        self.source = source;
        self
    }
}

/// Update data for a config entry
#[derive(Debug, Default)]
pub struct ConfigEntryUpdate {
    pub title: Option<String>,
    pub data: Option<HashMap<String, serde_json::Value>>,
    pub options: Option<HashMap<String, serde_json::Value>>,
}

impl ConfigEntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn options(mut self, options: HashMap<String, serde_json::Value>) -> Self {
        self.options = Some(options);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_entry_new() {
        let entry = ConfigEntry::new("remote_homeassistant", "Cabin");
        assert_eq!(entry.domain, "remote_homeassistant");
        assert_eq!(entry.title, "Cabin");
        assert_eq!(entry.source, ConfigEntrySource::User);
        assert!(!entry.entry_id.is_empty());
    }

    #[test]
    fn test_config_entry_builder() {
        let mut data = HashMap::new();
        data.insert("host".to_string(), serde_json::json!("192.168.1.20"));

        let entry = ConfigEntry::new("remote_homeassistant", "Cabin")
            .with_data(data)
            .with_unique_id("abc-123")
            .with_source(ConfigEntrySource::Zeroconf);

        assert_eq!(entry.unique_id, Some("abc-123".to_string()));
        assert_eq!(entry.source, ConfigEntrySource::Zeroconf);
        assert!(entry.data.contains_key("host"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let entry = ConfigEntry::new("remote_homeassistant", "Cabin")
            .with_unique_id("abc-123")
            .with_source(ConfigEntrySource::Import);

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: ConfigEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.title, "Cabin");
        assert_eq!(parsed.unique_id, Some("abc-123".to_string()));
        assert_eq!(parsed.source, ConfigEntrySource::Import);
    }
}
