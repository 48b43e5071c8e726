use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::language::LangPriority;

/// Static catalog entry for one statistical agency endpoint.
///
/// Descriptors are data only — the driver named by `driver` interprets the
/// endpoint and the declared properties when it builds a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Stable source id, conventionally the agency's short name.
    pub id: String,
    /// Id of the dialect driver that understands this endpoint.
    pub driver: String,
    /// REST endpoint base, without a trailing slash.
    pub endpoint: String,
    /// Localized display names keyed by language tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub names: BTreeMap<String, String>,
    /// Public status/monitoring page, when the agency has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<String>,
    /// Declared property overrides, interpreted by the driver
    /// (timeouts, cache TTL, poll attempts…).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl SourceDescriptor {
    pub fn new(
        id: impl Into<String>,
        driver: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            driver: driver.into(),
            endpoint: endpoint.into(),
            names: BTreeMap::new(),
            monitor: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, language: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(language.into(), name.into());
        self
    }

    pub fn with_monitor(mut self, monitor: impl Into<String>) -> Self {
        self.monitor = Some(monitor.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Best display name for the given language preference, falling back to
    /// the source id.
    pub fn display_name(&self, languages: &LangPriority) -> &str {
        languages.select(&self.names).unwrap_or(&self.id)
    }
}
