//! Dialect drivers and the explicit registry that indexes them.
//!
//! A driver bundles the strategies for one REST dialect, advertises its
//! default sources, and names the properties a source entry may tune. The
//! registry is populated from a static list at startup; there is no
//! runtime discovery.

mod dotstat;
mod eurostat;
mod insee;
mod sdmx21;
mod statcan;

pub use dotstat::{DotStatDriver, UisDriver};
pub use eurostat::EurostatDriver;
pub use insee::InseeDriver;
pub use sdmx21::Sdmx21Driver;
pub use statcan::StatCanDriver;

use std::sync::Arc;
use std::time::Duration;

use crate::connector::{Connection, ConnectionContext};
use crate::error::SdmxError;
use crate::source::SourceDescriptor;

/// Property keys a source entry may override.
pub mod properties {
    pub const CONNECT_TIMEOUT_MS: &str = "connect_timeout_ms";
    pub const READ_TIMEOUT_MS: &str = "read_timeout_ms";
    pub const CACHE_TTL_MS: &str = "cache_ttl_ms";
    pub const POLL_ATTEMPTS: &str = "poll_attempts";
    pub const POLL_INTERVAL_MS: &str = "poll_interval_ms";
    pub const REQUEST_DEADLINE_MS: &str = "request_deadline_ms";

    pub const ALL: [&str; 6] = [
        CONNECT_TIMEOUT_MS,
        READ_TIMEOUT_MS,
        CACHE_TTL_MS,
        POLL_ATTEMPTS,
        POLL_INTERVAL_MS,
        REQUEST_DEADLINE_MS,
    ];
}

/// Tunables every driver carries, overridable per source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverProperties {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub cache_ttl: Duration,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    pub request_deadline: Option<Duration>,
}

impl Default for DriverProperties {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(300),
            poll_attempts: 30,
            poll_interval: Duration::from_secs(10),
            request_deadline: None,
        }
    }
}

impl DriverProperties {
    /// Applies a source entry's declared property overrides; unparseable
    /// values keep the default and are logged, never fatal.
    pub fn from_source(source: &SourceDescriptor) -> Self {
        let mut resolved = Self::default();

        for (key, value) in &source.properties {
            let parsed = value.parse::<u64>();
            match (key.as_str(), parsed) {
                (properties::CONNECT_TIMEOUT_MS, Ok(ms)) => {
                    resolved.connect_timeout = Duration::from_millis(ms);
                }
                (properties::READ_TIMEOUT_MS, Ok(ms)) => {
                    resolved.read_timeout = Duration::from_millis(ms);
                }
                (properties::CACHE_TTL_MS, Ok(ms)) => {
                    resolved.cache_ttl = Duration::from_millis(ms);
                }
                (properties::POLL_ATTEMPTS, Ok(count)) => {
                    resolved.poll_attempts = count.min(u64::from(u32::MAX)) as u32;
                }
                (properties::POLL_INTERVAL_MS, Ok(ms)) => {
                    resolved.poll_interval = Duration::from_millis(ms);
                }
                (properties::REQUEST_DEADLINE_MS, Ok(ms)) => {
                    resolved.request_deadline = Some(Duration::from_millis(ms));
                }
                (key, Err(_)) if properties::ALL.contains(&key) => {
                    tracing::warn!(source = %source.id, key, value = %value, "unparseable property, keeping default");
                }
                _ => {}
            }
        }

        resolved
    }
}

/// One dialect's strategy bundle, source catalog, and tunables.
pub trait Driver: Send + Sync {
    /// Stable driver id a source entry names in its `driver` field.
    fn id(&self) -> &'static str;

    /// The sources this driver ships out of the box.
    fn default_sources(&self) -> Vec<SourceDescriptor>;

    /// Names of the properties this driver understands.
    fn properties(&self) -> &'static [&'static str] {
        &properties::ALL
    }

    /// Assembles a connection for one of this driver's sources.
    fn connect(
        &self,
        source: &SourceDescriptor,
        context: &ConnectionContext,
    ) -> Result<Box<dyn Connection>, SdmxError>;
}

/// Explicit driver index, populated at startup and injected where needed.
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: Vec<Arc<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new(drivers: Vec<Arc<dyn Driver>>) -> Self {
        Self { drivers }
    }

    /// All built-in dialect drivers.
    pub fn builtin() -> Self {
        Self::new(vec![
            Arc::new(Sdmx21Driver),
            Arc::new(DotStatDriver),
            Arc::new(UisDriver),
            Arc::new(EurostatDriver),
            Arc::new(InseeDriver),
            Arc::new(StatCanDriver),
        ])
    }

    pub fn driver(&self, id: &str) -> Option<&Arc<dyn Driver>> {
        self.drivers.iter().find(|driver| driver.id() == id)
    }

    /// The union of every driver's default sources, in driver order.
    pub fn sources(&self) -> Vec<SourceDescriptor> {
        self.drivers
            .iter()
            .flat_map(|driver| driver.default_sources())
            .collect()
    }

    /// Resolves a source id to its descriptor and dialect driver.
    pub fn find_source(&self, source_id: &str) -> Option<(SourceDescriptor, &Arc<dyn Driver>)> {
        self.drivers.iter().find_map(|driver| {
            driver
                .default_sources()
                .into_iter()
                .find(|source| source.id == source_id)
                .map(|source| (source, driver))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_exposes_all_default_sources() {
        let registry = DriverRegistry::builtin();
        let sources = registry.sources();

        // Eleven default sources across the six built-in dialects.
        assert_eq!(sources.len(), 11);
        for id in ["ECB", "BIS", "ILO", "IMF", "WB", "OECD", "ABS", "UIS", "ESTAT", "INSEE", "STATCAN"] {
            assert!(
                sources.iter().any(|source| source.id == id),
                "missing source {id}"
            );
        }
    }

    #[test]
    fn find_source_pairs_descriptor_with_its_driver() {
        let registry = DriverRegistry::builtin();
        let (source, driver) = registry.find_source("ECB").expect("ECB is built in");
        assert_eq!(source.driver, driver.id());
        assert!(registry.find_source("NOPE").is_none());
    }

    #[test]
    fn properties_resolve_from_source_overrides() {
        let source = SourceDescriptor::new("X", "sdmx21", "https://example.test")
            .with_property(properties::CACHE_TTL_MS, "60000")
            .with_property(properties::POLL_ATTEMPTS, "5")
            .with_property(properties::READ_TIMEOUT_MS, "not-a-number");

        let resolved = DriverProperties::from_source(&source);
        assert_eq!(resolved.cache_ttl, Duration::from_secs(60));
        assert_eq!(resolved.poll_attempts, 5);
        // Unparseable override keeps the default.
        assert_eq!(resolved.read_timeout, DriverProperties::default().read_timeout);
    }
}
