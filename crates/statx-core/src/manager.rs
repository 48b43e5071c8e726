use std::sync::Arc;

use crate::cache::{Clock, MemCache, SystemClock};
use crate::connector::{Connection, ConnectionContext, PingReport};
use crate::drivers::DriverRegistry;
use crate::error::SdmxError;
use crate::language::LangPriority;
use crate::source::SourceDescriptor;
use crate::transport::{HttpClient, ReqwestHttpClient};

/// Entry point tying the driver registry to the transport, cache, clock,
/// and language seams.
///
/// One manager serves many sources; each [`SdmxManager::connect`] call
/// hands out an independent connection, safe to use concurrently with the
/// others. All connections share this manager's cache.
pub struct SdmxManager {
    registry: DriverRegistry,
    context: ConnectionContext,
    extra_sources: Vec<SourceDescriptor>,
}

impl SdmxManager {
    pub fn builder() -> SdmxManagerBuilder {
        SdmxManagerBuilder::new()
    }

    /// Built-in drivers over the production transport.
    pub fn with_defaults() -> Self {
        Self::builder().build()
    }

    /// Every source the registry and the custom list know about.
    pub fn sources(&self) -> Vec<SourceDescriptor> {
        let mut sources = self.registry.sources();
        sources.extend(self.extra_sources.iter().cloned());
        sources
    }

    pub fn languages(&self) -> &LangPriority {
        &self.context.languages
    }

    /// Resolves the source id to its dialect strategy bundle and builds a
    /// connection.
    pub fn connect(&self, source_id: &str) -> Result<Box<dyn Connection>, SdmxError> {
        if let Some(custom) = self
            .extra_sources
            .iter()
            .find(|source| source.id == source_id)
        {
            let driver =
                self.registry
                    .driver(&custom.driver)
                    .ok_or_else(|| SdmxError::UnknownDriver {
                        id: custom.driver.clone(),
                    })?;
            return driver.connect(custom, &self.context);
        }

        let (source, driver) =
            self.registry
                .find_source(source_id)
                .ok_or_else(|| SdmxError::UnknownSource {
                    id: source_id.to_owned(),
                })?;
        driver.connect(&source, &self.context)
    }

    /// Cheapest possible round-trip against one source.
    pub async fn ping(&self, source_id: &str) -> Result<PingReport, SdmxError> {
        self.connect(source_id)?.ping().await
    }
}

/// Explicit configuration for a manager; no global state is consulted.
pub struct SdmxManagerBuilder {
    registry: DriverRegistry,
    transport: Option<Arc<dyn HttpClient>>,
    cache: Option<MemCache>,
    clock: Arc<dyn Clock>,
    languages: LangPriority,
    extra_sources: Vec<SourceDescriptor>,
}

impl SdmxManagerBuilder {
    pub fn new() -> Self {
        Self {
            registry: DriverRegistry::builtin(),
            transport: None,
            cache: None,
            clock: Arc::new(SystemClock),
            languages: LangPriority::any(),
            extra_sources: Vec::new(),
        }
    }

    pub fn with_registry(mut self, registry: DriverRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpClient>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_cache(mut self, cache: MemCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_languages(mut self, languages: LangPriority) -> Self {
        self.languages = languages;
        self
    }

    /// Registers a source entry beyond the drivers' defaults; its `driver`
    /// field must name a registered driver at connect time.
    pub fn with_source(mut self, source: SourceDescriptor) -> Self {
        self.extra_sources.push(source);
        self
    }

    pub fn build(self) -> SdmxManager {
        let cache = self
            .cache
            .unwrap_or_else(|| MemCache::new(Arc::clone(&self.clock)));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()) as Arc<dyn HttpClient>);

        SdmxManager {
            registry: self.registry,
            context: ConnectionContext {
                transport,
                cache,
                clock: self.clock,
                languages: self.languages,
            },
            extra_sources: self.extra_sources,
        }
    }
}

impl Default for SdmxManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
