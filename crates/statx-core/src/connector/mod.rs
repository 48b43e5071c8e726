//! The source-agnostic connection contract and the generic REST connector.
//!
//! A dialect contributes three strategies — query builder, response parser,
//! feature set — plus an error translator. [`RestConnector`] composes them
//! with the transport, cache, and clock seams; every quirk lives in a
//! strategy implementation, never in a branch here.

mod features;
pub mod json;
mod parser;
mod query;
mod translate;

pub use features::{Feature, FeatureSet};
pub use parser::ResponseParser;
pub use query::{QueryBuilder, QueryContext};
pub use translate::{BadRequestMeansMissing, ErrorTranslator, StatusTranslator};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheKey, CacheResourceKind, Clock, MemCache};
use crate::deferred::{self, DeferredInfo, PollFailure, PollPolicy};
use crate::drivers::DriverProperties;
use crate::error::SdmxError;
use crate::key::Key;
use crate::language::LangPriority;
use crate::refs::ResourceRef;
use crate::repository::{
    Codelist, DataQuery, DataRepository, DataSet, DataStructure, Dataflow, Series,
};
use crate::source::SourceDescriptor;
use crate::transport::{HttpClient, HttpRequest, HttpResponse};

/// Boxed future returned by connection methods.
pub type ConnFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SdmxError>> + Send + 'a>>;

/// Ordered series iterator handed out by [`Connection::get_data_stream`].
pub type SeriesStream = Box<dyn Iterator<Item = Series> + Send>;

/// Outcome of the cheapest possible round-trip against a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingReport {
    pub source: String,
    pub elapsed: Duration,
}

/// Shared collaborators a driver needs to assemble a connection.
#[derive(Clone)]
pub struct ConnectionContext {
    pub transport: Arc<dyn HttpClient>,
    pub cache: MemCache,
    pub clock: Arc<dyn Clock>,
    pub languages: LangPriority,
}

/// One source's uniform client surface.
///
/// Implementations are safe to share across tasks; one connection serves
/// one logical request at a time from the caller's perspective, while
/// distinct connections fan out concurrently.
pub trait Connection: Send + Sync {
    /// Capabilities the underlying dialect actually supports.
    fn features(&self) -> FeatureSet;

    fn get_flows<'a>(&'a self) -> ConnFuture<'a, Vec<Dataflow>>;

    /// Absent flows are an empty result, not an error.
    fn get_flow<'a>(&'a self, flow: &'a ResourceRef) -> ConnFuture<'a, Option<Dataflow>>;

    fn get_structure<'a>(
        &'a self,
        structure: &'a ResourceRef,
    ) -> ConnFuture<'a, Option<DataStructure>>;

    fn get_data<'a>(
        &'a self,
        flow: &'a ResourceRef,
        query: &'a DataQuery,
    ) -> ConnFuture<'a, DataSet>;

    /// Series in wire order; callers needing a different order sort
    /// explicitly.
    fn get_data_stream<'a>(
        &'a self,
        flow: &'a ResourceRef,
        query: &'a DataQuery,
    ) -> ConnFuture<'a, SeriesStream>;

    /// Cheapest possible round-trip (list flows), timed on the clock seam.
    fn ping<'a>(&'a self) -> ConnFuture<'a, PingReport>;
}

/// Generic REST connector over a dialect's strategy bundle.
pub struct RestConnector {
    source: SourceDescriptor,
    query_builder: Arc<dyn QueryBuilder>,
    parser: Arc<dyn ResponseParser>,
    translator: Arc<dyn ErrorTranslator>,
    features: FeatureSet,
    context: ConnectionContext,
    properties: DriverProperties,
}

impl RestConnector {
    pub fn new(
        source: SourceDescriptor,
        query_builder: Arc<dyn QueryBuilder>,
        parser: Arc<dyn ResponseParser>,
        translator: Arc<dyn ErrorTranslator>,
        features: FeatureSet,
        context: ConnectionContext,
        properties: DriverProperties,
    ) -> Self {
        Self {
            source,
            query_builder,
            parser,
            translator,
            features,
            context,
            properties,
        }
    }

    fn query_context(&self) -> QueryContext {
        QueryContext::new(
            self.source.endpoint.clone(),
            self.context.languages.clone(),
            self.properties.read_timeout,
        )
    }

    fn cache_key(&self, kind: CacheResourceKind) -> CacheKey {
        CacheKey::new(
            self.source.id.clone(),
            self.context.languages.to_header_value(),
            kind,
        )
    }

    /// Resource stand-in for listing operations.
    fn flows_resource(&self) -> ResourceRef {
        ResourceRef::new(Some(&self.source.id), "dataflows", None)
            .expect("'dataflows' is a valid ref id")
    }

    /// Issues a request and applies the dialect's error translation.
    /// `Ok(None)` is the missing-resource outcome.
    async fn fetch(
        &self,
        mut request: HttpRequest,
        resource: &ResourceRef,
    ) -> Result<Option<HttpResponse>, SdmxError> {
        for media_type in self.parser.accepted_media_types() {
            request = request.with_accept(*media_type);
        }
        tracing::debug!(source = %self.source.id, url = %request.url, "query");

        let response = self
            .context
            .transport
            .execute(request)
            .await
            .map_err(|error| {
                self.translator
                    .translate_error(&self.source.id, resource, error)
            })?;

        if !response.is_success() {
            if self.translator.is_missing(response.status) {
                return Ok(None);
            }
            return Err(self
                .translator
                .translate_status(&self.source.id, resource, &response));
        }

        Ok(Some(response))
    }

    fn check_media_type(&self, response: &HttpResponse) -> Result<(), SdmxError> {
        if self.parser.accepts(&response.media_type) {
            Ok(())
        } else {
            Err(SdmxError::UnexpectedContentType {
                source_id: self.source.id.clone(),
                media_type: response.media_type.clone(),
            })
        }
    }

    fn decode_failure(&self, resource: &ResourceRef, message: String) -> SdmxError {
        SdmxError::Decode {
            source_id: self.source.id.clone(),
            resource: resource.clone(),
            message,
        }
    }

    async fn flows_snapshot(&self) -> Result<Arc<DataRepository>, SdmxError> {
        let key = self.cache_key(CacheResourceKind::Flows);
        if let Some(snapshot) = self.context.cache.get(&key).await {
            return Ok(snapshot);
        }

        let resource = self.flows_resource();
        let request = self.query_builder.flows_request(&self.query_context());
        let flows = match self.fetch(request, &resource).await? {
            None => Vec::new(),
            Some(response) => {
                self.check_media_type(&response)?;
                self.parser
                    .parse_flows(&response.body, &self.context.languages)
                    .map_err(|error| self.decode_failure(&resource, error.to_string()))?
            }
        };

        let snapshot = Arc::new(
            DataRepository::builder(self.source.id.clone())
                .flows(flows)
                .build(),
        );
        self.context
            .cache
            .put(key, Arc::clone(&snapshot), self.properties.cache_ttl)
            .await;
        Ok(snapshot)
    }

    async fn flow_lookup(&self, flow: &ResourceRef) -> Result<Option<Dataflow>, SdmxError> {
        // The flows listing is cached; slice it before asking the network
        // for a single flow.
        let key = self.cache_key(CacheResourceKind::Flows);
        if let Some(snapshot) = self.context.cache.get(&key).await {
            if let Some(found) = snapshot.flow(flow) {
                return Ok(Some(found.clone()));
            }
        }

        let request = self
            .query_builder
            .flow_request(&self.query_context(), flow);
        match self.fetch(request, flow).await? {
            None => Ok(None),
            Some(response) => {
                self.check_media_type(&response)?;
                self.parser
                    .parse_flow(&response.body, &self.context.languages)
                    .map_err(|error| self.decode_failure(flow, error.to_string()))
            }
        }
    }

    async fn structure_lookup(
        &self,
        structure: &ResourceRef,
    ) -> Result<Option<DataStructure>, SdmxError> {
        let key = self
            .cache_key(CacheResourceKind::Structure)
            .with_item(structure.to_string());
        if let Some(snapshot) = self.context.cache.get(&key).await {
            return Ok(snapshot.structure(structure).cloned());
        }

        let request = self
            .query_builder
            .structure_request(&self.query_context(), structure);
        let decoded = match self.fetch(request, structure).await? {
            None => None,
            Some(response) => {
                self.check_media_type(&response)?;
                self.parser
                    .parse_structure(&response.body, &self.context.languages)
                    .map_err(|error| self.decode_failure(structure, error.to_string()))?
            }
        };

        if let Some(found) = &decoded {
            let snapshot = Arc::new(
                DataRepository::builder(self.source.id.clone())
                    .structure(found.clone())
                    .build(),
            );
            self.context
                .cache
                .put(key, snapshot, self.properties.cache_ttl)
                .await;
        }
        Ok(decoded)
    }

    /// Downgrades the requested detail to what the dialect can honor
    /// server-side; the remainder is shaped client-side after parsing.
    fn wire_detail(&self, query: &DataQuery) -> crate::repository::DataDetail {
        use crate::repository::DataDetail;

        let requested = query.detail;
        if requested == DataDetail::Full {
            return requested;
        }
        if !self.features.supports(Feature::DetailFilter) {
            tracing::warn!(
                source = %self.source.id,
                detail = requested.as_str(),
                "dialect has no detail filter, downgrading to a full fetch"
            );
            return DataDetail::Full;
        }
        if requested == DataDetail::SeriesKeysOnly
            && !self.features.supports(Feature::SeriesKeysOnly)
        {
            tracing::warn!(
                source = %self.source.id,
                "dialect lacks serieskeysonly, downgrading to a full fetch"
            );
            return DataDetail::Full;
        }
        requested
    }

    /// Renders the wildcard key for dialects that reject the `all`
    /// keyword: the key expands to one empty segment per structure
    /// dimension.
    async fn wire_key(&self, flow: &ResourceRef, query: &DataQuery) -> Result<Key, SdmxError> {
        if !query.key.is_all() || self.features.supports(Feature::AllKeyword) {
            return Ok(query.key.clone());
        }

        if let Some(dataflow) = self.flow_lookup(flow).await? {
            if let Some(structure) = self.structure_lookup(&dataflow.structure_ref).await? {
                let dimensions = structure.dimensions.len().max(1);
                return Ok(Key::of(vec![String::new(); dimensions]));
            }
        }

        tracing::warn!(
            source = %self.source.id,
            flow = %flow,
            "cannot expand wildcard key without a structure, sending as-is"
        );
        Ok(query.key.clone())
    }

    /// Fetches one codelist directly, for sources whose structure messages
    /// do not embed their codelists.
    pub async fn get_codelist(
        &self,
        codelist: &ResourceRef,
    ) -> Result<Option<Codelist>, SdmxError> {
        let request = self
            .query_builder
            .codelist_request(&self.query_context(), codelist);
        match self.fetch(request, codelist).await? {
            None => Ok(None),
            Some(response) => {
                self.check_media_type(&response)?;
                self.parser
                    .parse_codelist(&response.body, &self.context.languages)
                    .map_err(|error| self.decode_failure(codelist, error.to_string()))
            }
        }
    }

    async fn data_fetch(&self, flow: &ResourceRef, query: &DataQuery) -> Result<DataSet, SdmxError> {
        let wire_detail = self.wire_detail(query);
        let wire_key = self.wire_key(flow, query).await?;

        let request =
            self.query_builder
                .data_request(&self.query_context(), flow, &wire_key, wire_detail);
        let response = match self.fetch(request, flow).await? {
            None => return Ok(DataSet::new(flow.clone(), query.key.clone(), Vec::new())),
            Some(response) => response,
        };

        let response = if self.features.supports(Feature::DeferredResponse) {
            match DeferredInfo::detect(&response) {
                Some(info) => self.poll_deferred(flow, &info).await?,
                None => response,
            }
        } else {
            response
        };

        self.check_media_type(&response)?;
        let decoded = self
            .parser
            .parse_data(&response.body, &self.context.languages)
            .map_err(|error| self.decode_failure(flow, error.to_string()))?;

        // Client-side shaping enforces the requested key and detail even
        // when the server over-returns or a downgrade widened the fetch.
        let series = decoded.query(query);
        Ok(DataSet::new(flow.clone(), query.key.clone(), series))
    }

    async fn poll_deferred(
        &self,
        flow: &ResourceRef,
        info: &DeferredInfo,
    ) -> Result<HttpResponse, SdmxError> {
        tracing::warn!(
            source = %self.source.id,
            flow = %flow,
            url = %info.url,
            "response deferred, polling follow-up URL"
        );

        let policy = PollPolicy {
            attempts: self.properties.poll_attempts,
            interval: self.properties.poll_interval,
        };
        let deadline = self
            .properties
            .request_deadline
            .map(|deadline| Instant::now() + deadline);
        let inner = self
            .parser
            .accepted_media_types()
            .first()
            .copied()
            .unwrap_or(crate::transport::media::JSON);

        deferred::poll(&self.context.transport, info, &policy, deadline, inner)
            .await
            .map_err(|failure| match failure {
                PollFailure::Timeout { attempts } => SdmxError::DeferredTimeout {
                    source_id: self.source.id.clone(),
                    resource: flow.clone(),
                    attempts,
                },
                PollFailure::DeadlineExpired => SdmxError::DeadlineExpired {
                    source_id: self.source.id.clone(),
                    resource: flow.clone(),
                },
                PollFailure::Terminal { status, message } => SdmxError::Transport {
                    source_id: self.source.id.clone(),
                    resource: flow.clone(),
                    status,
                    message,
                    retryable: false,
                },
                PollFailure::Container { message } => {
                    self.decode_failure(flow, message)
                }
            })
    }
}

impl Connection for RestConnector {
    fn features(&self) -> FeatureSet {
        self.features
    }

    fn get_flows<'a>(&'a self) -> ConnFuture<'a, Vec<Dataflow>> {
        Box::pin(async move { Ok(self.flows_snapshot().await?.flows.clone()) })
    }

    fn get_flow<'a>(&'a self, flow: &'a ResourceRef) -> ConnFuture<'a, Option<Dataflow>> {
        Box::pin(async move { self.flow_lookup(flow).await })
    }

    fn get_structure<'a>(
        &'a self,
        structure: &'a ResourceRef,
    ) -> ConnFuture<'a, Option<DataStructure>> {
        Box::pin(async move { self.structure_lookup(structure).await })
    }

    fn get_data<'a>(
        &'a self,
        flow: &'a ResourceRef,
        query: &'a DataQuery,
    ) -> ConnFuture<'a, DataSet> {
        Box::pin(async move { self.data_fetch(flow, query).await })
    }

    fn get_data_stream<'a>(
        &'a self,
        flow: &'a ResourceRef,
        query: &'a DataQuery,
    ) -> ConnFuture<'a, SeriesStream> {
        Box::pin(async move {
            let data_set = self.data_fetch(flow, query).await?;
            Ok(Box::new(data_set.series.into_iter()) as SeriesStream)
        })
    }

    fn ping<'a>(&'a self) -> ConnFuture<'a, PingReport> {
        Box::pin(async move {
            let resource = self.flows_resource();
            let request = self.query_builder.flows_request(&self.query_context());

            let started = self.context.clock.now();
            let outcome = self.fetch(request, &resource).await;
            let elapsed = (self.context.clock.now() - started)
                .try_into()
                .unwrap_or(Duration::ZERO);

            outcome?;
            Ok(PingReport {
                source: self.source.id.clone(),
                elapsed,
            })
        })
    }
}
