//! Statistics Canada dialect: a whole-table service, not a query service.
//!
//! Flow ids are numeric product ids, validated before any network call.
//! Data arrives as one gzip full-table download per product; the decoded
//! table is cached whole under its product id and every narrower request
//! is sliced from the cached snapshot in memory, never re-fetched.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::{CacheKey, CacheResourceKind};
use crate::connector::json;
use crate::connector::{
    ConnFuture, Connection, ConnectionContext, ErrorTranslator, FeatureSet, PingReport,
    SeriesStream, StatusTranslator,
};
use crate::deferred::{unwrap_container, PollFailure};
use crate::drivers::{Driver, DriverProperties};
use crate::error::SdmxError;
use crate::refs::ResourceRef;
use crate::repository::{DataQuery, DataRepository, DataSet, DataStructure, Dataflow};
use crate::source::SourceDescriptor;
use crate::transport::{media, HttpRequest, HttpResponse};

pub const DRIVER_ID: &str = "statcan";

/// Detail shaping happens in memory; nothing optional goes on the wire.
const STATCAN_FEATURES: FeatureSet = FeatureSet::new(false, false, true, false);

#[derive(Debug, Default, Clone, Copy)]
pub struct StatCanDriver;

impl Driver for StatCanDriver {
    fn id(&self) -> &'static str {
        DRIVER_ID
    }

    fn default_sources(&self) -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new("STATCAN", DRIVER_ID, "https://www150.statcan.gc.ca/t1/wds/rest")
                .with_name("en", "Statistics Canada")
                .with_name("fr", "Statistique Canada")
                .with_monitor("https://www.statcan.gc.ca/en/developers"),
        ]
    }

    fn connect(
        &self,
        source: &SourceDescriptor,
        context: &ConnectionContext,
    ) -> Result<Box<dyn Connection>, SdmxError> {
        Ok(Box::new(TableConnector {
            source: source.clone(),
            context: context.clone(),
            properties: DriverProperties::from_source(source),
            translator: StatusTranslator,
        }))
    }
}

/// Cube list entry from the lightweight listing endpoint.
#[derive(Debug, Deserialize)]
struct RawCube {
    #[serde(rename = "productId")]
    product_id: u64,
    #[serde(rename = "cubeTitleEn")]
    title_en: Option<String>,
    #[serde(rename = "cubeTitleFr")]
    title_fr: Option<String>,
}

/// Whole-table connection: one download per product, sliced from cache.
struct TableConnector {
    source: SourceDescriptor,
    context: ConnectionContext,
    properties: DriverProperties,
    translator: StatusTranslator,
}

impl TableConnector {
    /// Numeric-only product ids are the dialect's declared shape; anything
    /// else fails before the network is touched.
    fn product_id<'r>(&self, flow: &'r ResourceRef) -> Result<&'r str, SdmxError> {
        let id = flow.id();
        if !id.is_empty() && id.bytes().all(|byte| byte.is_ascii_digit()) {
            Ok(id)
        } else {
            Err(SdmxError::Validation {
                source_id: self.source.id.clone(),
                message: format!("flow id must be a numeric product id: '{id}'"),
            })
        }
    }

    fn flows_resource(&self) -> ResourceRef {
        ResourceRef::new(Some(&self.source.id), "cubes", None).expect("'cubes' is a valid ref id")
    }

    async fn fetch(
        &self,
        path: &str,
        resource: &ResourceRef,
    ) -> Result<Option<HttpResponse>, SdmxError> {
        let request = HttpRequest::get(format!("{}{path}", self.source.endpoint))
            .with_accept(media::JSON)
            .with_accept(media::GZIP)
            .with_language(self.context.languages.to_header_value())
            .with_timeout(self.properties.read_timeout);
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

    async fn flows_snapshot(&self) -> Result<Arc<DataRepository>, SdmxError> {
        let key = CacheKey::new(
            self.source.id.clone(),
            self.context.languages.to_header_value(),
            CacheResourceKind::Flows,
        );
        if let Some(snapshot) = self.context.cache.get(&key).await {
            return Ok(snapshot);
        }

        let resource = self.flows_resource();
        let flows = match self.fetch("/getAllCubesListLite", &resource).await? {
            None => Vec::new(),
            Some(response) => {
                let cubes: Vec<RawCube> =
                    serde_json::from_slice(&response.body).map_err(|error| SdmxError::Decode {
                        source_id: self.source.id.clone(),
                        resource: resource.clone(),
                        message: error.to_string(),
                    })?;
                cubes
                    .iter()
                    .map(|cube| self.cube_to_flow(cube))
                    .collect::<Result<Vec<_>, _>>()?
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

    fn cube_to_flow(&self, cube: &RawCube) -> Result<Dataflow, SdmxError> {
        let product_id = cube.product_id.to_string();
        let ref_ = ResourceRef::new(Some(&self.source.id), &product_id, None)
            .map_err(SdmxError::Format)?;

        let mut titles = BTreeMap::new();
        if let Some(title) = &cube.title_en {
            titles.insert(String::from("en"), title.clone());
        }
        if let Some(title) = &cube.title_fr {
            titles.insert(String::from("fr"), title.clone());
        }
        let name = self
            .context
            .languages
            .select(&titles)
            .unwrap_or(&product_id)
            .to_owned();

        Ok(Dataflow::new(ref_.clone(), ref_, name))
    }

    /// The cached whole table for one product: flows, synthesized
    /// structure, and the full data set in one snapshot.
    async fn table_snapshot(&self, product_id: &str) -> Result<Arc<DataRepository>, SdmxError> {
        let key = CacheKey::new(
            self.source.id.clone(),
            self.context.languages.to_header_value(),
            CacheResourceKind::Table,
        )
        .with_item(product_id);
        if let Some(snapshot) = self.context.cache.get(&key).await {
            return Ok(snapshot);
        }

        let resource =
            ResourceRef::new(Some(&self.source.id), product_id, None).map_err(SdmxError::Format)?;
        let response = self
            .fetch(
                &format!("/getFullTableDownloadSDMX/{product_id}"),
                &resource,
            )
            .await?
            .ok_or_else(|| SdmxError::Transport {
                source_id: self.source.id.clone(),
                resource: resource.clone(),
                status: Some(404),
                message: format!("table {product_id} does not exist"),
                retryable: false,
            })?;

        let response = unwrap_container(response, media::JSON).map_err(|failure| match failure {
            PollFailure::Container { message } => SdmxError::Decode {
                source_id: self.source.id.clone(),
                resource: resource.clone(),
                message,
            },
            other => SdmxError::Decode {
                source_id: self.source.id.clone(),
                resource: resource.clone(),
                message: format!("{other:?}"),
            },
        })?;

        let (mut structure, mut data_set) =
            json::decode_table(&response.body, &self.context.languages).map_err(|error| {
                SdmxError::Decode {
                    source_id: self.source.id.clone(),
                    resource: resource.clone(),
                    message: error.to_string(),
                }
            })?;

        // The wire message names no flow; the product id is the identity.
        structure.ref_ = resource.clone();
        data_set.flow_ref = resource.clone();

        let flow = Dataflow::new(resource.clone(), resource.clone(), product_id.to_owned());
        let snapshot = Arc::new(
            DataRepository::builder(self.source.id.clone())
                .flow(flow)
                .structure(structure)
                .data_set(data_set)
                .build(),
        );
        self.context
            .cache
            .put(key, Arc::clone(&snapshot), self.properties.cache_ttl)
            .await;
        Ok(snapshot)
    }

    async fn data_slice(
        &self,
        flow: &ResourceRef,
        query: &DataQuery,
    ) -> Result<DataSet, SdmxError> {
        let product_id = self.product_id(flow)?;
        let snapshot = self.table_snapshot(product_id).await?;

        let series = snapshot
            .data_set(flow)
            .map(|data_set| data_set.query(query))
            .unwrap_or_default();
        Ok(DataSet::new(flow.clone(), query.key.clone(), series))
    }
}

impl Connection for TableConnector {
    fn features(&self) -> FeatureSet {
        STATCAN_FEATURES
    }

    fn get_flows<'a>(&'a self) -> ConnFuture<'a, Vec<Dataflow>> {
        Box::pin(async move { Ok(self.flows_snapshot().await?.flows.clone()) })
    }

    fn get_flow<'a>(&'a self, flow: &'a ResourceRef) -> ConnFuture<'a, Option<Dataflow>> {
        Box::pin(async move {
            self.product_id(flow)?;
            Ok(self.flows_snapshot().await?.flow(flow).cloned())
        })
    }

    fn get_structure<'a>(
        &'a self,
        structure: &'a ResourceRef,
    ) -> ConnFuture<'a, Option<DataStructure>> {
        Box::pin(async move {
            let product_id = self.product_id(structure)?;
            let snapshot = self.table_snapshot(product_id).await?;
            Ok(snapshot.structure(structure).cloned())
        })
    }

    fn get_data<'a>(
        &'a self,
        flow: &'a ResourceRef,
        query: &'a DataQuery,
    ) -> ConnFuture<'a, DataSet> {
        Box::pin(async move { self.data_slice(flow, query).await })
    }

    fn get_data_stream<'a>(
        &'a self,
        flow: &'a ResourceRef,
        query: &'a DataQuery,
    ) -> ConnFuture<'a, SeriesStream> {
        Box::pin(async move {
            let data_set = self.data_slice(flow, query).await?;
            Ok(Box::new(data_set.series.into_iter()) as SeriesStream)
        })
    }

    fn ping<'a>(&'a self) -> ConnFuture<'a, PingReport> {
        Box::pin(async move {
            let resource = self.flows_resource();
            let started = self.context.clock.now();
            let outcome = self.fetch("/getAllCubesListLite", &resource).await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemCache, SystemClock};
    use crate::language::LangPriority;
    use crate::transport::NoopHttpClient;

    fn connector() -> TableConnector {
        let source = StatCanDriver.default_sources().remove(0);
        TableConnector {
            properties: DriverProperties::from_source(&source),
            source,
            context: ConnectionContext {
                transport: Arc::new(NoopHttpClient),
                cache: MemCache::system(),
                clock: Arc::new(SystemClock),
                languages: LangPriority::parse("en").expect("must parse"),
            },
            translator: StatusTranslator,
        }
    }

    #[test]
    fn numeric_product_ids_pass_validation() {
        let connector = connector();
        let flow = ResourceRef::parse("17100005").expect("must parse");
        assert_eq!(connector.product_id(&flow).expect("valid"), "17100005");
    }

    #[test]
    fn non_numeric_flow_ids_fail_before_any_network_call() {
        let connector = connector();
        let flow = ResourceRef::parse("DF_17100005").expect("must parse");
        let err = connector.product_id(&flow).expect_err("must fail");
        assert!(matches!(err, SdmxError::Validation { .. }));
    }

    #[test]
    fn cube_titles_follow_the_language_preference() {
        let mut connector = connector();
        connector.context.languages = LangPriority::parse("fr").expect("must parse");

        let cube = RawCube {
            product_id: 17_100_005,
            title_en: Some(String::from("Population estimates")),
            title_fr: Some(String::from("Estimations de la population")),
        };
        let flow = connector.cube_to_flow(&cube).expect("must build");
        assert_eq!(flow.name, "Estimations de la population");
        assert_eq!(flow.ref_.id(), "17100005");
    }
}
