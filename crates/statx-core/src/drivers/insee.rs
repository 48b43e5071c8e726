//! INSEE dialect: SDMX 2.1 with two legacy spellings.
//!
//! The detail parameter only exists in its historical uppercase form, and
//! every structure lives under the fixed `FR1` agency id whatever the flow
//! references. Both quirks are isolated here, in the query builder.

use std::sync::Arc;

use crate::connector::json::SdmxJsonParser;
use crate::connector::{
    Connection, ConnectionContext, FeatureSet, QueryBuilder, QueryContext, RestConnector,
    StatusTranslator,
};
use crate::drivers::sdmx21::Sdmx21QueryBuilder;
use crate::drivers::{Driver, DriverProperties};
use crate::error::SdmxError;
use crate::key::Key;
use crate::refs::ResourceRef;
use crate::repository::DataDetail;
use crate::source::SourceDescriptor;
use crate::transport::HttpRequest;

pub const DRIVER_ID: &str = "insee";

/// Everything optional works, it is only spelled differently.
const INSEE_FEATURES: FeatureSet = FeatureSet::new(true, true, true, false);

const INSEE_STRUCTURE_AGENCY: &str = "FR1";

#[derive(Debug, Default, Clone, Copy)]
struct InseeQueryBuilder {
    inner: Sdmx21QueryBuilder,
}

fn legacy_detail(detail: DataDetail) -> &'static str {
    match detail {
        DataDetail::Full => "FULL",
        DataDetail::DataOnly => "DATA_ONLY",
        DataDetail::SeriesKeysOnly => "SERIES_KEYS_ONLY",
        DataDetail::NoData => "NO_DATA",
    }
}

impl QueryBuilder for InseeQueryBuilder {
    fn flows_request(&self, ctx: &QueryContext) -> HttpRequest {
        self.inner.flows_request(ctx)
    }

    fn flow_request(&self, ctx: &QueryContext, flow: &ResourceRef) -> HttpRequest {
        self.inner.flow_request(ctx, flow)
    }

    fn structure_request(&self, ctx: &QueryContext, structure: &ResourceRef) -> HttpRequest {
        match ResourceRef::new(
            Some(INSEE_STRUCTURE_AGENCY),
            structure.id(),
            Some(structure.version()),
        ) {
            Ok(pinned) => self.inner.structure_request(ctx, &pinned),
            // The id came out of an already-valid reference.
            Err(_) => self.inner.structure_request(ctx, structure),
        }
    }

    fn data_request(
        &self,
        ctx: &QueryContext,
        flow: &ResourceRef,
        key: &Key,
        detail: DataDetail,
    ) -> HttpRequest {
        let mut path = format!(
            "/data/{}/{}/all",
            urlencoding::encode(&flow.to_string()),
            urlencoding::encode(&key.to_string()),
        );
        if detail != DataDetail::Full {
            path.push_str("?detail=");
            path.push_str(legacy_detail(detail));
        }
        ctx.request(&path)
    }

    fn codelist_request(&self, ctx: &QueryContext, codelist: &ResourceRef) -> HttpRequest {
        self.inner.codelist_request(ctx, codelist)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InseeDriver;

impl Driver for InseeDriver {
    fn id(&self) -> &'static str {
        DRIVER_ID
    }

    fn default_sources(&self) -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new("INSEE", DRIVER_ID, "https://api.insee.fr/series/sdmx")
                .with_name("en", "National Institute of Statistics and Economic Studies")
                .with_name("fr", "Institut national de la statistique et des études économiques")
                .with_monitor("https://api.insee.fr/status"),
        ]
    }

    fn connect(
        &self,
        source: &SourceDescriptor,
        context: &ConnectionContext,
    ) -> Result<Box<dyn Connection>, SdmxError> {
        Ok(Box::new(RestConnector::new(
            source.clone(),
            Arc::new(InseeQueryBuilder::default()),
            Arc::new(SdmxJsonParser),
            Arc::new(StatusTranslator),
            INSEE_FEATURES,
            context.clone(),
            DriverProperties::from_source(source),
        )))
    }
}
