//! Legacy SDMX 2.0 "DotStat" dialect.
//!
//! DotStat installations predate the 2.1 REST surface: resource paths use
//! the `Get…` verb forms, the `all` keyword is rejected in the key
//! position, and no detail parameter is honored — the connector downgrades
//! every narrowed request to a full fetch and filters client-side.

use std::sync::Arc;

use crate::connector::json::LegacyJsonParser;
use crate::connector::{
    BadRequestMeansMissing, Connection, ConnectionContext, FeatureSet, QueryBuilder, QueryContext,
    RestConnector,
};
use crate::drivers::{Driver, DriverProperties};
use crate::error::SdmxError;
use crate::key::Key;
use crate::refs::ResourceRef;
use crate::repository::DataDetail;
use crate::source::SourceDescriptor;
use crate::transport::HttpRequest;

pub const DRIVER_ID: &str = "dotstat";
pub const UIS_DRIVER_ID: &str = "uis";

/// Nothing optional is supported: no detail, no series-keys-only, no `all`
/// keyword, no deferral.
const DOTSTAT_FEATURES: FeatureSet = FeatureSet::new(false, false, false, false);

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DotStatQueryBuilder;

impl QueryBuilder for DotStatQueryBuilder {
    fn flows_request(&self, ctx: &QueryContext) -> HttpRequest {
        ctx.request("/GetDataflows")
    }

    fn flow_request(&self, ctx: &QueryContext, flow: &ResourceRef) -> HttpRequest {
        ctx.request(&format!(
            "/GetDataflow/{}/{}",
            urlencoding::encode(flow.id()),
            urlencoding::encode(flow.agency()),
        ))
    }

    fn structure_request(&self, ctx: &QueryContext, structure: &ResourceRef) -> HttpRequest {
        ctx.request(&format!(
            "/GetDataStructure/{}/{}",
            urlencoding::encode(structure.id()),
            urlencoding::encode(structure.agency()),
        ))
    }

    fn data_request(
        &self,
        ctx: &QueryContext,
        flow: &ResourceRef,
        key: &Key,
        _detail: DataDetail,
    ) -> HttpRequest {
        // The detail level is ignored by design: this dialect has no detail
        // parameter, and the connector never asks for one.
        ctx.request(&format!(
            "/GetData/{}/{}/{}",
            urlencoding::encode(flow.id()),
            urlencoding::encode(&key.to_string()),
            urlencoding::encode(flow.agency()),
        ))
    }

    fn codelist_request(&self, ctx: &QueryContext, codelist: &ResourceRef) -> HttpRequest {
        ctx.request(&format!(
            "/GetCodeList/{}/{}",
            urlencoding::encode(codelist.id()),
            urlencoding::encode(codelist.agency()),
        ))
    }
}

/// Driver for plain DotStat installations.
#[derive(Debug, Default, Clone, Copy)]
pub struct DotStatDriver;

impl Driver for DotStatDriver {
    fn id(&self) -> &'static str {
        DRIVER_ID
    }

    fn default_sources(&self) -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new("OECD", DRIVER_ID, "https://stats.oecd.org/restsdmx/sdmx.ashx")
                .with_name("en", "Organisation for Economic Co-operation and Development")
                .with_name("fr", "Organisation de coopération et de développement économiques")
                .with_monitor("https://status.oecd.org"),
            SourceDescriptor::new("ABS", DRIVER_ID, "https://stat.data.abs.gov.au/restsdmx/sdmx.ashx")
                .with_name("en", "Australian Bureau of Statistics"),
        ]
    }

    fn connect(
        &self,
        source: &SourceDescriptor,
        context: &ConnectionContext,
    ) -> Result<Box<dyn Connection>, SdmxError> {
        Ok(Box::new(RestConnector::new(
            source.clone(),
            Arc::new(DotStatQueryBuilder),
            Arc::new(LegacyJsonParser),
            Arc::new(BadRequestMeansMissing),
            DOTSTAT_FEATURES,
            context.clone(),
            DriverProperties::from_source(source),
        )))
    }
}

/// UIS quirk: structures are hosted under the fixed `UNESCO` agency id
/// regardless of what the flow references, so only the structure request
/// differs from plain DotStat.
#[derive(Debug, Default, Clone, Copy)]
struct UisQueryBuilder {
    inner: DotStatQueryBuilder,
}

const UIS_STRUCTURE_AGENCY: &str = "UNESCO";

impl QueryBuilder for UisQueryBuilder {
    fn flows_request(&self, ctx: &QueryContext) -> HttpRequest {
        self.inner.flows_request(ctx)
    }

    fn flow_request(&self, ctx: &QueryContext, flow: &ResourceRef) -> HttpRequest {
        self.inner.flow_request(ctx, flow)
    }

    fn structure_request(&self, ctx: &QueryContext, structure: &ResourceRef) -> HttpRequest {
        match ResourceRef::new(
            Some(UIS_STRUCTURE_AGENCY),
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
        self.inner.data_request(ctx, flow, key, detail)
    }

    fn codelist_request(&self, ctx: &QueryContext, codelist: &ResourceRef) -> HttpRequest {
        self.inner.codelist_request(ctx, codelist)
    }
}

/// UNESCO Institute for Statistics: DotStat with the pinned structure
/// agency.
#[derive(Debug, Default, Clone, Copy)]
pub struct UisDriver;

impl Driver for UisDriver {
    fn id(&self) -> &'static str {
        UIS_DRIVER_ID
    }

    fn default_sources(&self) -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new("UIS", UIS_DRIVER_ID, "https://api.uis.unesco.org/sdmx")
                .with_name("en", "UNESCO Institute for Statistics")
                .with_name("fr", "Institut de statistique de l'UNESCO"),
        ]
    }

    fn connect(
        &self,
        source: &SourceDescriptor,
        context: &ConnectionContext,
    ) -> Result<Box<dyn Connection>, SdmxError> {
        Ok(Box::new(RestConnector::new(
            source.clone(),
            Arc::new(UisQueryBuilder::default()),
            Arc::new(LegacyJsonParser),
            Arc::new(BadRequestMeansMissing),
            DOTSTAT_FEATURES,
            context.clone(),
            DriverProperties::from_source(source),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LangPriority;
    use std::time::Duration;

    fn ctx(endpoint: &str) -> QueryContext {
        QueryContext::new(
            endpoint,
            LangPriority::parse("en").expect("must parse"),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn data_url_uses_verb_paths_and_ignores_detail() {
        let flow = ResourceRef::of("OECD", "MEI", "1.0").expect("must build");
        let key = Key::of(["AUS", "", "M"]);
        let context = ctx("https://stats.oecd.org/restsdmx/sdmx.ashx");

        let full = DotStatQueryBuilder.data_request(&context, &flow, &key, DataDetail::Full);
        let keys_only =
            DotStatQueryBuilder.data_request(&context, &flow, &key, DataDetail::SeriesKeysOnly);

        assert_eq!(
            full.url,
            "https://stats.oecd.org/restsdmx/sdmx.ashx/GetData/MEI/AUS..M/OECD"
        );
        // No detail parameter exists in this dialect, whatever was asked.
        assert_eq!(full.url, keys_only.url);
    }

    #[test]
    fn features_declare_nothing_optional() {
        assert_eq!(DOTSTAT_FEATURES.supported(), Vec::<&str>::new());
    }

    #[test]
    fn uis_pins_the_structure_agency() {
        let structure = ResourceRef::of("all", "EDU_NON_FINANCE", "latest").expect("must build");
        let context = ctx("https://api.uis.unesco.org/sdmx");

        let request = UisQueryBuilder::default().structure_request(&context, &structure);
        assert_eq!(
            request.url,
            "https://api.uis.unesco.org/sdmx/GetDataStructure/EDU_NON_FINANCE/UNESCO"
        );

        // Every other resource kind stays plain DotStat.
        let flow = ResourceRef::of("UNESCO", "EDU_NON_FINANCE", "1.0").expect("must build");
        let data = UisQueryBuilder::default().data_request(
            &context,
            &flow,
            &Key::of(["DT", "ALL"]),
            DataDetail::Full,
        );
        assert!(data.url.contains("/GetData/EDU_NON_FINANCE/DT.ALL/UNESCO"));
    }
}
