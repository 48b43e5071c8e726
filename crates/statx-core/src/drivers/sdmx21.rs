//! Reference SDMX 2.1 REST dialect, speaking the current SDMX-JSON layout.

use std::sync::Arc;

use crate::connector::json::SdmxJsonParser;
use crate::connector::{
    Connection, ConnectionContext, FeatureSet, QueryBuilder, QueryContext, RestConnector,
    StatusTranslator,
};
use crate::drivers::{Driver, DriverProperties};
use crate::error::SdmxError;
use crate::key::Key;
use crate::refs::ResourceRef;
use crate::repository::DataDetail;
use crate::source::SourceDescriptor;
use crate::transport::HttpRequest;

pub const DRIVER_ID: &str = "sdmx21";

/// Standard-conformant query construction.
///
/// Structure queries ask for `references=children` so codelists arrive in
/// the same message and dimensions can be coded without extra round-trips.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Sdmx21QueryBuilder;

impl Sdmx21QueryBuilder {
    fn resource_path(kind: &str, resource: &ResourceRef) -> String {
        format!(
            "/{kind}/{}/{}/{}",
            urlencoding::encode(resource.agency()),
            urlencoding::encode(resource.id()),
            urlencoding::encode(resource.version()),
        )
    }
}

impl QueryBuilder for Sdmx21QueryBuilder {
    fn flows_request(&self, ctx: &QueryContext) -> HttpRequest {
        ctx.request("/dataflow/all/all/latest")
    }

    fn flow_request(&self, ctx: &QueryContext, flow: &ResourceRef) -> HttpRequest {
        ctx.request(&Self::resource_path("dataflow", flow))
    }

    fn structure_request(&self, ctx: &QueryContext, structure: &ResourceRef) -> HttpRequest {
        let path = Self::resource_path("datastructure", structure);
        ctx.request(&format!("{path}?references=children"))
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
            path.push_str(detail.as_str());
        }
        ctx.request(&path)
    }

    fn codelist_request(&self, ctx: &QueryContext, codelist: &ResourceRef) -> HttpRequest {
        ctx.request(&Self::resource_path("codelist", codelist))
    }
}

/// Driver for agencies that follow the standard closely.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sdmx21Driver;

impl Driver for Sdmx21Driver {
    fn id(&self) -> &'static str {
        DRIVER_ID
    }

    fn default_sources(&self) -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new("ECB", DRIVER_ID, "https://data-api.ecb.europa.eu/service")
                .with_name("en", "European Central Bank")
                .with_name("fr", "Banque centrale européenne")
                .with_monitor("https://data.ecb.europa.eu/help/status"),
            SourceDescriptor::new("BIS", DRIVER_ID, "https://stats.bis.org/api/v1")
                .with_name("en", "Bank for International Settlements"),
            SourceDescriptor::new("ILO", DRIVER_ID, "https://sdmx.ilo.org/rest")
                .with_name("en", "International Labour Organization")
                .with_name("fr", "Organisation internationale du travail"),
            SourceDescriptor::new("IMF", DRIVER_ID, "https://sdmxcentral.imf.org/ws/public/sdmxapi/rest")
                .with_name("en", "International Monetary Fund"),
            SourceDescriptor::new("WB", DRIVER_ID, "https://api.worldbank.org/v2/sdmx/rest")
                .with_name("en", "World Bank"),
        ]
    }

    fn connect(
        &self,
        source: &SourceDescriptor,
        context: &ConnectionContext,
    ) -> Result<Box<dyn Connection>, SdmxError> {
        Ok(Box::new(RestConnector::new(
            source.clone(),
            Arc::new(Sdmx21QueryBuilder),
            Arc::new(SdmxJsonParser),
            Arc::new(StatusTranslator),
            FeatureSet::standard(),
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

    fn ctx() -> QueryContext {
        QueryContext::new(
            "https://data-api.ecb.europa.eu/service",
            LangPriority::parse("en").expect("must parse"),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn flows_url_lists_everything() {
        let request = Sdmx21QueryBuilder.flows_request(&ctx());
        assert_eq!(
            request.url,
            "https://data-api.ecb.europa.eu/service/dataflow/all/all/latest"
        );
        assert_eq!(request.language.as_deref(), Some("en"));
    }

    #[test]
    fn structure_url_pulls_children() {
        let structure = ResourceRef::of("ECB", "ECB_EXR1", "1.0").expect("must build");
        let request = Sdmx21QueryBuilder.structure_request(&ctx(), &structure);
        assert_eq!(
            request.url,
            "https://data-api.ecb.europa.eu/service/datastructure/ECB/ECB_EXR1/1.0?references=children"
        );
    }

    #[test]
    fn data_url_renders_flow_key_and_detail() {
        let flow = ResourceRef::of("ECB", "EXR", "1.0").expect("must build");
        let key = Key::of(["M", "USD"]);

        let full = Sdmx21QueryBuilder.data_request(&ctx(), &flow, &key, DataDetail::Full);
        assert_eq!(
            full.url,
            "https://data-api.ecb.europa.eu/service/data/ECB%2CEXR%2C1.0/M.USD/all"
        );

        let keys_only =
            Sdmx21QueryBuilder.data_request(&ctx(), &flow, &key, DataDetail::SeriesKeysOnly);
        assert!(keys_only.url.ends_with("?detail=serieskeysonly"));
    }

    #[test]
    fn data_url_accepts_the_all_keyword() {
        let flow = ResourceRef::parse("EXR").expect("must parse");
        let request = Sdmx21QueryBuilder.data_request(&ctx(), &flow, &Key::all(), DataDetail::Full);
        assert!(request.url.contains("/all/all"));
    }
}
