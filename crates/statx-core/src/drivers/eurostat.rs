//! Eurostat dialect: standard SDMX 2.1 queries, but large data volumes are
//! deferred behind a footer message and fetched through the follow-up poll
//! loop. The connector handles the polling; this driver only turns the
//! capability on and tunes the poll bounds.

use std::sync::Arc;

use crate::connector::json::SdmxJsonParser;
use crate::connector::{
    Connection, ConnectionContext, FeatureSet, RestConnector, StatusTranslator,
};
use crate::drivers::sdmx21::Sdmx21QueryBuilder;
use crate::drivers::{properties, Driver, DriverProperties};
use crate::error::SdmxError;
use crate::source::SourceDescriptor;

pub const DRIVER_ID: &str = "eurostat";

const EUROSTAT_FEATURES: FeatureSet = FeatureSet::new(true, true, true, true);

#[derive(Debug, Default, Clone, Copy)]
pub struct EurostatDriver;

impl Driver for EurostatDriver {
    fn id(&self) -> &'static str {
        DRIVER_ID
    }

    fn default_sources(&self) -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new(
                "ESTAT",
                DRIVER_ID,
                "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1",
            )
            .with_name("en", "Eurostat")
            .with_name("de", "Eurostat")
            .with_monitor("https://ec.europa.eu/eurostat/online-help/public/en/API_05_Availability_en")
            .with_property(properties::POLL_ATTEMPTS, "30")
            .with_property(properties::POLL_INTERVAL_MS, "10000"),
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
            EUROSTAT_FEATURES,
            context.clone(),
            DriverProperties::from_source(source),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::Feature;

    #[test]
    fn deferred_responses_are_declared() {
        assert!(EUROSTAT_FEATURES.supports(Feature::DeferredResponse));
        assert!(EUROSTAT_FEATURES.supports(Feature::SeriesKeysOnly));
    }

    #[test]
    fn default_source_tunes_the_poll_bounds() {
        let sources = EurostatDriver.default_sources();
        let estat = &sources[0];
        let resolved = DriverProperties::from_source(estat);
        assert_eq!(resolved.poll_attempts, 30);
        assert_eq!(resolved.poll_interval.as_millis(), 10_000);
    }
}
