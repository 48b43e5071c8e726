//! # statx-core
//!
//! Uniform client contracts for SDMX-speaking statistical agencies.
//!
//! ## Overview
//!
//! Many agencies expose slightly different, sometimes buggy, REST dialects
//! of SDMX. This crate provides one client abstraction over all of them:
//!
//! - **Identifier algebra** for agency/id/version references and
//!   multi-dimensional selection keys, with wildcard containment
//! - **Calendar durations and dated intervals** for observation periods
//! - **Immutable repository snapshots** of flows, structures, and series
//! - **Dialect drivers** composed from three strategies (query builder,
//!   response parser, feature set) plus an error translator
//! - **A TTL cache** keyed by logical identity to avoid repeated downloads
//! - **A bounded poll loop** for dialects that defer large responses
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`refs`] | Resource references and containment |
//! | [`key`] | Selection keys and the named-dimension builder |
//! | [`language`] | Accept-Language style priority lists |
//! | [`temporal`] | Calendar durations and time intervals |
//! | [`repository`] | Flows, structures, series, and query shaping |
//! | [`connector`] | Strategy traits and the generic REST connector |
//! | [`drivers`] | Built-in dialect drivers and the registry |
//! | [`cache`] | Clock seam and the TTL snapshot cache |
//! | [`deferred`] | Deferred-response detection and polling |
//! | [`transport`] | HTTP seam with reqwest and offline impls |
//! | [`manager`] | The facade tying registry, transport, and cache |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use statx_core::{DataDetail, DataQuery, Key, ResourceRef, SdmxManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SdmxManager::with_defaults();
//!     let connection = manager.connect("ECB")?;
//!
//!     let flow = ResourceRef::parse("ECB,EXR,1.0")?;
//!     let query = DataQuery::new(Key::parse("M.USD..SP00.A"), DataDetail::Full);
//!     let data = connection.get_data(&flow, &query).await?;
//!
//!     for series in &data.series {
//!         println!("{}: {} observations", series.key, series.obs.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  SdmxManager     │──── DriverRegistry (explicit, static)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐     ┌───────────────────────────────┐
//! │  Connection      │────▶│ QueryBuilder │ Parser │ Flags │
//! │  (RestConnector) │     │     one bundle per dialect    │
//! └────────┬─────────┘     └───────────────────────────────┘
//!          │                        ▲ quirks live here
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │  HttpClient seam │     │  MemCache (TTL)  │
//! │  (reqwest/noop)  │     │  + Clock seam    │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! Every dialect deviation is one isolated strategy override; the generic
//! connector has no per-source branches, which keeps the dialects
//! independently testable and independently failing.

pub mod cache;
pub mod connector;
pub mod deferred;
pub mod drivers;
pub mod error;
pub mod key;
pub mod language;
pub mod manager;
pub mod refs;
pub mod repository;
pub mod source;
pub mod temporal;
pub mod transport;

// Re-export commonly used types at crate root for convenience

// Identifier algebra
pub use key::{Key, KeyBuilder};
pub use refs::{ResourceRef, ALL_AGENCIES, LATEST_VERSION};

// Language preference
pub use language::LangPriority;

// Temporal model
pub use temporal::{Duration, TimeInterval, TimeUnit};

// Repository entities
pub use repository::{
    Attribute, Codelist, DataDetail, DataQuery, DataRepository, DataSet, DataStructure, Dataflow,
    Dimension, Obs, Series,
};

// Connector contract and strategies
pub use connector::{
    ConnFuture, Connection, ConnectionContext, ErrorTranslator, Feature, FeatureSet, PingReport,
    QueryBuilder, QueryContext, ResponseParser, RestConnector, SeriesStream,
};

// Drivers and registry
pub use drivers::{Driver, DriverProperties, DriverRegistry};

// Cache
pub use cache::{CacheKey, CacheResourceKind, Clock, MemCache, SystemClock};

// Deferred retrieval
pub use deferred::{DeferredInfo, PollPolicy};

// Errors
pub use error::{DecodeError, FormatError, SdmxError};

// Manager facade
pub use manager::{SdmxManager, SdmxManagerBuilder};

// Source catalog
pub use source::SourceDescriptor;

// Transport seam
pub use transport::{HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient};
