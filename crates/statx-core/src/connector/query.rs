use std::time::Duration;

use crate::key::Key;
use crate::language::LangPriority;
use crate::refs::ResourceRef;
use crate::repository::DataDetail;
use crate::transport::HttpRequest;

/// Everything a query builder needs besides the logical request: where to
/// send it, in which languages, and within which timeout.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub endpoint: String,
    pub languages: LangPriority,
    pub timeout: Duration,
}

impl QueryContext {
    pub fn new(endpoint: impl Into<String>, languages: LangPriority, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            languages,
            timeout,
        }
    }

    /// Starts a request against this context's endpoint with the language
    /// and timeout already applied.
    pub fn request(&self, path_and_query: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{}", self.endpoint, path_and_query))
            .with_language(self.languages.to_header_value())
            .with_timeout(self.timeout)
    }
}

/// Dialect strategy that turns a logical request into a transport request,
/// one method per resource kind.
///
/// Builders are pure: the same inputs produce the same request, and all
/// dialect-specific URL or parameter spelling lives here, never in the
/// generic connector.
pub trait QueryBuilder: Send + Sync {
    fn flows_request(&self, ctx: &QueryContext) -> HttpRequest;

    fn flow_request(&self, ctx: &QueryContext, flow: &ResourceRef) -> HttpRequest;

    fn structure_request(&self, ctx: &QueryContext, structure: &ResourceRef) -> HttpRequest;

    fn data_request(
        &self,
        ctx: &QueryContext,
        flow: &ResourceRef,
        key: &Key,
        detail: DataDetail,
    ) -> HttpRequest;

    fn codelist_request(&self, ctx: &QueryContext, codelist: &ResourceRef) -> HttpRequest;
}
