use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Media types exchanged with SDMX endpoints.
pub mod media {
    /// Current SDMX-JSON message family.
    pub const SDMX_JSON: &str = "application/vnd.sdmx.data+json";
    /// Plain JSON, served by legacy and agency-specific endpoints.
    pub const JSON: &str = "application/json";
    /// Gzip container used by bulk and deferred endpoints.
    pub const GZIP: &str = "application/x-gzip";

    /// Compares media types ignoring parameters (`;version=…`, charset).
    pub fn matches(left: &str, right: &str) -> bool {
        essence(left).eq_ignore_ascii_case(essence(right))
    }

    fn essence(media_type: &str) -> &str {
        media_type.split(';').next().unwrap_or(media_type).trim()
    }
}

/// HTTP request envelope handed to the transport seam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    /// Media types the caller can decode, in preference order.
    pub accept: Vec<String>,
    /// `Accept-Language` value derived from the caller's language priority.
    pub language: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept: Vec::new(),
            language: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_accept(mut self, media_type: impl Into<String>) -> Self {
        self.accept.push(media_type.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP response envelope returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub media_type: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            media_type: media::JSON.to_owned(),
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level failure, classified for the error translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract behind which every network round-trip happens.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Default no-op transport for deterministic offline tests.
#[derive(Debug, Default)]
pub struct NoopHttpClient;

impl HttpClient for NoopHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let _ = request;
        Box::pin(async move { Ok(HttpResponse::ok_json("{}")) })
    }
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("statx/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url).timeout(request.timeout);

            if !request.accept.is_empty() {
                builder = builder.header("accept", request.accept.join(","));
            }
            if let Some(language) = &request.language {
                builder = builder.header("accept-language", language);
            }

            let response = builder.send().await.map_err(|error| {
                if error.is_timeout() {
                    HttpError::new(format!("request timeout: {error}"))
                } else if error.is_connect() {
                    HttpError::new(format!("connection failed: {error}"))
                } else {
                    HttpError::non_retryable(format!("request failed: {error}"))
                }
            })?;

            let status = response.status().as_u16();
            let media_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_owned();
            let body = response
                .bytes()
                .await
                .map_err(|error| HttpError::new(format!("failed to read response body: {error}")))?
                .to_vec();

            Ok(HttpResponse {
                status,
                media_type,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_collects_negotiation_headers() {
        let request = HttpRequest::get("https://example.test/data")
            .with_accept(media::SDMX_JSON)
            .with_accept(media::JSON)
            .with_language("en,fr;q=0.800")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(request.accept.len(), 2);
        assert_eq!(request.language.as_deref(), Some("en,fr;q=0.800"));
        assert_eq!(request.timeout, Duration::from_secs(5));
    }

    #[test]
    fn media_type_match_ignores_parameters() {
        assert!(media::matches(
            "application/vnd.sdmx.data+json;version=2.0.0",
            media::SDMX_JSON
        ));
        assert!(media::matches("application/JSON; charset=utf-8", media::JSON));
        assert!(!media::matches(media::JSON, media::GZIP));
    }

    #[tokio::test]
    async fn noop_client_answers_empty_json() {
        let response = NoopHttpClient
            .execute(HttpRequest::get("https://example.test"))
            .await
            .expect("noop transport cannot fail");
        assert!(response.is_success());
        assert_eq!(response.media_type, media::JSON);
    }
}
