//! Bounded poll/retry loop for dialects that defer large responses.
//!
//! When a requested volume exceeds the agency's synchronous threshold, the
//! data response carries a footer message with a status code and a
//! follow-up URL instead of the payload. The helper here detects that
//! shape, polls the follow-up URL at a fixed interval within a bounded
//! attempt budget, and unwraps the gzip container the finished payload
//! arrives in.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::transport::{media, HttpClient, HttpRequest, HttpResponse};

/// Footer status signalling a deferred response.
const DEFERRED_STATUS: u16 = 413;

/// Statuses meaning "not ready yet" while polling.
const NOT_READY_STATUSES: [u16; 2] = [404, 202];

/// Follow-up coordinates extracted from a deferred-response footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredInfo {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct FooterMessage {
    footer: Option<Footer>,
}

#[derive(Debug, Deserialize)]
struct Footer {
    code: Option<u16>,
    url: Option<String>,
}

impl DeferredInfo {
    /// Recognizes the deferred-footer shape in a data response. Anything
    /// that is not a JSON body with a `footer.code` of 413 and a follow-up
    /// URL is not deferred.
    pub fn detect(response: &HttpResponse) -> Option<Self> {
        if !media::matches(&response.media_type, media::JSON)
            && !media::matches(&response.media_type, media::SDMX_JSON)
        {
            return None;
        }

        let message: FooterMessage = serde_json::from_slice(&response.body).ok()?;
        let footer = message.footer?;
        if footer.code? != DEFERRED_STATUS {
            return None;
        }

        footer.url.map(|url| Self { url })
    }
}

/// Tunable poll bounds; a driver property with fixed-interval semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum poll attempts before giving up.
    pub attempts: u32,
    /// Fixed sleep between attempts.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

/// Why a poll loop ended without a payload. The connector maps these onto
/// the public error type with the source and resource attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    /// Attempt budget exhausted while the source still answered "not ready".
    Timeout { attempts: u32 },
    /// The caller's overall deadline expired between polls.
    DeadlineExpired,
    /// A poll answered with a terminal transport failure.
    Terminal { status: Option<u16>, message: String },
    /// The finished payload's container could not be unwrapped.
    Container { message: String },
}

/// Polls a deferred response until the payload is ready.
///
/// "Not found yet" answers are retryable; any other failure is terminal.
/// The deadline is re-checked between polls, so the loop holds the caller
/// for at most `attempts × interval` and never past the deadline.
pub async fn poll(
    transport: &Arc<dyn HttpClient>,
    info: &DeferredInfo,
    policy: &PollPolicy,
    deadline: Option<Instant>,
    inner_media_type: &str,
) -> Result<HttpResponse, PollFailure> {
    for attempt in 1..=policy.attempts {
        if deadline.is_some_and(|limit| Instant::now() >= limit) {
            return Err(PollFailure::DeadlineExpired);
        }

        let request = HttpRequest::get(&info.url)
            .with_accept(media::GZIP)
            .with_accept(inner_media_type);
        match transport.execute(request).await {
            Ok(response) if response.is_success() => {
                return unwrap_container(response, inner_media_type);
            }
            Ok(response) if NOT_READY_STATUSES.contains(&response.status) => {
                tracing::debug!(url = %info.url, attempt, "deferred response not ready");
            }
            Ok(response) => {
                return Err(PollFailure::Terminal {
                    status: Some(response.status),
                    message: format!("unexpected status {}", response.status),
                });
            }
            Err(error) => {
                return Err(PollFailure::Terminal {
                    status: None,
                    message: error.message().to_owned(),
                });
            }
        }

        if attempt < policy.attempts && !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(PollFailure::Timeout {
        attempts: policy.attempts,
    })
}

/// Unwraps the gzip single-stream container into a plain decoded response
/// carrying the inner media type. Uncompressed payloads pass through.
pub(crate) fn unwrap_container(
    response: HttpResponse,
    inner_media_type: &str,
) -> Result<HttpResponse, PollFailure> {
    let is_gzip = media::matches(&response.media_type, media::GZIP)
        || response.body.starts_with(&[0x1f, 0x8b]);
    if !is_gzip {
        return Ok(response);
    }

    let mut decoded = Vec::new();
    flate2::read::GzDecoder::new(response.body.as_slice())
        .read_to_end(&mut decoded)
        .map_err(|error| PollFailure::Container {
            message: error.to_string(),
        })?;

    Ok(HttpResponse {
        status: response.status,
        media_type: inner_media_type.to_owned(),
        body: decoded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn detects_the_deferred_footer_shape() {
        let body = br#"{"footer": {"code": 413, "url": "https://example.test/async/42"}}"#;
        let response = HttpResponse::ok_json(body.to_vec());
        let info = DeferredInfo::detect(&response).expect("footer detected");
        assert_eq!(info.url, "https://example.test/async/42");
    }

    #[test]
    fn ignores_payloads_and_other_footers() {
        assert!(DeferredInfo::detect(&HttpResponse::ok_json(r#"{"data": {}}"#)).is_none());
        assert!(
            DeferredInfo::detect(&HttpResponse::ok_json(r#"{"footer": {"code": 500}}"#)).is_none()
        );

        let binary = HttpResponse {
            status: 200,
            media_type: String::from("application/x-gzip"),
            body: vec![0x1f, 0x8b],
        };
        assert!(DeferredInfo::detect(&binary).is_none());
    }

    #[test]
    fn container_unwrap_inflates_gzip_payloads() {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(br#"{"data": {}}"#).expect("encode");
        let compressed = encoder.finish().expect("finish");

        let response = HttpResponse {
            status: 200,
            media_type: String::from("application/x-gzip"),
            body: compressed,
        };
        let unwrapped = unwrap_container(response, media::JSON).expect("must unwrap");
        assert_eq!(unwrapped.media_type, media::JSON);
        assert_eq!(unwrapped.body, br#"{"data": {}}"#);
    }

    #[test]
    fn container_unwrap_passes_plain_payloads_through() {
        let response = HttpResponse::ok_json(r#"{"data": {}}"#);
        let unwrapped = unwrap_container(response.clone(), media::JSON).expect("must pass");
        assert_eq!(unwrapped, response);
    }
}
