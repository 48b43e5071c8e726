use crate::error::SdmxError;
use crate::refs::ResourceRef;
use crate::transport::{HttpError, HttpResponse};

/// Dialect strategy that maps transport-level failures, including
/// non-success statuses, into typed errors carrying the offending resource
/// reference.
pub trait ErrorTranslator: Send + Sync {
    /// Whether a non-success status means "resource absent" for this
    /// dialect. Absent resources surface as empty results, not errors.
    fn is_missing(&self, status: u16) -> bool {
        status == 404
    }

    fn translate_error(
        &self,
        source: &str,
        resource: &ResourceRef,
        error: HttpError,
    ) -> SdmxError {
        SdmxError::Transport {
            source_id: source.to_owned(),
            resource: resource.clone(),
            status: None,
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }

    fn translate_status(
        &self,
        source: &str,
        resource: &ResourceRef,
        response: &HttpResponse,
    ) -> SdmxError {
        SdmxError::Transport {
            source_id: source.to_owned(),
            resource: resource.clone(),
            status: Some(response.status),
            message: format!("unexpected status {}", response.status),
            retryable: response.status >= 500 || response.status == 429,
        }
    }
}

/// Standard-conformant translation: 404 is missing, 5xx/429 retryable.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusTranslator;

impl ErrorTranslator for StatusTranslator {}

/// Translation for dialects that answer `400 Bad Request` for absent
/// resources instead of 404.
#[derive(Debug, Default, Clone, Copy)]
pub struct BadRequestMeansMissing;

impl ErrorTranslator for BadRequestMeansMissing {
    fn is_missing(&self, status: u16) -> bool {
        status == 404 || status == 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> ResourceRef {
        ResourceRef::parse("ECB,EXR,1.0").expect("must parse")
    }

    #[test]
    fn status_translation_carries_resource_and_source() {
        let response = HttpResponse {
            status: 503,
            media_type: String::from("text/plain"),
            body: Vec::new(),
        };
        let error = StatusTranslator.translate_status("ECB", &resource(), &response);

        match error {
            SdmxError::Transport {
                source_id,
                resource,
                status,
                retryable,
                ..
            } => {
                assert_eq!(source_id, "ECB");
                assert_eq!(resource.id(), "EXR");
                assert_eq!(status, Some(503));
                assert!(retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let response = HttpResponse {
            status: 401,
            media_type: String::from("text/plain"),
            body: Vec::new(),
        };
        match StatusTranslator.translate_status("ECB", &resource(), &response) {
            SdmxError::Transport { retryable, .. } => assert!(!retryable),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_status_is_dialect_specific() {
        assert!(StatusTranslator.is_missing(404));
        assert!(!StatusTranslator.is_missing(400));
        assert!(BadRequestMeansMissing.is_missing(400));
    }
}
