use thiserror::Error;

use crate::refs::ResourceRef;

/// Parse-time failures for identifiers, keys, durations, and intervals.
///
/// These are always surfaced synchronously, before any network call, and are
/// never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("resource reference cannot be empty")]
    EmptyRef,
    #[error("resource reference has {count} fields, expected at most 3")]
    RefFieldCount { count: usize },
    #[error("resource id cannot be empty")]
    EmptyRefId,
    #[error("resource id must not contain ',': '{id}'")]
    RefIdContainsSeparator { id: String },

    #[error("unknown dimension id '{id}'")]
    UnknownDimension { id: String },

    #[error("duration must start with 'P': '{value}'")]
    DurationMissingPrefix { value: String },
    #[error("duration has no components: '{value}'")]
    DurationEmpty { value: String },
    #[error("unexpected character '{ch}' in duration '{value}'")]
    DurationUnexpectedChar { ch: char, value: String },
    #[error("designator '{designator}' repeated or out of order in duration '{value}'")]
    DurationDesignatorOrder { designator: char, value: String },
    #[error("week durations cannot carry other date or time components: '{value}'")]
    DurationMixedWeeks { value: String },
    #[error("duration component out of range: '{value}'")]
    DurationOverflow { value: String },

    #[error("time interval must end in a '/duration' suffix: '{value}'")]
    IntervalMissingDuration { value: String },
    #[error("invalid time interval start '{value}'")]
    IntervalInvalidStart { value: String },

    #[error("language priority list cannot be empty")]
    EmptyLanguages,
    #[error("invalid language range '{value}'")]
    InvalidLanguageRange { value: String },
}

/// Decode failure reported by a [`ResponseParser`](crate::connector::ResponseParser)
/// strategy. The generic connector wraps it with the source id and the
/// offending resource reference.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Top-level error for public client operations.
///
/// Every public operation either returns a well-formed (possibly empty)
/// result or fails with exactly one of these variants, identifying the
/// source and, where one exists, the offending resource reference.
#[derive(Debug, Error)]
pub enum SdmxError {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The request violates the dialect's declared shape; raised before any
    /// network call.
    #[error("source '{source_id}': {message}")]
    Validation { source_id: String, message: String },

    /// Connection failure or non-success status, as translated by the
    /// dialect's error translator.
    #[error("source '{source_id}': transport failure for '{resource}': {message}")]
    Transport {
        source_id: String,
        resource: ResourceRef,
        status: Option<u16>,
        message: String,
        retryable: bool,
    },

    #[error("source '{source_id}' answered with unexpected content type '{media_type}'")]
    UnexpectedContentType { source_id: String, media_type: String },

    #[error("source '{source_id}': malformed payload for '{resource}': {message}")]
    Decode {
        source_id: String,
        resource: ResourceRef,
        message: String,
    },

    /// The deferred-response poll loop exhausted its attempt budget.
    #[error("source '{source_id}': deferred response for '{resource}' not ready after {attempts} attempts")]
    DeferredTimeout {
        source_id: String,
        resource: ResourceRef,
        attempts: u32,
    },

    /// The caller's overall deadline expired while polling.
    #[error("source '{source_id}': deadline expired while polling deferred response for '{resource}'")]
    DeadlineExpired {
        source_id: String,
        resource: ResourceRef,
    },

    #[error("unknown source '{id}'")]
    UnknownSource { id: String },

    #[error("unknown driver '{id}'")]
    UnknownDriver { id: String },
}

impl SdmxError {
    /// The source id the failure belongs to, when one is known.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::Format(_) | Self::UnknownDriver { .. } => None,
            Self::UnknownSource { id } => Some(id),
            Self::Validation { source_id, .. }
            | Self::Transport { source_id, .. }
            | Self::UnexpectedContentType { source_id, .. }
            | Self::Decode { source_id, .. }
            | Self::DeferredTimeout { source_id, .. }
            | Self::DeadlineExpired { source_id, .. } => Some(source_id),
        }
    }

    /// The offending resource reference, when the failure names one.
    pub fn resource(&self) -> Option<&ResourceRef> {
        match self {
            Self::Transport { resource, .. }
            | Self::Decode { resource, .. }
            | Self::DeferredTimeout { resource, .. }
            | Self::DeadlineExpired { resource, .. } => Some(resource),
            _ => None,
        }
    }
}
