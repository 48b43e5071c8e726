use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Optional capabilities a dialect may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// The `serieskeysonly` detail level is honored server-side.
    SeriesKeysOnly,
    /// A detail parameter is honored at all.
    DetailFilter,
    /// The `all` keyword is accepted in the key position.
    AllKeyword,
    /// Large responses may be deferred behind a follow-up URL.
    DeferredResponse,
}

impl Feature {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeriesKeysOnly => "serieskeysonly",
            Self::DetailFilter => "detailfilter",
            Self::AllKeyword => "allkeyword",
            Self::DeferredResponse => "deferredresponse",
        }
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability matrix attached to a connection, consulted by the generic
/// connector and by callers to decide which query shape to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub series_keys_only: bool,
    pub detail_filter: bool,
    pub all_keyword: bool,
    pub deferred_response: bool,
}

impl FeatureSet {
    pub const fn new(
        series_keys_only: bool,
        detail_filter: bool,
        all_keyword: bool,
        deferred_response: bool,
    ) -> Self {
        Self {
            series_keys_only,
            detail_filter,
            all_keyword,
            deferred_response,
        }
    }

    /// Everything the standard allows, no deferral.
    pub const fn standard() -> Self {
        Self::new(true, true, true, false)
    }

    pub const fn supports(self, feature: Feature) -> bool {
        match feature {
            Feature::SeriesKeysOnly => self.series_keys_only,
            Feature::DetailFilter => self.detail_filter,
            Feature::AllKeyword => self.all_keyword,
            Feature::DeferredResponse => self.deferred_response,
        }
    }

    pub fn supported(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(4);
        if self.series_keys_only {
            values.push(Feature::SeriesKeysOnly.as_str());
        }
        if self.detail_filter {
            values.push(Feature::DetailFilter.as_str());
        }
        if self.all_keyword {
            values.push(Feature::AllKeyword.as_str());
        }
        if self.deferred_response {
            values.push(Feature::DeferredResponse.as_str());
        }
        values
    }
}
