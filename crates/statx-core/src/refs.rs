use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Wildcard agency id matching any agency.
pub const ALL_AGENCIES: &str = "all";

/// Wildcard version matching any version.
pub const LATEST_VERSION: &str = "latest";

const FIELD_SEPARATOR: char = ',';

/// Reference to a flow, structure, or codelist by agency, id, and version.
///
/// An absent agency normalizes to [`ALL_AGENCIES`] and an absent version to
/// [`LATEST_VERSION`], so accessors always return a concrete value. The
/// textual form is `agency,id,version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceRef {
    agency: String,
    id: String,
    version: String,
}

impl ResourceRef {
    /// Builds a reference, applying the wildcard defaults for absent or
    /// empty agency/version fields.
    pub fn new(
        agency: Option<&str>,
        id: &str,
        version: Option<&str>,
    ) -> Result<Self, FormatError> {
        if id.is_empty() {
            return Err(FormatError::EmptyRefId);
        }
        if id.contains(FIELD_SEPARATOR) {
            return Err(FormatError::RefIdContainsSeparator { id: id.to_owned() });
        }

        let agency = match agency {
            Some(value) if !value.is_empty() => value.to_owned(),
            _ => ALL_AGENCIES.to_owned(),
        };
        let version = match version {
            Some(value) if !value.is_empty() => value.to_owned(),
            _ => LATEST_VERSION.to_owned(),
        };

        Ok(Self {
            agency,
            id: id.to_owned(),
            version,
        })
    }

    /// Builds a fully specified reference.
    pub fn of(agency: &str, id: &str, version: &str) -> Result<Self, FormatError> {
        Self::new(Some(agency), id, Some(version))
    }

    /// Parses the `agency,id,version` grammar. One or two fields elide to
    /// `id` and `agency,id` respectively; empty fields take their wildcard
    /// default; more than three fields is rejected.
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        if input.is_empty() {
            return Err(FormatError::EmptyRef);
        }

        let fields = input.split(FIELD_SEPARATOR).collect::<Vec<_>>();
        match fields.as_slice() {
            [id] => Self::new(None, id, None),
            [agency, id] => Self::new(Some(agency), id, None),
            [agency, id, version] => Self::new(Some(agency), id, Some(version)),
            other => Err(FormatError::RefFieldCount { count: other.len() }),
        }
    }

    pub fn agency(&self) -> &str {
        &self.agency
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Exact triple equality.
    pub fn equals_ref(&self, other: &Self) -> bool {
        self == other
    }

    /// Per-field containment: each field of `self` is either equal to the
    /// other's field or is the respective wildcard. Asymmetric — a wildcard
    /// reference contains a concrete one, never the reverse.
    pub fn contains(&self, other: &Self) -> bool {
        (self.agency == other.agency || self.agency == ALL_AGENCIES)
            && self.id == other.id
            && (self.version == other.version || self.version == LATEST_VERSION)
    }
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.agency, self.id, self.version)
    }
}

impl FromStr for ResourceRef {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for ResourceRef {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceRef> for String {
    fn from(value: ResourceRef) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_triple() {
        let parsed = ResourceRef::parse("ECB,EXR,1.0").expect("ref should parse");
        assert_eq!(parsed.agency(), "ECB");
        assert_eq!(parsed.id(), "EXR");
        assert_eq!(parsed.version(), "1.0");
    }

    #[test]
    fn elided_fields_take_wildcard_defaults() {
        let parsed = ResourceRef::parse("EXR").expect("ref should parse");
        assert_eq!(parsed.agency(), ALL_AGENCIES);
        assert_eq!(parsed.version(), LATEST_VERSION);

        let parsed = ResourceRef::parse(",EXR,").expect("ref should parse");
        assert_eq!(parsed.agency(), ALL_AGENCIES);
        assert_eq!(parsed.version(), LATEST_VERSION);
    }

    #[test]
    fn round_trips_through_text() {
        for text in ["ECB,EXR,1.0", "all,EXR,latest"] {
            let parsed = ResourceRef::parse(text).expect("ref should parse");
            assert_eq!(parsed.to_string(), text);
            assert_eq!(
                ResourceRef::parse(&parsed.to_string()).expect("round trip"),
                parsed
            );
        }
    }

    #[test]
    fn normalizes_elision_on_both_sides() {
        let elided = ResourceRef::parse("EXR").expect("ref should parse");
        let explicit = ResourceRef::parse("all,EXR,latest").expect("ref should parse");
        assert_eq!(elided, explicit);
    }

    #[test]
    fn rejects_too_many_fields() {
        let err = ResourceRef::parse("a,b,c,d").expect_err("must fail");
        assert_eq!(err, FormatError::RefFieldCount { count: 4 });
    }

    #[test]
    fn rejects_empty_and_separator_ids() {
        assert_eq!(
            ResourceRef::new(None, "", None).expect_err("must fail"),
            FormatError::EmptyRefId
        );
        assert!(matches!(
            ResourceRef::new(None, "a,b", None).expect_err("must fail"),
            FormatError::RefIdContainsSeparator { .. }
        ));
    }

    #[test]
    fn containment_is_reflexive_and_asymmetric() {
        let wildcard = ResourceRef::parse("EXR").expect("ref should parse");
        let concrete = ResourceRef::of("ECB", "EXR", "1.0").expect("ref should build");

        assert!(wildcard.contains(&wildcard));
        assert!(concrete.contains(&concrete));
        assert!(wildcard.contains(&concrete));
        assert!(!concrete.contains(&wildcard));
    }

    #[test]
    fn containment_checks_each_field_independently() {
        let agency_wild = ResourceRef::new(None, "EXR", Some("1.0")).expect("ref should build");
        let version_wild = ResourceRef::new(Some("ECB"), "EXR", None).expect("ref should build");
        let concrete = ResourceRef::of("ECB", "EXR", "1.0").expect("ref should build");
        let other_id = ResourceRef::of("ECB", "ICP", "1.0").expect("ref should build");

        assert!(agency_wild.contains(&concrete));
        assert!(version_wild.contains(&concrete));
        assert!(!agency_wild.contains(&other_id));
        assert!(!version_wild.contains(&agency_wild));
    }
}
