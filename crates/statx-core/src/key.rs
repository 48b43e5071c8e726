use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

const ALL_TEXT: &str = "all";
const DIMENSION_SEPARATOR: char = '.';
const ALTERNATIVE_SEPARATOR: char = '+';
const WILDCARD_ALIAS: &str = "*";

/// Multi-dimensional series selector.
///
/// A key holds one selector per dimension; each selector is a `+`-joined set
/// of alternative codes, and the empty string means "any value" for that
/// dimension. `"*"` is accepted on parse as an alias for the empty selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Key {
    dimensions: Vec<String>,
}

impl Key {
    /// The single-dimension all-wildcard key, textual form `"all"`.
    pub fn all() -> Self {
        Self {
            dimensions: vec![String::new()],
        }
    }

    /// Builds a key from positional selectors, normalizing `"*"` to the
    /// empty wildcard.
    pub fn of<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dimensions = selectors
            .into_iter()
            .map(|selector| normalize_selector(selector.into()))
            .collect::<Vec<_>>();

        if dimensions.is_empty() {
            Self::all()
        } else {
            Self { dimensions }
        }
    }

    /// Splits the dotted form into per-dimension selectors. The empty input
    /// and the `all` keyword both produce the all-wildcard key.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_TEXT) {
            return Self::all();
        }

        Self::of(trimmed.split(DIMENSION_SEPARATOR))
    }

    pub fn size(&self) -> usize {
        self.dimensions.len()
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.dimensions.get(position).map(String::as_str)
    }

    pub fn is_wildcard(&self, position: usize) -> bool {
        self.get(position).is_some_and(str::is_empty)
    }

    /// True when this is the one-dimension all-wildcard key.
    pub fn is_all(&self) -> bool {
        self.dimensions.len() == 1 && self.dimensions[0].is_empty()
    }

    /// True iff no dimension is wildcarded and no dimension holds more than
    /// one alternative — the key then addresses exactly one series.
    pub fn is_series(&self) -> bool {
        self.dimensions
            .iter()
            .all(|selector| !selector.is_empty() && !selector.contains(ALTERNATIVE_SEPARATOR))
    }

    /// Containment over selections: the all key contains every key; two
    /// other keys must share dimensionality and, per position, the selector
    /// set of `self` must be a wildcard or a superset of the other's.
    /// Positions are independent — wildcarding one does not affect another.
    pub fn contains(&self, other: &Self) -> bool {
        if self.is_all() {
            return true;
        }
        if self.size() != other.size() {
            return false;
        }

        self.dimensions
            .iter()
            .zip(&other.dimensions)
            .all(|(own, theirs)| selector_contains(own, theirs))
    }

    /// Strictly more general: contains but not equal.
    pub fn supersedes(&self, other: &Self) -> bool {
        self.contains(other) && self != other
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_all() {
            f.write_str(ALL_TEXT)
        } else {
            f.write_str(&self.dimensions.join("."))
        }
    }
}

impl FromStr for Key {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Key> for String {
    fn from(value: Key) -> Self {
        value.to_string()
    }
}

fn normalize_selector(selector: String) -> String {
    if selector == WILDCARD_ALIAS {
        String::new()
    } else {
        selector
    }
}

fn selector_contains(own: &str, theirs: &str) -> bool {
    if own.is_empty() {
        return true;
    }
    if theirs.is_empty() {
        return false;
    }

    theirs
        .split(ALTERNATIVE_SEPARATOR)
        .all(|code| own.split(ALTERNATIVE_SEPARATOR).any(|alt| alt == code))
}

/// Assembles a [`Key`] from named dimension assignments.
///
/// Built from the structure's ordered dimension ids; positions left
/// unassigned render as empty segments, never as fewer segments.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    ids: Vec<String>,
    values: Vec<String>,
}

impl KeyBuilder {
    pub fn new<I, S>(dimension_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = dimension_ids
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>();
        let values = vec![String::new(); ids.len()];
        Self { ids, values }
    }

    /// Assigns a selector to the named dimension.
    pub fn put(&mut self, id: &str, value: &str) -> Result<&mut Self, FormatError> {
        let position = self
            .ids
            .iter()
            .position(|candidate| candidate == id)
            .ok_or_else(|| FormatError::UnknownDimension { id: id.to_owned() })?;

        self.values[position] = normalize_selector(value.to_owned());
        Ok(self)
    }

    pub fn clear(&mut self) {
        for value in &mut self.values {
            value.clear();
        }
    }

    pub fn build(&self) -> Key {
        Key::of(self.values.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_positional_selectors() {
        let key = Key::of(["LOCSTL04", "AUS", "M"]);
        assert_eq!(key.to_string(), "LOCSTL04.AUS.M");
        assert!(key.is_series());
    }

    #[test]
    fn parses_empty_segments_as_wildcards() {
        let key = Key::parse("LOCSTL04..M");
        assert_eq!(key.size(), 3);
        assert_eq!(key.get(1), Some(""));
        assert!(key.is_wildcard(1));
        assert!(!key.is_series());
    }

    #[test]
    fn all_key_has_single_wildcard_dimension() {
        for text in ["", "all", "ALL", "*"] {
            let key = Key::parse(text);
            assert!(key.is_all(), "'{text}' should parse to the all key");
            assert_eq!(key.to_string(), "all");
        }
    }

    #[test]
    fn round_trips_modulo_wildcard_alias() {
        let starred = Key::parse("A.*.C");
        let blank = Key::parse("A..C");
        assert_eq!(starred, blank);
        assert_eq!(Key::parse(&starred.to_string()), starred);
    }

    #[test]
    fn alternatives_break_series_detection() {
        assert!(!Key::of(["A+B", "X", "M"]).is_series());
        assert!(Key::of(["A", "X", "M"]).is_series());
    }

    #[test]
    fn containment_requires_matching_dimensionality() {
        let two = Key::parse("A.B");
        let three = Key::parse("A.B.C");
        assert!(!two.contains(&three));
        assert!(Key::all().contains(&three));
        assert!(Key::all().contains(&two));
    }

    #[test]
    fn containment_is_per_position_superset() {
        let general = Key::parse("A+B..M");
        let specific = Key::parse("A.X.M");
        assert!(general.contains(&specific));
        assert!(!specific.contains(&general));
        assert!(general.supersedes(&specific));
        assert!(!general.supersedes(&general));
    }

    #[test]
    fn wildcard_position_does_not_leak_to_neighbors() {
        let partial = Key::parse(".X.M");
        assert!(partial.contains(&Key::parse("A.X.M")));
        assert!(!partial.contains(&Key::parse("A.Y.M")));
    }

    #[test]
    fn builder_renders_missing_trailing_dimensions() {
        let mut builder = KeyBuilder::new(["FREQ", "REF_AREA", "MEASURE"]);
        builder.put("FREQ", "M").expect("dimension is known");
        assert_eq!(builder.build().to_string(), "M..");

        builder.put("MEASURE", "IX").expect("dimension is known");
        assert_eq!(builder.build().to_string(), "M..IX");
    }

    #[test]
    fn builder_rejects_unknown_dimension() {
        let mut builder = KeyBuilder::new(["FREQ"]);
        let err = builder.put("NOPE", "M").expect_err("must fail");
        assert!(matches!(err, FormatError::UnknownDimension { .. }));
    }
}
