use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

const ANY_TAG: &str = "*";

/// Ordered language preference, Accept-Language style.
///
/// Ranges keep their written order; an optional `q` weight (0–1, three
/// decimals) reorders them, highest first. `*` matches any language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LangPriority {
    ranges: Vec<LangRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LangRange {
    tag: String,
    // Weight in thousandths so the type stays Eq/Hash.
    weight: u16,
}

impl LangPriority {
    /// `*` — any language, in written order.
    pub fn any() -> Self {
        Self {
            ranges: vec![LangRange {
                tag: ANY_TAG.to_owned(),
                weight: 1000,
            }],
        }
    }

    /// Parses `tag[;q=weight]` ranges joined by commas, e.g. `en,fr;q=0.8`.
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FormatError::EmptyLanguages);
        }

        let mut ranges = Vec::new();
        for part in trimmed.split(',') {
            ranges.push(parse_range(part.trim())?);
        }

        ranges.sort_by(|left, right| right.weight.cmp(&left.weight));
        Ok(Self { ranges })
    }

    /// Renders the list back into an `Accept-Language` header value.
    pub fn to_header_value(&self) -> String {
        self.ranges
            .iter()
            .map(|range| {
                if range.weight == 1000 {
                    range.tag.clone()
                } else {
                    format!("{};q=0.{:03}", range.tag, range.weight)
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Picks the best localized text from a tag-to-text map, walking ranges
    /// in priority order. Primary subtags match their regional variants
    /// (`en` matches `en-GB`). Falls back to the map's first entry.
    pub fn select<'a>(&self, texts: &'a BTreeMap<String, String>) -> Option<&'a str> {
        for range in &self.ranges {
            if range.tag == ANY_TAG {
                break;
            }
            if let Some(text) = texts.get(&range.tag) {
                return Some(text);
            }

            let primary = range.tag.split('-').next().unwrap_or(&range.tag);
            if let Some((_, text)) = texts
                .iter()
                .find(|(tag, _)| tag.split('-').next() == Some(primary))
            {
                return Some(text);
            }
        }

        texts.values().next().map(String::as_str)
    }
}

impl Default for LangPriority {
    fn default() -> Self {
        Self::any()
    }
}

fn parse_range(part: &str) -> Result<LangRange, FormatError> {
    let invalid = || FormatError::InvalidLanguageRange {
        value: part.to_owned(),
    };

    let (tag, weight) = match part.split_once(';') {
        None => (part, 1000),
        Some((tag, parameter)) => {
            let value = parameter
                .trim()
                .strip_prefix("q=")
                .ok_or_else(invalid)?
                .parse::<f32>()
                .map_err(|_| invalid())?;
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid());
            }
            (tag, (value * 1000.0).round() as u16)
        }
    };

    let tag = tag.trim();
    let well_formed = tag == ANY_TAG
        || (!tag.is_empty()
            && tag
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-'));
    if !well_formed {
        return Err(invalid());
    }

    Ok(LangRange {
        tag: tag.to_owned(),
        weight,
    })
}

impl Display for LangPriority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

impl FromStr for LangPriority {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for LangPriority {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LangPriority> for String {
    fn from(value: LangPriority) -> Self {
        value.to_header_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(tag, text)| ((*tag).to_owned(), (*text).to_owned()))
            .collect()
    }

    #[test]
    fn orders_ranges_by_weight() {
        let langs = LangPriority::parse("fr;q=0.5,en").expect("must parse");
        assert_eq!(langs.to_header_value(), "en,fr;q=0.500");
    }

    #[test]
    fn selects_highest_priority_match() {
        let langs = LangPriority::parse("nl,fr;q=0.8").expect("must parse");
        let texts = names(&[("en", "Exchange rates"), ("fr", "Taux de change")]);
        assert_eq!(langs.select(&texts), Some("Taux de change"));
    }

    #[test]
    fn primary_subtag_matches_regional_variant() {
        let langs = LangPriority::parse("en").expect("must parse");
        let texts = names(&[("en-GB", "Labour force"), ("fr", "Population active")]);
        assert_eq!(langs.select(&texts), Some("Labour force"));
    }

    #[test]
    fn falls_back_to_first_entry() {
        let langs = LangPriority::parse("de").expect("must parse");
        let texts = names(&[("es", "Tipo de cambio")]);
        assert_eq!(langs.select(&texts), Some("Tipo de cambio"));
    }

    #[test]
    fn rejects_malformed_ranges() {
        assert!(matches!(
            LangPriority::parse("").expect_err("must fail"),
            FormatError::EmptyLanguages
        ));
        assert!(matches!(
            LangPriority::parse("en;level=1").expect_err("must fail"),
            FormatError::InvalidLanguageRange { .. }
        ));
        assert!(matches!(
            LangPriority::parse("en;q=2.0").expect_err("must fail"),
            FormatError::InvalidLanguageRange { .. }
        ));
    }
}
