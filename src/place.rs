//! Place strings as written on records, taken apart into town, county and
//! country.
//!
//! A place string is a comma separated list ordered from the smallest unit to
//! the largest (`"Budapest, Pest megye, Magyarország"`), occasionally reversed
//! (`"Magyarország, Pest megye, Budapest"`). County names may contain commas
//! themselves, which is why splitting consults the country's county regex
//! first.

use regex::{Captures, Regex};
use serde::Serialize;

use crate::registry::Registry;

// stands in for a comma inside a county name while splitting
const PROTECTED_COMMA: &str = "\u{1f}";

/// One reading of a place string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceParts {
    pub town: Option<String>,
    pub county: Option<String>,
    pub country: Option<String>,
    /// Units smaller than the town (districts, streets, farms).
    pub left_parts: Vec<String>,
    /// The place re-joined with the canonical country name.
    pub current: String,
    pub original: String,
    pub parts: Vec<String>,
}

impl PlaceParts {
    pub fn new(original: &str, parts: &[String]) -> Self {
        Self {
            original: original.to_string(),
            parts: parts.to_vec(),
            ..Self::default()
        }
    }
    /// Canonicalizes the country and fills in `current`.
    pub fn finish(mut self, registry: &Registry) -> Self {
        if let Some(country) = self.country.take() {
            self.country = Some(registry.detect_country_name(&country).unwrap_or(country));
        }
        self.current = self.joined();
        self
    }
    /// `leftParts, town, county, country`, skipping what is missing.
    pub fn joined(&self) -> String {
        let slots: Vec<Option<&str>> = self
            .left_parts
            .iter()
            .map(|p| Some(p.as_str()))
            .chain([self.town.as_deref(), self.county.as_deref(), self.country.as_deref()])
            .collect();
        join_place_parts(&slots)
    }
}

/// Joins the present, non-blank parts with `", "`.
pub fn join_place_parts(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn raw_tokens(place: &str) -> Vec<&str> {
    place.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
}

// only the county itself is touched, the match also holds its delimiters
fn protect_commas(county_regex: &Regex, place: &str) -> String {
    county_regex
        .replace_all(place, |caps: &Captures| match (caps.get(0), caps.get(1)) {
            (Some(whole), Some(county)) => format!(
                "{}{}{}",
                &place[whole.start()..county.start()],
                county.as_str().replace(',', PROTECTED_COMMA),
                &place[county.end()..whole.end()]
            ),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// The country a place string names at its end, or else at its start.
pub fn guess_country(registry: &Registry, place: &str) -> Option<String> {
    let tokens = raw_tokens(place);
    tokens
        .last()
        .and_then(|t| registry.detect_country_name(t))
        .or_else(|| tokens.first().and_then(|t| registry.detect_country_name(t)))
}

/// Splits a place string into trimmed tokens ordered from town to country,
/// keeping county names with commas in one piece.
pub fn split_place(registry: &Registry, place: &str) -> Vec<String> {
    let protected = match guess_country(registry, place).and_then(|c| registry.county_regex(&c)) {
        Some(county_regex) => protect_commas(&county_regex, place),
        None => place.to_string(),
    };
    let mut tokens: Vec<String> = protected
        .split(',')
        .map(|t| t.trim().replace(PROTECTED_COMMA, ","))
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() > 1
        && registry.is_country_name(&tokens[0])
        && !registry.is_country_name(&tokens[tokens.len() - 1])
    {
        tokens.reverse();
    }
    tokens
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Country,
    County,
    Town,
}

fn classify(registry: &Registry, country: Option<&str>, token: &str) -> Slot {
    if registry.is_country_name(token) {
        Slot::Country
    } else if registry.is_county_name(country, token) {
        Slot::County
    } else {
        Slot::Town
    }
}

/// Assigns the tokens of a multi-token place to slots. Single tokens need
/// the gazetteer and are left to the resolver, so `None` comes back for them.
pub fn assign_slots(registry: &Registry, original: &str, tokens: &[String]) -> Option<PlaceParts> {
    let mut parts = PlaceParts::new(original, tokens);
    match tokens {
        [] | [_] => return None,
        [first, second] => {
            let country = guess_country(registry, original);
            // the later token wins a slot both compete for
            for token in [second, first] {
                let slot = match classify(registry, country.as_deref(), token) {
                    Slot::Country => &mut parts.country,
                    Slot::County => &mut parts.county,
                    Slot::Town => &mut parts.town,
                };
                if slot.is_none() {
                    *slot = Some(token.clone());
                } else {
                    parts.left_parts.insert(0, token.clone());
                }
            }
        }
        [left @ .., town, county, country] => {
            parts.country = Some(country.clone());
            if !registry.is_country_name(town) {
                parts.town = Some(town.clone());
                parts.county = Some(county.clone());
                parts.left_parts = left.to_vec();
            }
        }
    }
    Some(parts.finish(registry))
}
