//! Gazetteer data model: the facts a country's dataset records about its towns
//! over time, and the JSON form those datasets are loaded from.
//!
//! Every shape the raw JSON allows (a bare county string, one fact, a list of
//! facts, a single town name or a list of names) is resolved once, at load
//! time, into the owned types below. Nothing downstream re-inspects raw values.

// used to keep the one-to-one mapping between county names and their display names
use bimap::BiMap;

use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::Result;
use crate::range::{PrimitiveRange, Year};

pub type NameHasher = BuildHasherDefault<SeaHasher>;

// ------------- OneOrMany -------------
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}
impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    OneOrMany::<T>::deserialize(deserializer).map(Vec::from)
}

// ------------- TownFact -------------
/// What one range of a town's history says: where it belonged and under
/// which name(s). Several names mean simultaneous successors (a merger or a
/// split); `left_parts` lists what stayed behind in a renaming.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TownFact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub town: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub left_parts: Vec<String>,
}

impl TownFact {
    pub fn new(town: &str, county: Option<&str>, country: Option<&str>) -> Self {
        Self {
            county: county.map(str::to_string),
            country: country.map(str::to_string),
            town: vec![town.to_string()],
            left_parts: Vec::new(),
        }
    }
    pub fn names(&self, town: &str) -> bool {
        self.town.iter().any(|t| t == town)
    }
    /// The single destination of a plain pointer fact (one town, no left parts).
    pub fn sole_destination(&self) -> Option<&str> {
        match (self.town.as_slice(), self.left_parts.is_empty()) {
            ([only], true) => Some(only.as_str()),
            _ => None,
        }
    }
    /// Same administrative placement, regardless of which towns are named.
    pub fn same_placement(&self, other: &TownFact) -> bool {
        self.county == other.county && self.country == other.country && self.left_parts == other.left_parts
    }
    /// A copy naming only the given towns.
    pub fn restricted_to(&self, towns: &[&str]) -> TownFact {
        TownFact {
            town: towns.iter().map(|t| t.to_string()).collect(),
            ..self.clone()
        }
    }
    /// Appends towns not named yet, keeping order.
    pub fn absorb(&mut self, towns: &[String]) {
        for t in towns {
            if !self.names(t) {
                self.town.push(t.clone());
            }
        }
    }
    fn complete(&mut self, own_name: &str, country: &str) {
        if self.town.is_empty() {
            self.town.push(own_name.to_string());
        }
        if self.country.is_none() {
            self.country = Some(country.to_string());
        }
    }
}
impl fmt::Display for TownFact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts: Vec<&str> = self.town.iter().map(String::as_str).collect();
        parts.extend(self.county.as_deref());
        parts.extend(self.country.as_deref());
        write!(f, "{}", parts.join(", "))
    }
}

/// Merges facts that share a placement, uniting their town lists in order.
pub fn merge_facts<I: IntoIterator<Item = TownFact>>(facts: I) -> Vec<TownFact> {
    let mut merged: Vec<TownFact> = Vec::new();
    for fact in facts {
        match merged.iter_mut().find(|m| m.same_placement(&fact)) {
            Some(existing) => existing.absorb(&fact.town),
            None => merged.push(fact),
        }
    }
    merged
}

// ------------- Ranges -------------
/// A town's timeline: year ranges mapped to the facts valid in them, plus
/// the other names the town is known by.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ranges {
    pub ranges: BTreeMap<PrimitiveRange, Vec<TownFact>>,
    pub names: Vec<String>,
}

impl Ranges {
    pub fn new() -> Self {
        Self::default()
    }
    /// Adds facts under `range`, merging with whatever the range already holds.
    pub fn insert(&mut self, range: PrimitiveRange, facts: Vec<TownFact>) {
        let kept = self.ranges.entry(range).or_default();
        let combined = merge_facts(kept.drain(..).chain(facts));
        *kept = combined;
    }
    pub fn add_name(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }
    pub fn has_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.names.iter().any(|n| n.to_lowercase() == name)
    }
    pub fn earliest(&self) -> Option<(&PrimitiveRange, &Vec<TownFact>)> {
        self.ranges.iter().next()
    }
    /// Ranges containing `year`; a missing year matches every range.
    pub fn containing(&self, year: Option<Year>) -> impl Iterator<Item = (&PrimitiveRange, &Vec<TownFact>)> {
        self.ranges.iter().filter(move |(r, _)| r.contains(year, true))
    }
    /// Open-ended ranges, the ones that still hold today.
    pub fn current(&self) -> impl Iterator<Item = (&PrimitiveRange, &Vec<TownFact>)> {
        self.ranges.iter().filter(|(r, _)| r.end().is_none())
    }
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
    fn complete(&mut self, own_name: &str, country: &str) {
        for facts in self.ranges.values_mut() {
            for fact in facts.iter_mut() {
                fact.complete(own_name, country);
            }
        }
    }
}

impl Serialize for Ranges {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let extra = usize::from(!self.names.is_empty());
        let mut map = serializer.serialize_map(Some(self.ranges.len() + extra))?;
        for (range, facts) in &self.ranges {
            map.serialize_entry(&range.to_string(), facts)?;
        }
        if !self.names.is_empty() {
            map.serialize_entry("names", &self.names)?;
        }
        map.end()
    }
}

struct RangesVisitor;
impl<'de> Visitor<'de> for RangesVisitor {
    type Value = Ranges;
    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map of year ranges to town facts")
    }
    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Ranges, A::Error> {
        let mut ranges = Ranges::new();
        while let Some(key) = access.next_key::<String>()? {
            if key == "names" {
                let names: OneOrMany<String> = access.next_value()?;
                ranges.names = names.into();
                continue;
            }
            match PrimitiveRange::parse(&key) {
                Some(range) => {
                    let facts: OneOrMany<TownFact> = access.next_value()?;
                    ranges.insert(range, facts.into());
                }
                None => {
                    warn!(key = %key, "skipping unparsable range key");
                    access.next_value::<de::IgnoredAny>()?;
                }
            }
        }
        Ok(ranges)
    }
}
impl<'de> Deserialize<'de> for Ranges {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RangesVisitor)
    }
}

// ------------- TownEntry -------------
/// A town as written in a dataset: either just its county (no recorded
/// history) or a full timeline.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TownEntry {
    County(String),
    History(Ranges),
}

impl TownEntry {
    pub fn into_ranges(self, own_name: &str, country: &str) -> Ranges {
        let mut ranges = match self {
            TownEntry::County(county) => {
                let mut ranges = Ranges::new();
                ranges.insert(PrimitiveRange::UNBOUNDED, vec![TownFact::new(own_name, Some(&county), None)]);
                ranges
            }
            TownEntry::History(ranges) => ranges,
        };
        ranges.complete(own_name, country);
        ranges
    }
}

// ------------- TownSource -------------
/// A flat gazetteer published in a given year: town name to its placement then.
#[derive(Clone, Debug)]
pub struct TownSource {
    pub year: Year,
    pub towns: HashMap<String, Vec<TownFact>, NameHasher>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceValue {
    County(String),
    Facts(OneOrMany<TownFact>),
}

// ------------- CountryData -------------
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCountryData {
    name: String,
    #[serde(default)]
    translations: BTreeMap<String, OneOrMany<String>>,
    #[serde(default)]
    counties: BTreeMap<String, String>,
    #[serde(default)]
    town_sources: BTreeMap<Year, BTreeMap<String, SourceValue>>,
    #[serde(default)]
    towns_detailed: BTreeMap<String, TownEntry>,
}

/// Everything known about one country. Immutable once built.
#[derive(Clone, Debug)]
pub struct CountryData {
    name: String,
    translations: BTreeMap<String, Vec<String>>,
    counties: BiMap<String, String>,
    town_sources: Vec<TownSource>,
    towns_detailed: BTreeMap<String, Ranges>,
    fingerprint: blake3::Hash,
}

impl CountryData {
    pub fn new(
        name: &str,
        translations: BTreeMap<String, Vec<String>>,
        counties: BiMap<String, String>,
        mut town_sources: Vec<TownSource>,
        towns_detailed: BTreeMap<String, TownEntry>,
    ) -> Self {
        let towns_detailed: BTreeMap<String, Ranges> = towns_detailed
            .into_iter()
            .map(|(town, entry)| {
                let ranges = entry.into_ranges(&town, name);
                (town, ranges)
            })
            .collect();
        for source in town_sources.iter_mut() {
            for (town, facts) in source.towns.iter_mut() {
                for fact in facts.iter_mut() {
                    fact.complete(town, name);
                }
            }
        }
        town_sources.sort_by_key(|s| s.year);
        let fingerprint = Self::fingerprint_of(name, &towns_detailed);
        debug!(country = name, towns = towns_detailed.len(), sources = town_sources.len(), "country data built");
        Self {
            name: name.to_string(),
            translations,
            counties,
            town_sources,
            towns_detailed,
            fingerprint,
        }
    }
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawCountryData = serde_json::from_str(text)?;
        let translations = raw
            .translations
            .into_iter()
            .map(|(k, v)| (k, Vec::from(v)))
            .collect();
        let mut counties = BiMap::new();
        for (county, display) in raw.counties {
            counties.insert(county, display);
        }
        let town_sources = raw
            .town_sources
            .into_iter()
            .map(|(year, towns)| TownSource {
                year,
                towns: towns
                    .into_iter()
                    .map(|(town, value)| {
                        let facts = match value {
                            SourceValue::County(county) => vec![TownFact::new(&town, Some(&county), None)],
                            SourceValue::Facts(facts) => facts.into(),
                        };
                        (town, facts)
                    })
                    .collect(),
            })
            .collect();
        Ok(Self::new(&raw.name, translations, counties, town_sources, raw.towns_detailed))
    }
    fn fingerprint_of(name: &str, towns: &BTreeMap<String, Ranges>) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&serde_json::to_vec(towns).unwrap_or_default());
        hasher.finalize()
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn translations(&self) -> &BTreeMap<String, Vec<String>> {
        &self.translations
    }
    pub fn counties(&self) -> &BiMap<String, String> {
        &self.counties
    }
    pub fn town_sources(&self) -> &[TownSource] {
        &self.town_sources
    }
    pub fn towns_detailed(&self) -> &BTreeMap<String, Ranges> {
        &self.towns_detailed
    }
    /// Content hash of the detailed towns, the input of the town database.
    pub fn fingerprint(&self) -> &blake3::Hash {
        &self.fingerprint
    }
    /// Most recent source stamped no later than `year`. Without a year the
    /// latest source is used; a year older than every source gets the earliest.
    pub fn source_for(&self, year: Option<Year>) -> Option<&TownSource> {
        match year {
            None => self.town_sources.last(),
            Some(y) => self
                .town_sources
                .iter()
                .rev()
                .find(|s| s.year <= y)
                .or_else(|| self.town_sources.first()),
        }
    }
}
