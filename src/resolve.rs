//! Temporal resolution: which town, county and country a place string stood
//! for in a given year, and how the record's own spelling of it compares.
//!
//! Resolution never fails. Whatever the gazetteers cannot confirm comes back
//! as data, tagged [`Validity::NotFound`] or [`Validity::NoDateSet`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::cache::{CacheCategory, KeyedCache};
use crate::date::{RecordDate, year_of};
use crate::gazetteer::{CountryData, TownFact};
use crate::place::{PlaceParts, assign_slots, join_place_parts, split_place};
use crate::range::{PrimitiveRange, Year};
use crate::registry::Registry;
use crate::settings::Settings;
use crate::spelling::spelling_variants;
use crate::towns::{self, PureTowns};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Validity {
    Valid,
    Invalid,
    #[serde(rename = "Not found")]
    NotFound,
    #[serde(rename = "No date set")]
    NoDateSet,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Validity::Valid => "Valid",
            Validity::Invalid => "Invalid",
            Validity::NotFound => "Not found",
            Validity::NoDateSet => "No date set",
        };
        write!(f, "{}", text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TownValidity {
    pub town: Validity,
    pub county: Validity,
    pub country: Validity,
}

impl TownValidity {
    pub fn all(validity: Validity) -> Self {
        Self { town: validity, county: validity, country: validity }
    }
    pub fn is_valid(&self) -> bool {
        *self == Self::all(Validity::Valid)
    }
    pub fn any(&self, validity: Validity) -> bool {
        self.town == validity || self.county == validity || self.country == validity
    }
}

/// One historical reading of a place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TownData {
    pub town: Option<String>,
    pub county: Option<String>,
    pub country: Option<String>,
    /// The timeline range the reading comes from; `None` for town sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<PrimitiveRange>,
    pub validity: TownValidity,
    /// The place as it should have been written, when it was not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub input: String,
}

impl TownData {
    pub fn place(&self) -> String {
        join_place_parts(&[self.town.as_deref(), self.county.as_deref(), self.country.as_deref()])
    }
    fn not_found(parts: &PlaceParts) -> Self {
        Self {
            town: parts.town.clone(),
            county: parts.county.clone(),
            country: parts.country.clone(),
            range: None,
            validity: TownValidity::all(Validity::NotFound),
            suggestion: None,
            input: parts.original.clone(),
        }
    }
}

fn same_text(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn dedup_facts(facts: Vec<TownFact>) -> Vec<TownFact> {
    let mut unique: Vec<TownFact> = Vec::with_capacity(facts.len());
    for fact in facts {
        if !unique.contains(&fact) {
            unique.push(fact);
        }
    }
    unique
}

// a fact with the town it is read for and where it came from
struct Candidate {
    town: String,
    fact: TownFact,
    range: Option<PrimitiveRange>,
}

type GuessKey = (String, Option<Year>, Option<String>, bool);

// ------------- Resolver -------------
pub struct Resolver {
    registry: Arc<Registry>,
    settings: Settings,
    places: KeyedCache<(String, Option<Year>), Vec<PlaceParts>>,
    guesses: KeyedCache<GuessKey, Vec<TownFact>>,
}

impl Resolver {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_settings(registry, Settings::default())
    }
    pub fn with_settings(registry: Arc<Registry>, settings: Settings) -> Self {
        Self {
            places: KeyedCache::new(settings.cache.place_capacity),
            guesses: KeyedCache::new(settings.cache.guess_capacity),
            registry,
            settings,
        }
    }
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    /// The normalized town database of the registry, built on first use.
    pub fn towns(&self) -> Arc<PureTowns> {
        towns::parse_towns(&self.registry)
    }
    /// Clears one category of cached data, or all of them.
    pub fn invalidate(&self, category: Option<CacheCategory>) {
        let all = [
            CacheCategory::CountryName,
            CacheCategory::CountyRegex,
            CacheCategory::TownDatabase,
            CacheCategory::PlaceParts,
            CacheCategory::TownGuess,
        ];
        let categories = match category {
            Some(c) => vec![c],
            None => all.to_vec(),
        };
        for category in categories {
            match category {
                CacheCategory::CountryName | CacheCategory::CountyRegex => self.registry.invalidate(category),
                CacheCategory::TownDatabase => towns::invalidate(),
                CacheCategory::PlaceParts => self.places.clear(),
                CacheCategory::TownGuess => self.guesses.clear(),
            }
            debug!(?category, "cache invalidated");
        }
    }

    // ------------- Place parts -------------
    /// All readings of a place string. Several come back only when a lone
    /// town name is known in more than one placement.
    pub fn get_place_parts(&self, place: &str, date: Option<&RecordDate>) -> Vec<PlaceParts> {
        let year = year_of(date);
        self.places
            .get_or_insert_with((place.to_string(), year), || self.parse_place(place, date))
    }
    fn parse_place(&self, place: &str, date: Option<&RecordDate>) -> Vec<PlaceParts> {
        let tokens = split_place(&self.registry, place);
        if let Some(parts) = assign_slots(&self.registry, place, &tokens) {
            return vec![parts];
        }
        let [token] = tokens.as_slice() else {
            return Vec::new();
        };
        // the town stays as written, the guess only supplies county and country
        let mut guessed: Vec<PlaceParts> = Vec::new();
        for fact in self.guess_town(token, date, None, false) {
            let parts = PlaceParts {
                town: Some(token.clone()),
                county: fact.county,
                country: fact.country,
                ..PlaceParts::new(place, &tokens)
            }
            .finish(&self.registry);
            if !guessed.contains(&parts) {
                guessed.push(parts);
            }
        }
        if !guessed.is_empty() {
            return guessed;
        }
        let mut parts = PlaceParts::new(place, &tokens);
        if self.registry.is_country_name(token) {
            parts.country = Some(token.clone());
        } else {
            parts.town = Some(token.clone());
        }
        vec![parts.finish(&self.registry)]
    }
    /// Lays out parts city first, with the English country name.
    pub fn format_place_for_geocoding(&self, parts: &PlaceParts) -> String {
        let country = parts
            .country
            .as_deref()
            .map(|c| self.registry.detect_country_name(c).unwrap_or_else(|| c.to_string()));
        let mut slots: Vec<Option<&str>> = parts.left_parts.iter().map(|p| Some(p.as_str())).collect();
        slots.extend([parts.town.as_deref(), parts.county.as_deref(), country.as_deref()]);
        join_place_parts(&slots)
    }

    // ------------- Guessing -------------
    fn candidate_countries(&self, country: Option<&str>) -> Vec<&Arc<CountryData>> {
        let named = country
            .and_then(|c| self.registry.detect_country_name(c))
            .and_then(|c| self.registry.country(&c));
        match named {
            Some(data) => vec![data],
            None => self.registry.countries().collect(),
        }
    }
    /// What the gazetteers say a bare town name stood for around `date`.
    ///
    /// Town sources are consulted first: per country the latest source not
    /// newer than the record. Each spelling variant is tried in turn and the
    /// first one found wins. Unless `only_sources` is set the normalized town
    /// timelines are searched the same way afterwards.
    pub fn guess_town(
        &self,
        name: &str,
        date: Option<&RecordDate>,
        country: Option<&str>,
        only_sources: bool,
    ) -> Vec<TownFact> {
        let year = year_of(date);
        let key = (name.trim().to_string(), year, country.map(str::to_string), only_sources);
        self.guesses
            .get_or_insert_with(key, || self.guess_uncached(name.trim(), year, country, only_sources))
    }
    fn guess_uncached(&self, name: &str, year: Option<Year>, country: Option<&str>, only_sources: bool) -> Vec<TownFact> {
        let countries = self.candidate_countries(country);
        let variants = spelling_variants(name);
        for variant in &variants {
            let found: Vec<TownFact> = countries
                .iter()
                .filter_map(|data| data.source_for(year))
                .filter_map(|source| source.towns.get(variant))
                .flatten()
                .cloned()
                .collect();
            if !found.is_empty() {
                trace!(name, variant = %variant, "guessed from town sources");
                return dedup_facts(found);
            }
        }
        if only_sources {
            return Vec::new();
        }
        let towns = self.towns();
        for variant in &variants {
            let found: Vec<TownFact> = countries
                .iter()
                .filter_map(|data| towns.country(data.name()))
                .filter_map(|table| table.find(variant))
                .flat_map(|(_, ranges)| ranges.containing(year).flat_map(|(_, facts)| facts.iter().cloned()))
                .collect();
            if !found.is_empty() {
                trace!(name, variant = %variant, "guessed from town timelines");
                return dedup_facts(found);
            }
        }
        Vec::new()
    }

    // ------------- Validation -------------
    fn judge(&self, parts: &PlaceParts, candidate: &Candidate) -> TownValidity {
        let town = match parts.town.as_deref() {
            Some(t) if same_text(t, &candidate.town) => Validity::Valid,
            _ => Validity::Invalid,
        };
        let country = match (parts.country.as_deref(), candidate.fact.country.as_deref()) {
            (Some(given), Some(known)) if same_text(given, known) => Validity::Valid,
            (None, None) => Validity::Valid,
            _ => Validity::Invalid,
        };
        let county = match (parts.county.as_deref(), candidate.fact.county.as_deref()) {
            (Some(given), Some(known)) => {
                let stored = self
                    .registry
                    .canonical_county(candidate.fact.country.as_deref(), given)
                    .map(|(_, county)| county);
                if same_text(given, known) || stored.as_deref() == Some(known) {
                    Validity::Valid
                } else {
                    Validity::Invalid
                }
            }
            (None, None) => Validity::Valid,
            _ => Validity::Invalid,
        };
        TownValidity { town, county, country }
    }
    fn to_town_data(&self, parts: &PlaceParts, candidate: Candidate, validity: TownValidity) -> TownData {
        let suggestion = validity.any(Validity::Invalid).then(|| {
            let mut slots: Vec<Option<&str>> = parts.left_parts.iter().map(|p| Some(p.as_str())).collect();
            slots.extend([
                Some(candidate.town.as_str()),
                candidate.fact.county.as_deref(),
                candidate.fact.country.as_deref(),
            ]);
            join_place_parts(&slots)
        });
        TownData {
            town: Some(candidate.town),
            county: candidate.fact.county,
            country: candidate.fact.country,
            range: candidate.range,
            validity,
            suggestion,
            input: parts.original.clone(),
        }
    }
    /// Facts for the town of `parts`: from its timeline when the town database
    /// knows it, otherwise from the town sources.
    fn candidates(&self, parts: &PlaceParts, town: &str, year: Option<Year>, current_only: bool) -> Vec<Candidate> {
        let towns = self.towns();
        let country = parts.country.as_deref().filter(|c| self.registry.country(c).is_some());
        let found = country
            .and_then(|c| towns.find(town, Some(c)))
            .or_else(|| towns.find(town, None));
        let facts: Vec<(Option<PrimitiveRange>, TownFact)> = match found {
            Some(found) if current_only => found
                .ranges
                .current()
                .flat_map(|(range, facts)| facts.iter().map(move |f| (Some(*range), f.clone())))
                .collect(),
            Some(found) => found
                .ranges
                .containing(year)
                .flat_map(|(range, facts)| facts.iter().map(move |f| (Some(*range), f.clone())))
                .collect(),
            None => {
                let year = if current_only { None } else { year };
                let date = year.map(RecordDate::Year);
                self.guess_town(town, date.as_ref(), parts.country.as_deref(), true)
                    .into_iter()
                    .map(|f| (None, f))
                    .collect()
            }
        };
        facts
            .into_iter()
            .flat_map(|(range, fact)| {
                fact.town
                    .clone()
                    .into_iter()
                    .map(move |town| Candidate { town, fact: fact.clone(), range })
            })
            .collect()
    }
    fn resolve_parts(&self, parts: &PlaceParts, year: Option<Year>) -> Vec<TownData> {
        let Some(town) = parts.town.as_deref() else {
            return vec![TownData::not_found(parts)];
        };
        let candidates = self.candidates(parts, town, year, false);
        if candidates.is_empty() {
            return vec![TownData::not_found(parts)];
        }
        let judged: Vec<(Candidate, TownValidity)> = candidates
            .into_iter()
            .map(|c| {
                let validity = self.judge(parts, &c);
                (c, validity)
            })
            .collect();
        if year.is_some() {
            return judged
                .into_iter()
                .map(|(c, validity)| self.to_town_data(parts, c, validity))
                .collect();
        }
        let agreeing = judged
            .iter()
            .any(|(_, v)| v.county == Validity::Valid && v.country == Validity::Valid);
        if agreeing {
            judged
                .into_iter()
                .filter(|(_, v)| v.county == Validity::Valid && v.country == Validity::Valid)
                .map(|(c, validity)| self.to_town_data(parts, c, validity))
                .collect()
        } else {
            judged
                .into_iter()
                .map(|(c, validity)| {
                    let town = if validity.town == Validity::Valid { Validity::Valid } else { Validity::NoDateSet };
                    let undated = TownValidity { town, county: Validity::NoDateSet, country: Validity::NoDateSet };
                    let mut data = self.to_town_data(parts, c, undated);
                    data.suggestion = None;
                    data
                })
                .collect()
        }
    }
    /// Every historical reading of `place` valid at `date`, each field checked
    /// against what the record says. A missing date matches every range.
    pub fn get_valid_county_by_town_and_year(&self, place: &str, date: Option<&RecordDate>) -> Vec<TownData> {
        let year = year_of(date);
        let mut results: Vec<TownData> = Vec::new();
        for parts in self.get_place_parts(place, date) {
            for data in self.resolve_parts(&parts, year) {
                let seen = results
                    .iter()
                    .any(|r| r.town == data.town && r.county == data.county && r.country == data.country);
                if !seen {
                    results.push(data);
                }
            }
        }
        debug!(place, year, results = results.len(), "place resolved");
        results
    }
    /// What the town of `place` is called and where it belongs today.
    pub fn get_current_name_of_town(&self, place: &str, only_if_different: bool) -> Vec<TownData> {
        let mut results: Vec<TownData> = Vec::new();
        for parts in self.get_place_parts(place, None) {
            let Some(town) = parts.town.as_deref() else {
                continue;
            };
            for candidate in self.candidates(&parts, town, None, true) {
                let validity = self.judge(&parts, &candidate);
                let unchanged = validity.town == Validity::Valid
                    && (parts.county.is_none() || validity.county == Validity::Valid)
                    && (parts.country.is_none() || validity.country == Validity::Valid);
                if only_if_different && unchanged {
                    continue;
                }
                let data = self.to_town_data(&parts, candidate, validity);
                if !results.iter().any(|r| r.place() == data.place()) {
                    results.push(data);
                }
            }
        }
        info!(place, results = results.len(), "current name looked up");
        results
    }
}
