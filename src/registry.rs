//! The catalog of supported countries.
//!
//! A [`Registry`] is built once at startup (registration takes `&mut self`)
//! and then shared read-only, typically behind an `Arc`, with a
//! [`crate::resolve::Resolver`]. Derived lookups (detected country names and
//! compiled county regexes) are memoized inside and cleared whenever the
//! catalog changes.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info};

use crate::cache::{CacheCategory, KeyedCache};
use crate::error::{ResolverError, Result};
use crate::gazetteer::{CountryData, NameHasher};

/// File stem of the canonical-English translation table in a data directory.
pub const TRANSLATIONS_FILE_STEM: &str = "translations";

fn same_text(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

pub struct Registry {
    countries: BTreeMap<String, Arc<CountryData>>,
    // local name -> English name, shared by every country
    canonical: HashMap<String, String, NameHasher>,
    detected: KeyedCache<String, Option<String>>,
    county_regexes: KeyedCache<String, Option<Arc<Regex>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            countries: BTreeMap::new(),
            canonical: HashMap::default(),
            detected: KeyedCache::new(KeyedCache::<String, Option<String>>::DEFAULT_CAPACITY),
            county_regexes: KeyedCache::new(64),
        }
    }
    /// Adds a country. A country of the same name is replaced, which is
    /// reported by the returned flag.
    pub fn register_country(&mut self, data: CountryData) -> (Arc<CountryData>, bool) {
        let name = data.name().to_string();
        let kept = Arc::new(data);
        let previously_kept = self.countries.insert(name.clone(), Arc::clone(&kept)).is_some();
        self.forget();
        info!(country = %name, replaced = previously_kept, "country registered");
        (kept, previously_kept)
    }
    pub fn register_translations<I: IntoIterator<Item = (String, String)>>(&mut self, translations: I) {
        let before = self.canonical.len();
        self.canonical.extend(translations);
        self.forget();
        debug!(added = self.canonical.len() - before, "canonical translations registered");
    }
    pub fn load_country_json(&mut self, text: &str) -> Result<Arc<CountryData>> {
        let data = CountryData::from_json(text)?;
        Ok(self.register_country(data).0)
    }
    /// Loads a `{ "local name": "English name" }` table, returning its size.
    pub fn load_translations_json(&mut self, text: &str) -> Result<usize> {
        let table: BTreeMap<String, String> = serde_json::from_str(text)?;
        let count = table.len();
        self.register_translations(table);
        Ok(count)
    }
    /// Builds a registry from every `*.json` file in `dir`: the translations
    /// table by its file stem, countries from all the others.
    pub fn load_dir(dir: &Path) -> Result<Registry> {
        let mut registry = Registry::new();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| ResolverError::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|x| x == "json"))
            .collect();
        paths.sort();
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|e| ResolverError::io(&path, e))?;
            let with_path = |e: ResolverError| ResolverError::Dataset {
                message: format!("{}: {}", path.display(), e),
            };
            if path.file_stem().is_some_and(|s| s == TRANSLATIONS_FILE_STEM) {
                registry.load_translations_json(&text).map_err(with_path)?;
            } else {
                registry.load_country_json(&text).map_err(with_path)?;
            }
        }
        info!(dir = %dir.display(), countries = registry.len(), "registry loaded");
        Ok(registry)
    }
    fn forget(&self) {
        self.detected.clear();
        self.county_regexes.clear();
    }
    pub fn invalidate(&self, category: CacheCategory) {
        match category {
            CacheCategory::CountryName => self.detected.clear(),
            CacheCategory::CountyRegex => self.county_regexes.clear(),
            _ => (),
        }
    }
    pub fn len(&self) -> usize {
        self.countries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
    pub fn country(&self, name: &str) -> Option<&Arc<CountryData>> {
        self.countries.get(name)
    }
    pub fn countries(&self) -> impl Iterator<Item = &Arc<CountryData>> {
        self.countries.values()
    }
    /// Content key of the whole catalog's town data.
    pub fn dataset_key(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for country in self.countries.values() {
            hasher.update(country.fingerprint().as_bytes());
        }
        hasher.finalize()
    }

    // ------------- Country names -------------
    /// Canonical name of the country `input` refers to, in any known spelling.
    pub fn detect_country_name(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        self.detected
            .get_or_insert_with(input.to_string(), || self.detect_uncached(input))
    }
    fn detect_uncached(&self, input: &str) -> Option<String> {
        if let Some(english) = self.canonical.get(input) {
            if self.countries.contains_key(english) {
                return Some(english.clone());
            }
            return Some(self.detect_in_tables(english).unwrap_or_else(|| english.clone()));
        }
        self.detect_in_tables(input)
    }
    fn detect_in_tables(&self, input: &str) -> Option<String> {
        if self.countries.contains_key(input) {
            return Some(input.to_string());
        }
        // a key of some country's own table is already a canonical name
        if self.countries.values().any(|c| c.translations().contains_key(input)) {
            return Some(input.to_string());
        }
        // only a country's own entry may name it, so Hungarian spellings of
        // neighbours do not resolve to Hungary
        for country in self.countries.values() {
            if let Some(own) = country.translations().get(country.name()) {
                if own.iter().any(|v| v == input) {
                    return Some(country.name().to_string());
                }
            }
        }
        for country in self.countries.values() {
            for (key, values) in country.translations() {
                if same_text(key, input) || values.iter().any(|v| same_text(v, input)) {
                    return Some(key.clone());
                }
            }
        }
        self.canonical
            .iter()
            .find(|(local, english)| same_text(local, input) || same_text(english, input))
            .map(|(_, english)| english.clone())
            .or_else(|| self.countries.keys().find(|name| same_text(name, input)).cloned())
    }
    /// Whether `input` is any name of any known country, canonical or not.
    pub fn is_country_name(&self, input: &str) -> bool {
        let input = input.trim();
        if input.is_empty() {
            return false;
        }
        self.countries.values().any(|country| {
            same_text(country.name(), input)
                || country
                    .translations()
                    .iter()
                    .any(|(key, values)| same_text(key, input) || values.iter().any(|v| same_text(v, input)))
        }) || self
            .canonical
            .iter()
            .any(|(local, english)| same_text(local, input) || same_text(english, input))
    }

    // ------------- Counties -------------
    /// One alternation over all county names of a country, longest first so
    /// that a name is never captured by its own prefix.
    pub fn county_regex(&self, country: &str) -> Option<Arc<Regex>> {
        let data = self.countries.get(country)?;
        self.county_regexes.get_or_insert_with(country.to_string(), || {
            let mut names: Vec<&str> = data
                .counties()
                .left_values()
                .chain(data.counties().right_values())
                .map(String::as_str)
                .filter(|n| !n.trim().is_empty())
                .collect();
            if names.is_empty() {
                return None;
            }
            names.sort_by_key(|n| (Reverse(n.chars().count()), *n));
            names.dedup();
            let alternation: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
            let pattern = format!(r"(?i)(?:^|\P{{L}})({})(?:\P{{L}}|$)", alternation.join("|"));
            debug!(country, counties = names.len(), "compiling county regex");
            Regex::new(&pattern).ok().map(Arc::new)
        })
    }
    /// Maps a county name or display name to `(country, stored county name)`.
    /// Without a country every registered country is searched.
    pub fn canonical_county(&self, country: Option<&str>, input: &str) -> Option<(String, String)> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let candidates: Vec<&Arc<CountryData>> = match country {
            Some(name) => self.countries.get(name).into_iter().collect(),
            None => self.countries.values().collect(),
        };
        candidates.into_iter().find_map(|data| {
            data.counties()
                .iter()
                .find(|(name, display)| same_text(name, input) || same_text(display, input))
                .map(|(name, _)| (data.name().to_string(), name.clone()))
        })
    }
    pub fn is_county_name(&self, country: Option<&str>, input: &str) -> bool {
        self.canonical_county(country, input).is_some()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
