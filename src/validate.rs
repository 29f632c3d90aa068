//! Bulk checking of the places of many records at once.
//!
//! Every record is resolved for its own date; on top of that the place
//! strings are checked for formatting slips and near-duplicate spellings
//! of the same place. The report lists findings only, nothing is corrected.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::date::RecordDate;
use crate::registry::Registry;
use crate::resolve::{Resolver, TownData, Validity};

lazy_static! {
    static ref DOUBLE_COMMA: Regex = Regex::new(r",\s*,").unwrap();
    static ref SPACE_BEFORE_COMMA: Regex = Regex::new(r"\s,").unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: String,
    pub place: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<RecordDate>,
}

impl PlaceRecord {
    pub fn new(id: &str, place: &str, date: Option<RecordDate>) -> Self {
        Self { id: id.to_string(), place: place.to_string(), date }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormattingProblem {
    DoubleSpace,
    DoubleComma,
    StrayWhitespace,
    MissingCountry,
    MissingCounty,
    Capitalization,
}

#[derive(Clone, Debug, Serialize)]
pub struct FormattingIssue {
    pub id: String,
    pub place: String,
    pub problems: Vec<FormattingProblem>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecordFinding {
    pub id: String,
    pub place: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<RecordDate>,
    pub results: Vec<TownData>,
}

/// Distinct place strings close enough to be the same place spelled twice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicateCluster {
    pub places: Vec<String>,
    pub ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub checked: usize,
    pub invalid: Vec<RecordFinding>,
    pub not_found: Vec<RecordFinding>,
    pub no_date: Vec<RecordFinding>,
    pub formatting: Vec<FormattingIssue>,
    pub duplicates: Vec<DuplicateCluster>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
            && self.not_found.is_empty()
            && self.no_date.is_empty()
            && self.formatting.is_empty()
            && self.duplicates.is_empty()
    }
}

/// Formatting slips in a single place string.
pub fn formatting_problems(registry: &Registry, place: &str) -> Vec<FormattingProblem> {
    let mut problems = Vec::new();
    if place.contains("  ") {
        problems.push(FormattingProblem::DoubleSpace);
    }
    if DOUBLE_COMMA.is_match(place) {
        problems.push(FormattingProblem::DoubleComma);
    }
    if place != place.trim() || SPACE_BEFORE_COMMA.is_match(place) {
        problems.push(FormattingProblem::StrayWhitespace);
    }
    let tokens: Vec<&str> = place.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return problems;
    }
    if !tokens.iter().any(|t| registry.is_country_name(t)) {
        problems.push(FormattingProblem::MissingCountry);
    }
    if tokens.len() < 3 && !tokens.iter().any(|t| registry.is_county_name(None, t)) {
        problems.push(FormattingProblem::MissingCounty);
    }
    let miscapitalized = tokens.iter().any(|t| {
        let letters: Vec<char> = t.chars().filter(|c| c.is_alphabetic()).collect();
        let lower_start = t.starts_with(char::is_lowercase);
        let shouting = letters.len() > 3 && letters.iter().all(|c| c.is_uppercase());
        lower_start || shouting
    });
    if miscapitalized {
        problems.push(FormattingProblem::Capitalization);
    }
    problems
}

// ------------- Duplicates -------------
fn find(parent: &mut [usize], i: usize) -> usize {
    if parent[i] != i {
        parent[i] = find(parent, parent[i]);
    }
    parent[i]
}

fn union(parent: &mut [usize], i: usize, j: usize) {
    let (ri, rj) = (find(parent, i), find(parent, j));
    if ri != rj {
        parent[ri.max(rj)] = ri.min(rj);
    }
}

/// Groups distinct place strings whose edit distance is below `distance`.
pub fn duplicate_clusters(records: &[PlaceRecord], distance: usize) -> Vec<DuplicateCluster> {
    let mut ids_by_place: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for record in records {
        let place = record.place.trim();
        if !place.is_empty() {
            ids_by_place.entry(place).or_default().push(record.id.clone());
        }
    }
    let places: Vec<&str> = ids_by_place.keys().copied().collect();
    let mut parent: Vec<usize> = (0..places.len()).collect();
    for i in 0..places.len() {
        for j in (i + 1)..places.len() {
            if strsim::levenshtein(places[i], places[j]) < distance {
                union(&mut parent, i, j);
            }
        }
    }
    let mut clusters: BTreeMap<usize, DuplicateCluster> = BTreeMap::new();
    for (i, place) in places.iter().enumerate() {
        let root = find(&mut parent, i);
        let cluster = clusters.entry(root).or_insert_with(|| DuplicateCluster { places: Vec::new(), ids: Vec::new() });
        cluster.places.push(place.to_string());
        cluster.ids.extend(ids_by_place[place].iter().cloned());
    }
    clusters.into_values().filter(|c| c.places.len() > 1).collect()
}

// ------------- Validation -------------
pub fn validate_places(resolver: &Resolver, records: &[PlaceRecord]) -> ValidationReport {
    let mut report = ValidationReport::default();
    for record in records {
        report.checked += 1;
        let problems = formatting_problems(resolver.registry(), &record.place);
        if !problems.is_empty() {
            report.formatting.push(FormattingIssue {
                id: record.id.clone(),
                place: record.place.clone(),
                problems,
            });
        }
        let results = resolver.get_valid_county_by_town_and_year(&record.place, record.date.as_ref());
        let finding = |results: Vec<TownData>| RecordFinding {
            id: record.id.clone(),
            place: record.place.clone(),
            date: record.date,
            results,
        };
        if results.is_empty() || results.iter().all(|r| r.validity.any(Validity::NotFound)) {
            report.not_found.push(finding(results));
        } else if results.iter().any(|r| r.validity.any(Validity::NoDateSet)) {
            report.no_date.push(finding(results));
        } else if !results.iter().any(|r| r.validity.is_valid()) {
            report.invalid.push(finding(results));
        }
    }
    report.duplicates = duplicate_clusters(records, resolver.settings().validation.duplicate_distance);
    info!(
        checked = report.checked,
        invalid = report.invalid.len(),
        not_found = report.not_found.len(),
        no_date = report.no_date.len(),
        formatting = report.formatting.len(),
        duplicates = report.duplicates.len(),
        "validation complete"
    );
    report
}
