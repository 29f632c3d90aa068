//! The town database: every town of every registered country with its full,
//! cross-referenced timeline.
//!
//! Datasets only spell out the history of some towns ("explicit" entries);
//! their facts point at successors, parents and new names that may never get
//! an entry of their own. [`build_towns`] turns that into [`PureTowns`], in
//! which every town named anywhere owns a [`Ranges`]:
//!
//! 1. explicit entries are taken as loaded, and the links between explicit
//!    children and their parents are read off them before anything changes;
//! 2. towns that are only ever pointed at get a synthesized timeline made of
//!    the pre-history of every town pointing at them plus the pointing ranges;
//! 3. a town named by exactly one other town, always as its sole successor,
//!    is a rename and both names become aliases of each other;
//! 4. a child whose timeline opens with "was part of X until Y" inherits X's
//!    placement for those years;
//! 5. a parent lists its explicit children among its own names for the years
//!    they were part of it, unless it is merely the child's new name.
//!
//! Building is deterministic for the same input, so [`parse_towns`] keeps one
//! database per distinct dataset content.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::ContentCache;
use crate::gazetteer::{CountryData, NameHasher, Ranges, TownFact, merge_facts};
use crate::range::{PrimitiveRange, split_by, split_overlapping_ranges};
use crate::registry::Registry;

lazy_static! {
    static ref TOWN_DATABASE: ContentCache<PureTowns> = ContentCache::new();
}

/// Cached town database of everything in `registry`. The same dataset
/// content always yields the same `Arc`.
pub fn parse_towns(registry: &Registry) -> Arc<PureTowns> {
    TOWN_DATABASE.get_or_build(registry.dataset_key(), || {
        build_towns(registry.countries().map(|c| c.as_ref()))
    })
}

pub fn invalidate() {
    TOWN_DATABASE.clear();
    info!("town database cache cleared");
}

// ------------- Links -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkKind {
    /// The child's history opens with an open-start range pointing at the parent.
    WasPartOf,
    /// The child ends in an open-end range pointing at the parent.
    Assimilated,
}

/// A child town that was a component of a parent during `span`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Link {
    pub child: String,
    pub parent: String,
    pub kind: LinkKind,
    pub span: PrimitiveRange,
}

fn sole_pointer(child: &str, facts: &[TownFact]) -> Option<String> {
    match facts {
        [fact] => fact
            .sole_destination()
            .filter(|parent| *parent != child)
            .map(str::to_string),
        _ => None,
    }
}

fn collect_links(explicit: &BTreeMap<String, Ranges>) -> Vec<Link> {
    let mut links = Vec::new();
    for (child, ranges) in explicit {
        if let Some((range, facts)) = ranges.earliest() {
            if range.is_open_start() {
                if let Some(parent) = sole_pointer(child, facts) {
                    links.push(Link { child: child.clone(), parent, kind: LinkKind::WasPartOf, span: *range });
                }
            }
        }
        for (range, facts) in ranges.ranges.iter().filter(|(r, _)| r.is_open_end()) {
            if let Some(parent) = sole_pointer(child, facts) {
                links.push(Link { child: child.clone(), parent, kind: LinkKind::Assimilated, span: *range });
            }
        }
    }
    links
}

// ------------- TownTable -------------
/// All towns of one country after normalization.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TownTable {
    towns: BTreeMap<String, Ranges>,
    links: Vec<Link>,
    // lower-cased alias -> town key
    #[serde(skip)]
    aliases: HashMap<String, String, NameHasher>,
}

impl TownTable {
    pub fn towns(&self) -> &BTreeMap<String, Ranges> {
        &self.towns
    }
    pub fn links(&self) -> &[Link] {
        &self.links
    }
    pub fn get(&self, town: &str) -> Option<&Ranges> {
        self.towns.get(town)
    }
    /// Looks a town up by key, then by alias, then by key ignoring case.
    pub fn find(&self, name: &str) -> Option<(&str, &Ranges)> {
        if let Some((town, ranges)) = self.towns.get_key_value(name) {
            return Some((town.as_str(), ranges));
        }
        let lower = name.to_lowercase();
        if let Some((town, ranges)) = self.aliases.get(&lower).and_then(|t| self.towns.get_key_value(t)) {
            return Some((town.as_str(), ranges));
        }
        self.towns
            .iter()
            .find(|(town, _)| town.to_lowercase() == lower)
            .map(|(town, ranges)| (town.as_str(), ranges))
    }
    pub fn len(&self) -> usize {
        self.towns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.towns.is_empty()
    }
}

/// A town found in the database together with where it was found.
#[derive(Clone, Copy, Debug)]
pub struct FoundTown<'a> {
    pub country: &'a str,
    pub town: &'a str,
    pub ranges: &'a Ranges,
}

// ------------- PureTowns -------------
#[derive(Clone, Debug, Default, Serialize)]
pub struct PureTowns {
    countries: BTreeMap<String, TownTable>,
}

impl PureTowns {
    pub fn country(&self, name: &str) -> Option<&TownTable> {
        self.countries.get(name)
    }
    pub fn countries(&self) -> impl Iterator<Item = (&str, &TownTable)> {
        self.countries.iter().map(|(name, table)| (name.as_str(), table))
    }
    /// Finds a town in `country`, or in every country in name order.
    pub fn find(&self, name: &str, country: Option<&str>) -> Option<FoundTown<'_>> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        match country {
            Some(c) => self
                .countries
                .get_key_value(c)
                .and_then(|(c, table)| Self::found_in(c, table, name)),
            None => self
                .countries
                .iter()
                .find_map(|(c, table)| Self::found_in(c, table, name)),
        }
    }
    fn found_in<'a>(country: &'a str, table: &'a TownTable, name: &str) -> Option<FoundTown<'a>> {
        table
            .find(name)
            .map(|(town, ranges)| FoundTown { country, town, ranges })
    }
    pub fn len(&self) -> usize {
        self.countries.values().map(TownTable::len).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ------------- Building -------------
pub fn build_towns<'a, I: IntoIterator<Item = &'a CountryData>>(countries: I) -> PureTowns {
    let countries = countries
        .into_iter()
        .map(|data| (data.name().to_string(), build_country(data)))
        .collect();
    PureTowns { countries }
}

/// What `source` says about `destination`: every range of `source` ending
/// before it first names `destination`, and the naming ranges narrowed down
/// to `destination` alone.
fn history_of(destination: &str, source: &Ranges) -> Vec<(PrimitiveRange, TownFact)> {
    let naming: Vec<(&PrimitiveRange, &Vec<TownFact>)> = source
        .ranges
        .iter()
        .filter(|(_, facts)| facts.iter().any(|f| f.names(destination)))
        .collect();
    let Some(first) = naming.first().map(|(range, _)| **range) else {
        return Vec::new();
    };
    let mut pieces = Vec::new();
    for (range, facts) in &source.ranges {
        let before = matches!((range.end(), first.start()), (Some(end), Some(start)) if end < start);
        if before {
            pieces.extend(facts.iter().map(|fact| (*range, fact.clone())));
        }
    }
    for (range, facts) in naming {
        pieces.extend(
            facts
                .iter()
                .filter(|f| f.names(destination))
                .map(|fact| (*range, fact.restricted_to(&[destination]))),
        );
    }
    pieces
}

fn build_country(data: &CountryData) -> TownTable {
    let explicit = data.towns_detailed();
    let mut towns: BTreeMap<String, Ranges> = explicit.clone();
    let links = collect_links(explicit);

    // destinations without an entry, with every explicit town naming them
    let mut naming: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (source, ranges) in explicit {
        for fact in ranges.ranges.values().flatten() {
            for town in fact.town.iter().filter(|t| *t != source && !explicit.contains_key(*t)) {
                let sources = naming.entry(town.as_str()).or_default();
                if !sources.contains(&source.as_str()) {
                    sources.push(source.as_str());
                }
            }
        }
    }

    for (destination, sources) in &naming {
        let pieces: Vec<(PrimitiveRange, TownFact)> = sources
            .iter()
            .filter_map(|source| explicit.get(*source))
            .flat_map(|ranges| history_of(destination, ranges))
            .collect();
        let mut ranges = Ranges::new();
        for (cell, facts) in split_overlapping_ranges(&pieces) {
            ranges.insert(cell, merge_facts(facts));
        }
        towns.insert(destination.to_string(), ranges);
    }

    let mut renamed: Vec<&str> = Vec::new();
    for (destination, sources) in &naming {
        let [source] = sources.as_slice() else {
            continue;
        };
        let pure = explicit.get(*source).is_some_and(|ranges| {
            ranges
                .ranges
                .values()
                .flatten()
                .filter(|f| f.names(destination))
                .all(|f| f.sole_destination() == Some(*destination))
        });
        if pure {
            if let Some(ranges) = towns.get_mut(*destination) {
                ranges.add_name(source);
            }
            if let Some(ranges) = towns.get_mut(*source) {
                ranges.add_name(destination);
            }
            renamed.push(*destination);
        }
    }

    for link in links.iter().filter(|l| l.kind == LinkKind::WasPartOf) {
        inherit_from_parent(&mut towns, link);
    }
    // a renamed town is the same town, not a parent of its old name
    for link in links.iter().filter(|l| !renamed.contains(&l.parent.as_str())) {
        list_component(&mut towns, link);
    }

    let mut aliases: HashMap<String, String, NameHasher> = HashMap::default();
    for (town, ranges) in &towns {
        for name in &ranges.names {
            aliases.entry(name.to_lowercase()).or_insert_with(|| town.clone());
        }
    }

    info!(
        country = data.name(),
        explicit = explicit.len(),
        synthesized = naming.len(),
        renames = renamed.len(),
        links = links.len(),
        "town history normalized"
    );
    TownTable { towns, links, aliases }
}

/// Replaces the child's "was part of" placeholder with the parent's own
/// placement over the same years. Years the parent has no record of keep
/// the placeholder.
fn inherit_from_parent(towns: &mut BTreeMap<String, Ranges>, link: &Link) {
    let Some(parent) = towns.get(&link.parent).cloned() else {
        return;
    };
    let Some(child) = towns.get_mut(&link.child) else {
        return;
    };
    let Some(placeholder) = child.ranges.remove(&link.span) else {
        return;
    };
    let mut entries: Vec<(PrimitiveRange, Option<&Vec<TownFact>>)> = vec![(link.span, None)];
    for (range, facts) in &parent.ranges {
        if let Some(cut) = range.intersection(&link.span) {
            entries.push((cut, Some(facts)));
        }
    }
    for (cell, values) in split_overlapping_ranges(&entries) {
        let inherited: Vec<TownFact> = values.iter().flatten().flat_map(|facts| facts.iter().cloned()).collect();
        let facts = if inherited.is_empty() { placeholder.clone() } else { merge_facts(inherited) };
        child.insert(cell, facts);
    }
    debug!(child = %link.child, parent = %link.parent, span = %link.span, "inherited parent placement");
}

/// Splits the parent's timeline at the child's span and names the child
/// next to the parent for the overlapping years.
fn list_component(towns: &mut BTreeMap<String, Ranges>, link: &Link) {
    let Some(parent) = towns.get_mut(&link.parent) else {
        return;
    };
    let mut split = BTreeMap::new();
    for (range, facts) in std::mem::take(&mut parent.ranges) {
        for piece in split_by(range, link.span) {
            let mut facts = facts.clone();
            if piece.by {
                for fact in facts.iter_mut().filter(|f| f.names(&link.parent)) {
                    fact.absorb(std::slice::from_ref(&link.child));
                }
            }
            split.insert(piece.range, facts);
        }
    }
    parent.ranges = split;
    debug!(child = %link.child, parent = %link.parent, span = %link.span, "listed component town");
}
