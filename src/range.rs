//! Year intervals used as the keys of every gazetteer timeline.
//!
//! A [`PrimitiveRange`] has four textual shapes: unbounded (`""` or `"-"`),
//! open-start (`"-1920"`), open-end (`"1921-"`) and closed (`"1921-1949"`).
//! Bounds are inclusive years. All comparisons are numeric; open bounds
//! behave as minus/plus infinity.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{ResolverError, Result};

pub type Year = i32;

lazy_static! {
    static ref RANGE_GRAMMAR: Regex = Regex::new(r"^\s*(\d{1,4})?\s*-\s*(\d{1,4})?\s*$").unwrap();
}

// ------------- PrimitiveRange -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PrimitiveRange {
    start: Option<Year>,
    end: Option<Year>,
}

impl PrimitiveRange {
    pub const UNBOUNDED: PrimitiveRange = PrimitiveRange { start: None, end: None };

    /// Builds a range from optional bounds, rejecting `start > end`.
    pub fn from_tuple(start: Option<Year>, end: Option<Year>) -> Option<Self> {
        match (start, end) {
            (Some(s), Some(e)) if s > e => None,
            _ => Some(Self { start, end }),
        }
    }
    /// Parses the textual grammar. Anything else is a non-match, never an error.
    pub fn parse(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return Some(Self::UNBOUNDED);
        }
        let captures = RANGE_GRAMMAR.captures(text)?;
        let start = match captures.get(1) {
            Some(m) => Some(m.as_str().parse::<Year>().ok()?),
            None => None,
        };
        let end = match captures.get(2) {
            Some(m) => Some(m.as_str().parse::<Year>().ok()?),
            None => None,
        };
        Self::from_tuple(start, end)
    }
    pub fn start(&self) -> Option<Year> {
        self.start
    }
    pub fn end(&self) -> Option<Year> {
        self.end
    }
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
    /// `"-Y"`: everything up to and including Y.
    pub fn is_open_start(&self) -> bool {
        self.start.is_none() && self.end.is_some()
    }
    /// `"X-"`: everything from X on.
    pub fn is_open_end(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }
    // numeric spans, widened so that end + 1 never overflows
    fn lower(&self) -> i64 {
        self.start.map_or(i64::MIN, i64::from)
    }
    fn upper(&self) -> i64 {
        self.end.map_or(i64::MAX, i64::from)
    }
    fn from_bounds(lower: i64, upper: i64) -> Option<Self> {
        if lower > upper {
            return None;
        }
        let start = if lower == i64::MIN { None } else { Some(Year::try_from(lower).ok()?) };
        let end = if upper == i64::MAX { None } else { Some(Year::try_from(upper).ok()?) };
        Some(Self { start, end })
    }
    /// Whether `year` falls inside. A missing year matches only when the caller says so.
    pub fn contains(&self, year: Option<Year>, true_if_no_year: bool) -> bool {
        match year {
            Some(y) => self.lower() <= i64::from(y) && i64::from(y) <= self.upper(),
            None => true_if_no_year,
        }
    }
    /// Whether `other` lies completely inside this range.
    pub fn covers(&self, other: &PrimitiveRange) -> bool {
        self.lower() <= other.lower() && other.upper() <= self.upper()
    }
    pub fn intersects(&self, other: &PrimitiveRange) -> bool {
        self.lower() <= other.upper() && other.lower() <= self.upper()
    }
    pub fn intersection(&self, other: &PrimitiveRange) -> Option<PrimitiveRange> {
        Self::from_bounds(self.lower().max(other.lower()), self.upper().min(other.upper()))
    }
}

impl Ord for PrimitiveRange {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.lower(), self.upper()).cmp(&(other.lower(), other.upper()))
    }
}
impl PartialOrd for PrimitiveRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl fmt::Display for PrimitiveRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "-"),
            (None, Some(e)) => write!(f, "-{}", e),
            (Some(s), None) => write!(f, "{}-", s),
            (Some(s), Some(e)) => write!(f, "{}-{}", s, e),
        }
    }
}
impl FromStr for PrimitiveRange {
    type Err = ResolverError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| ResolverError::Range { text: s.to_string() })
    }
}
impl Serialize for PrimitiveRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
impl<'de> Deserialize<'de> for PrimitiveRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        PrimitiveRange::parse(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid year range {:?}", text)))
    }
}

// ------------- Splitting -------------
/// One piece of [`split_by`]: which of the two inputs cover it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RangeSplit {
    pub range: PrimitiveRange,
    pub to: bool,
    pub by: bool,
}

/// Partitions `to` into the part before its overlap with `by`, the overlap,
/// and the part after. Without an overlap `to` comes back whole.
pub fn split_by(to: PrimitiveRange, by: PrimitiveRange) -> Vec<RangeSplit> {
    let Some(overlap) = to.intersection(&by) else {
        return vec![RangeSplit { range: to, to: true, by: false }];
    };
    let mut pieces = Vec::with_capacity(3);
    if to.lower() < overlap.lower() {
        if let Some(before) = PrimitiveRange::from_bounds(to.lower(), overlap.lower() - 1) {
            pieces.push(RangeSplit { range: before, to: true, by: false });
        }
    }
    pieces.push(RangeSplit { range: overlap, to: true, by: true });
    if overlap.upper() < to.upper() {
        if let Some(after) = PrimitiveRange::from_bounds(overlap.upper() + 1, to.upper()) {
            pieces.push(RangeSplit { range: after, to: true, by: false });
        }
    }
    pieces
}

/// Cuts possibly overlapping ranges into the minimal set of disjoint cells.
///
/// Every start and every `end + 1` is a split point. Each returned cell lists
/// the values of all inputs containing it, in input order; cells no input
/// covers are dropped.
pub fn split_overlapping_ranges<T: Clone>(entries: &[(PrimitiveRange, T)]) -> Vec<(PrimitiveRange, Vec<T>)> {
    let mut points: Vec<i64> = entries
        .iter()
        .flat_map(|(r, _)| [r.start.map(i64::from), r.end.map(|e| i64::from(e) + 1)])
        .flatten()
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut cells: Vec<PrimitiveRange> = Vec::new();
    match (points.first(), points.last()) {
        (Some(&first), Some(&last)) => {
            if entries.iter().any(|(r, _)| r.start.is_none()) {
                cells.extend(PrimitiveRange::from_bounds(i64::MIN, first - 1));
            }
            for w in points.windows(2) {
                cells.extend(PrimitiveRange::from_bounds(w[0], w[1] - 1));
            }
            if entries.iter().any(|(r, _)| r.end.is_none()) {
                cells.extend(PrimitiveRange::from_bounds(last, i64::MAX));
            }
        }
        _ => {
            if entries.iter().any(|(r, _)| r.is_unbounded()) {
                cells.push(PrimitiveRange::UNBOUNDED);
            }
        }
    }

    cells
        .into_iter()
        .filter_map(|cell| {
            let values: Vec<T> = entries
                .iter()
                .filter(|(r, _)| r.covers(&cell))
                .map(|(_, v)| v.clone())
                .collect();
            (!values.is_empty()).then_some((cell, values))
        })
        .collect()
}
