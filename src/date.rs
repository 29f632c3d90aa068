// used for the dates found on records
use chrono::{Datelike, NaiveDate, NaiveDateTime};
// used when extracting a year from free text
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

// used when parsing a string to a RecordDate
use std::str::FromStr;
// used to print out readable forms of a date
use std::fmt;

use crate::error::{ResolverError, Result};
use crate::range::Year;

lazy_static! {
    static ref YEAR_MONTH: Regex = Regex::new(r"^(\d{3,4})-(\d{1,2})$").unwrap();
    static ref LOOSE_YEAR: Regex = Regex::new(r"(?:^|\D)(\d{3,4})(?:\D|$)").unwrap();
}

/// A date as it appears on a record. The resolver only ever reads the year,
/// but callers hand over whatever precision they have.
#[derive(Eq, PartialEq, PartialOrd, Ord, Debug, Hash, Clone, Copy)]
pub enum RecordDate {
    Year(Year),
    YearMonth(Year, u32),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl RecordDate {
    pub fn year(&self) -> Year {
        match self {
            RecordDate::Year(y) | RecordDate::YearMonth(y, _) => *y,
            RecordDate::Date(d) => d.year(),
            RecordDate::DateTime(d) => d.year(),
        }
    }
    /// Reads ISO forms first, then falls back to the first three or four digit
    /// number in genealogical free text such as `ABT 1860` or `12 MAR 1860`.
    pub fn parse(text: &str) -> Option<RecordDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(d) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
            return Some(RecordDate::DateTime(d));
        }
        if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Some(RecordDate::Date(d));
        }
        if let Some(captures) = YEAR_MONTH.captures(text) {
            let year = captures[1].parse::<Year>().ok()?;
            let month = captures[2].parse::<u32>().ok()?;
            if (1..=12).contains(&month) {
                return Some(RecordDate::YearMonth(year, month));
            }
        }
        LOOSE_YEAR
            .captures(text)
            .and_then(|c| c[1].parse::<Year>().ok())
            .map(RecordDate::Year)
    }
}

/// Year of an optional date, the only thing range lookups need.
pub fn year_of(date: Option<&RecordDate>) -> Option<Year> {
    date.map(RecordDate::year)
}

impl From<Year> for RecordDate {
    fn from(year: Year) -> Self {
        RecordDate::Year(year)
    }
}
impl From<NaiveDate> for RecordDate {
    fn from(date: NaiveDate) -> Self {
        RecordDate::Date(date)
    }
}
impl From<NaiveDateTime> for RecordDate {
    fn from(date: NaiveDateTime) -> Self {
        RecordDate::DateTime(date)
    }
}
impl FromStr for RecordDate {
    type Err = ResolverError;
    fn from_str(s: &str) -> Result<Self> {
        RecordDate::parse(s).ok_or_else(|| ResolverError::Dataset {
            message: format!("no year in date {:?}", s),
        })
    }
}
impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordDate::Year(y) => write!(f, "{}", y),
            RecordDate::YearMonth(y, m) => write!(f, "{}-{:02}", y, m),
            RecordDate::Date(d) => write!(f, "{}", d),
            RecordDate::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}
impl Serialize for RecordDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
impl<'de> Deserialize<'de> for RecordDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Year(Year),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Year(y) => Ok(RecordDate::Year(y)),
            Raw::Text(t) => RecordDate::parse(&t)
                .ok_or_else(|| de::Error::custom(format!("no year in date {:?}", t))),
        }
    }
}
