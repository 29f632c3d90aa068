//! Placeresolver – resolves historical place names found in genealogical
//! records against per-country gazetteers of administrative change.
//!
//! A record says `"Pest, Pest-Pilis-Solt-Kiskun vármegye, Magyarország"` and
//! was written in 1860; the question is which town, county and country that
//! was at the time, whether the record spells it correctly, and what the
//! place is called today. The crate answers from gazetteers that record, per
//! town, which county and country it belonged to in which years and under
//! which name:
//! * A [`range::PrimitiveRange`] is a year interval (`"-1872"`, `"1873-"`,
//!   `"1876-1949"`, `"-"`), the key of every timeline.
//! * A [`gazetteer::TownFact`] says where a town belonged during a range and
//!   under which name(s); several names mean a merger or a split.
//! * A [`gazetteer::CountryData`] holds one country's translations, counties,
//!   dated town lists and detailed town timelines.
//!
//! ## Modules
//! * [`range`] – year ranges and the splitting algebra over them.
//! * [`date`] – record dates, of which only the year is ever used.
//! * [`gazetteer`] – the dataset model and its JSON form.
//! * [`registry`] – the catalog of countries, country name detection and
//!   county matching.
//! * [`towns`] – the normalized town database built from all timelines.
//! * [`place`] – place strings taken apart into town, county and country.
//! * [`resolve`] – the [`resolve::Resolver`], answering what a place was in a
//!   given year.
//! * [`validate`] – bulk checks over many records.
//! * [`cache`], [`settings`], [`error`] – caching, configuration and errors.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use placeresolver::registry::Registry;
//! use placeresolver::resolve::{Resolver, Validity};
//! use placeresolver::date::RecordDate;
//!
//! let mut registry = Registry::new();
//! registry.load_country_json(r#"{
//!     "name": "Testland",
//!     "counties": { "X": "X County" },
//!     "townsDetailed": { "A": { "1900-1950": { "county": "X" } } }
//! }"#).unwrap();
//! let resolver = Resolver::new(Arc::new(registry));
//! let results = resolver.get_valid_county_by_town_and_year("A, X, Testland", Some(&RecordDate::Year(1920)));
//! assert_eq!(results[0].validity.county, Validity::Valid);
//! ```
//!
//! Resolution itself never fails: what the gazetteers cannot confirm comes
//! back as `"Not found"` or `"No date set"`. Only loading data and settings
//! returns [`error::ResolverError`].

pub mod cache;
pub mod date;
pub mod error;
pub mod gazetteer;
pub mod place;
pub mod range;
pub mod registry;
pub mod resolve;
pub mod settings;
pub mod spelling;
pub mod towns;
pub mod validate;

pub use error::{ResolverError, Result};
