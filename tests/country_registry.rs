use std::path::Path;

use placeresolver::cache::CacheCategory;
use placeresolver::gazetteer::CountryData;
use placeresolver::registry::Registry;

fn setup() -> Registry {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    Registry::load_dir(&dir).expect("bundled data loads")
}

#[test]
fn loads_every_bundled_country() {
    let registry = setup();
    let names: Vec<&str> = registry.countries().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Hungary", "Romania", "Slovakia"]);
    assert!(registry.country("Hungary").is_some_and(|c| !c.towns_detailed().is_empty()));
}

#[test]
fn detects_canonical_country_names() {
    let registry = setup();
    assert_eq!(registry.detect_country_name("Magyarország").as_deref(), Some("Hungary"));
    assert_eq!(registry.detect_country_name("Hungary").as_deref(), Some("Hungary"));
    assert_eq!(registry.detect_country_name("Magyar Királyság").as_deref(), Some("Hungary"));
    assert_eq!(registry.detect_country_name("szlovákia").as_deref(), Some("Slovakia"));
    assert_eq!(registry.detect_country_name("Unknownland"), None);
}

#[test]
fn detection_is_idempotent() {
    let registry = setup();
    for input in ["Magyarország", "Slovensko", "România", "Ausztria"] {
        let once = registry.detect_country_name(input).expect("known name");
        assert_eq!(registry.detect_country_name(&once).as_deref(), Some(once.as_str()), "{input}");
    }
}

#[test]
fn country_names_are_recognized_in_any_spelling() {
    let registry = setup();
    assert!(registry.is_country_name("Hungary"));
    assert!(registry.is_country_name("Magyarország"));
    assert!(registry.is_country_name("Österreich"));
    assert!(registry.is_country_name("ROMÂNIA"));
    assert!(!registry.is_country_name("Unknownland"));
    assert!(!registry.is_country_name("Budapest"));
    assert!(!registry.is_country_name(""));
}

#[test]
fn re_registering_a_country_replaces_it() {
    let mut registry = setup();
    assert_eq!(registry.detect_country_name("Magyarhon"), None);
    let data = CountryData::from_json(r#"{ "name": "Hungary", "translations": { "Hungary": ["Magyarhon"] } }"#)
        .expect("valid json");
    let (kept, replaced) = registry.register_country(data);
    assert!(replaced);
    assert!(kept.towns_detailed().is_empty());
    assert_eq!(registry.len(), 3);
    // memoized misses are forgotten on registration
    assert_eq!(registry.detect_country_name("Magyarhon").as_deref(), Some("Hungary"));
}

#[test]
fn county_regex_prefers_longest_name() {
    let registry = setup();
    let regex = registry.county_regex("Hungary").expect("Hungary has counties");
    let place = "Cegléd, Pest, Pilis és Solt törvényesen egyesült vármegyék, Magyarország";
    let matched = regex.captures(place).map(|c| c[1].to_string());
    assert_eq!(matched.as_deref(), Some("Pest, Pilis és Solt törvényesen egyesült vármegyék"));
    // a county name inside a town name is no match
    assert!(!regex.is_match("Budapest"));
    assert!(registry.county_regex("Unknownland").is_none());
}

#[test]
fn canonical_county_accepts_display_names() {
    let registry = setup();
    assert_eq!(
        registry.canonical_county(Some("Hungary"), "Pest County"),
        Some(("Hungary".to_string(), "Pest megye".to_string()))
    );
    assert_eq!(
        registry.canonical_county(None, "bratislava region"),
        Some(("Slovakia".to_string(), "Bratislavský kraj".to_string()))
    );
    assert_eq!(registry.canonical_county(Some("Romania"), "Pest megye"), None);
}

#[test]
fn invalidation_keeps_answers_stable() {
    let registry = setup();
    let before = registry.detect_country_name("Ungarn");
    registry.invalidate(CacheCategory::CountryName);
    registry.invalidate(CacheCategory::CountyRegex);
    assert_eq!(registry.detect_country_name("Ungarn"), before);
    assert!(registry.county_regex("Hungary").is_some());
}

#[test]
fn broken_dataset_is_an_error() {
    let mut registry = Registry::new();
    assert!(registry.load_country_json("{ not json").is_err());
    assert!(registry.load_translations_json("[1, 2]").is_err());
    assert!(Registry::load_dir(Path::new("/definitely/not/here")).is_err());
}
