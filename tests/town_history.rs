use std::path::Path;
use std::sync::Arc;

use placeresolver::gazetteer::{CountryData, TownFact};
use placeresolver::range::PrimitiveRange;
use placeresolver::registry::Registry;
use placeresolver::towns::{LinkKind, TownTable, build_towns, parse_towns};

fn r(text: &str) -> PrimitiveRange {
    text.parse().expect("valid range")
}

fn fact(towns: &[&str], county: &str) -> TownFact {
    TownFact {
        county: Some(county.to_string()),
        country: Some("Testland".to_string()),
        town: towns.iter().map(|t| t.to_string()).collect(),
        left_parts: Vec::new(),
    }
}

fn setup(towns_detailed: &str) -> TownTable {
    let json = format!(r#"{{ "name": "Testland", "townsDetailed": {} }}"#, towns_detailed);
    let data = CountryData::from_json(&json).expect("valid dataset");
    let towns = build_towns([&data]);
    towns.country("Testland").cloned().expect("country table")
}

fn bundled() -> Registry {
    Registry::load_dir(&Path::new(env!("CARGO_MANIFEST_DIR")).join("data")).expect("bundled data loads")
}

#[test]
fn merged_towns_share_the_successors_prehistory() {
    let table = setup(
        r#"{
        "Buda": { "-1872": { "county": "Pest" }, "1873-": { "county": "Pest", "town": "Budapest" } },
        "Pest": { "-1872": { "county": "Pest" }, "1873-": { "county": "Pest", "town": "Budapest" } }
    }"#,
    );
    let budapest = table.get("Budapest").expect("synthesized entry");
    assert_eq!(budapest.ranges[&r("-1872")], vec![fact(&["Buda", "Pest"], "Pest")]);
    assert_eq!(budapest.ranges[&r("1873-")], vec![fact(&["Budapest", "Buda", "Pest"], "Pest")]);
    // two sources make it a merger, not a rename
    assert!(budapest.names.is_empty());
}

#[test]
fn synthesized_parent_lists_its_components() {
    let table = setup(
        r#"{
        "Buda": { "-1873": { "county": "Pest", "town": "Budapest" }, "1874-": { "county": "Pest" } },
        "Pest": { "-1873": { "county": "Pest", "town": "Budapest" }, "1874-": { "county": "Pest" } }
    }"#,
    );
    let budapest = table.get("Budapest").expect("synthesized entry");
    assert_eq!(budapest.ranges[&r("-1873")], vec![fact(&["Budapest", "Buda", "Pest"], "Pest")]);
    let buda = table.get("Buda").expect("explicit entry");
    assert_eq!(buda.ranges[&r("-1873")], vec![fact(&["Budapest"], "Pest")]);
}

#[test]
fn single_successor_is_a_rename() {
    let table = setup(
        r#"{
        "Dunapentele": {
            "-1950": { "county": "Fejér" },
            "1951-1961": { "county": "Fejér", "town": "Sztálinváros" },
            "1962-": { "county": "Fejér", "town": "Dunaújváros" }
        }
    }"#,
    );
    let sztalinvaros = table.get("Sztálinváros").expect("synthesized entry");
    assert_eq!(sztalinvaros.names, vec!["Dunapentele".to_string()]);
    assert_eq!(sztalinvaros.ranges.keys().copied().collect::<Vec<_>>(), vec![r("-1950"), r("1951-1961")]);
    let dunaujvaros = table.get("Dunaújváros").expect("synthesized entry");
    assert_eq!(
        dunaujvaros.ranges.keys().copied().collect::<Vec<_>>(),
        vec![r("-1950"), r("1951-1961"), r("1962-")]
    );
    // a new name is the same town, so the old one is not listed as a part of it
    assert_eq!(dunaujvaros.ranges[&r("1962-")], vec![fact(&["Dunaújváros"], "Fejér")]);
    let dunapentele = table.get("Dunapentele").expect("explicit entry");
    assert!(dunapentele.has_name("Sztálinváros"));
    assert!(dunapentele.has_name("dunaújváros"));
}

#[test]
fn split_successors_are_not_renames() {
    let table = setup(
        r#"{
        "Nagyfalu": { "-1949": { "county": "A" }, "1950-": { "county": "A", "town": ["Kisfalu", "Újfalu"] } }
    }"#,
    );
    let kisfalu = table.get("Kisfalu").expect("synthesized entry");
    assert_eq!(kisfalu.ranges[&r("-1949")], vec![fact(&["Nagyfalu"], "A")]);
    assert_eq!(kisfalu.ranges[&r("1950-")], vec![fact(&["Kisfalu"], "A")]);
    assert!(kisfalu.names.is_empty());
    assert!(table.get("Újfalu").is_some());
}

#[test]
fn child_inherits_parent_placement_and_parent_lists_child() {
    let table = setup(
        r#"{
        "Rákospalota": {
            "-1875": { "county": "PPS" },
            "1876-1949": { "county": "PPSK" },
            "1950-": { "county": "Budapest", "town": "Budapest" }
        },
        "Újpest": {
            "-1906": { "county": "PPSK", "town": "Rákospalota" },
            "1907-1949": { "county": "PPSK" },
            "1950-": { "county": "Budapest", "town": "Budapest" }
        }
    }"#,
    );
    let kinds: Vec<(&str, &str, LinkKind)> = table
        .links()
        .iter()
        .map(|l| (l.child.as_str(), l.parent.as_str(), l.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("Rákospalota", "Budapest", LinkKind::Assimilated),
            ("Újpest", "Rákospalota", LinkKind::WasPartOf),
            ("Újpest", "Budapest", LinkKind::Assimilated),
        ]
    );

    let ujpest = table.get("Újpest").expect("explicit entry");
    assert_eq!(
        ujpest.ranges.keys().copied().collect::<Vec<_>>(),
        vec![r("-1875"), r("1876-1906"), r("1907-1949"), r("1950-")]
    );
    assert_eq!(ujpest.ranges[&r("-1875")], vec![fact(&["Rákospalota"], "PPS")]);
    assert_eq!(ujpest.ranges[&r("1876-1906")], vec![fact(&["Rákospalota"], "PPSK")]);

    let rakospalota = table.get("Rákospalota").expect("explicit entry");
    assert_eq!(rakospalota.ranges[&r("-1875")], vec![fact(&["Rákospalota", "Újpest"], "PPS")]);
    assert_eq!(rakospalota.ranges[&r("1876-1906")], vec![fact(&["Rákospalota", "Újpest"], "PPSK")]);
    assert_eq!(rakospalota.ranges[&r("1907-1949")], vec![fact(&["Rákospalota"], "PPSK")]);
    assert_eq!(rakospalota.ranges[&r("1950-")], vec![fact(&["Budapest"], "Budapest")]);
}

#[test]
fn years_the_parent_does_not_cover_keep_the_placeholder() {
    let table = setup(
        r#"{
        "Anyaváros": { "1900-": { "county": "B" } },
        "Újtelep": { "-1920": { "county": "A", "town": "Anyaváros" }, "1921-": { "county": "A" } }
    }"#,
    );
    let ujtelep = table.get("Újtelep").expect("explicit entry");
    assert_eq!(ujtelep.ranges[&r("-1899")], vec![fact(&["Anyaváros"], "A")]);
    assert_eq!(ujtelep.ranges[&r("1900-1920")], vec![fact(&["Anyaváros"], "B")]);
    let anyavaros = table.get("Anyaváros").expect("explicit entry");
    assert_eq!(anyavaros.ranges[&r("1900-1920")], vec![fact(&["Anyaváros", "Újtelep"], "B")]);
    assert_eq!(anyavaros.ranges[&r("1921-")], vec![fact(&["Anyaváros"], "B")]);
}

#[test]
fn ambiguous_placeholder_makes_no_link() {
    let table = setup(
        r#"{
        "Kettő": { "-1900": { "county": "A", "town": ["X", "Y"] }, "1901-": { "county": "A" } }
    }"#,
    );
    assert!(table.links().is_empty());
    assert!(table.get("X").is_some() && table.get("Y").is_some());
}

#[test]
fn explicit_parent_lists_assimilated_town() {
    let registry = bundled();
    let towns = parse_towns(&registry);
    let hungary = towns.country("Hungary").expect("Hungary");
    let szeged = hungary.get("Szeged").expect("Szeged");
    let towns_in = |range: &str| szeged.ranges[&r(range)][0].town.clone();
    assert_eq!(towns_in("1950-1972"), vec!["Szeged".to_string()]);
    assert_eq!(towns_in("1973-"), vec!["Szeged".to_string(), "Szőreg".to_string()]);
}

#[test]
fn every_named_town_owns_a_timeline() {
    let registry = bundled();
    let towns = parse_towns(&registry);
    for (country, table) in towns.countries() {
        for ranges in table.towns().values() {
            for fact in ranges.ranges.values().flatten() {
                for town in &fact.town {
                    assert!(table.get(town).is_some(), "{town} has no entry in {country}");
                }
            }
        }
    }
}

#[test]
fn finds_towns_by_alias_and_case() {
    let registry = bundled();
    let towns = parse_towns(&registry);
    assert_eq!(towns.find("Ofen", None).map(|f| f.town), Some("Buda"));
    assert_eq!(towns.find("szeged", Some("Hungary")).map(|f| f.town), Some("Szeged"));
    let pressburg = towns.find("Prešporok", None).expect("alias");
    assert_eq!((pressburg.country, pressburg.town), ("Slovakia", "Bratislava"));
    assert!(towns.find("Atlantis", None).is_none());
    assert!(towns.find("Szeged", Some("Romania")).is_none());
}

#[test]
fn town_database_is_built_once_per_dataset() {
    let registry = bundled();
    let first = parse_towns(&registry);
    let second = parse_towns(&registry);
    assert!(Arc::ptr_eq(&first, &second));
    // an equal dataset loaded separately hits the same entry
    let again = parse_towns(&bundled());
    assert!(Arc::ptr_eq(&first, &again));
}
