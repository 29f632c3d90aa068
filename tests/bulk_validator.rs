use std::path::Path;
use std::sync::Arc;

use placeresolver::date::RecordDate;
use placeresolver::registry::Registry;
use placeresolver::resolve::Resolver;
use placeresolver::settings::Settings;
use placeresolver::validate::{
    FormattingProblem, PlaceRecord, duplicate_clusters, formatting_problems, validate_places,
};

fn setup() -> Resolver {
    let registry = Registry::load_dir(&Path::new(env!("CARGO_MANIFEST_DIR")).join("data")).expect("bundled data loads");
    Resolver::with_settings(Arc::new(registry), Settings::default())
}

fn records() -> Vec<PlaceRecord> {
    vec![
        PlaceRecord::new("I1", "Szeged, Csongrád vármegye, Magyarország", Some(RecordDate::Year(1900))),
        PlaceRecord::new("I2", "Szeged, Csongrád megye, Magyarország", Some(RecordDate::Year(1900))),
        PlaceRecord::new("I3", "Atlantis, Nowhere, Magyarország", Some(RecordDate::Year(1900))),
        PlaceRecord::new("I4", "Debrecen, Hajdú vármegye, Magyarország", None),
        PlaceRecord::new("I5", "Debrecen, Hajdu vármegye, Magyarország", Some(RecordDate::Year(1890))),
    ]
}

#[test]
fn sorts_records_into_findings() {
    let resolver = setup();
    let report = validate_places(&resolver, &records());
    assert_eq!(report.checked, 5);
    let ids = |findings: &[placeresolver::validate::RecordFinding]| {
        findings.iter().map(|f| f.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&report.invalid), vec!["I2", "I5"]);
    assert_eq!(ids(&report.not_found), vec!["I3"]);
    // an undated record agreeing with some range is not flagged
    assert!(report.no_date.is_empty());
    assert!(!report.is_clean());
}

#[test]
fn undated_disagreement_is_reported_as_no_date() {
    let resolver = setup();
    let records = vec![PlaceRecord::new("I9", "Debrecen, Heves vármegye, Magyarország", None)];
    let report = validate_places(&resolver, &records);
    assert_eq!(report.no_date.len(), 1);
    assert!(report.invalid.is_empty());
}

#[test]
fn flags_formatting_slips() {
    let resolver = setup();
    let registry = resolver.registry();
    assert!(formatting_problems(registry, "Szeged, Csongrád vármegye, Magyarország").is_empty());
    assert_eq!(
        formatting_problems(registry, "Szeged,  Csongrád vármegye, Magyarország"),
        vec![FormattingProblem::DoubleSpace]
    );
    assert_eq!(
        formatting_problems(registry, "Szeged,, Csongrád vármegye, Magyarország"),
        vec![FormattingProblem::DoubleComma]
    );
    assert_eq!(
        formatting_problems(registry, " Szeged , Csongrád vármegye, Magyarország"),
        vec![FormattingProblem::StrayWhitespace]
    );
    assert_eq!(
        formatting_problems(registry, "Szeged, Csongrád vármegye"),
        vec![FormattingProblem::MissingCountry]
    );
    assert_eq!(
        formatting_problems(registry, "Szeged, Magyarország"),
        vec![FormattingProblem::MissingCounty]
    );
    assert_eq!(
        formatting_problems(registry, "szeged, Csongrád vármegye, Magyarország"),
        vec![FormattingProblem::Capitalization]
    );
    assert_eq!(
        formatting_problems(registry, "SZEGED, Csongrád vármegye, Magyarország"),
        vec![FormattingProblem::Capitalization]
    );
}

#[test]
fn clusters_near_duplicate_spellings() {
    let clusters = duplicate_clusters(&records(), 5);
    assert_eq!(clusters.len(), 2);
    assert_eq!(
        clusters[0].places,
        vec![
            "Debrecen, Hajdu vármegye, Magyarország".to_string(),
            "Debrecen, Hajdú vármegye, Magyarország".to_string()
        ]
    );
    assert_eq!(clusters[0].ids, vec!["I5", "I4"]);
    assert_eq!(clusters[1].ids, vec!["I2", "I1"]);
    assert!(duplicate_clusters(&records(), 1).is_empty());
}

#[test]
fn report_serializes_to_json() {
    let resolver = setup();
    let report = validate_places(&resolver, &records());
    let json = serde_json::to_value(&report).expect("serializable");
    assert_eq!(json["checked"], 5);
    assert_eq!(json["notFound"][0]["results"][0]["validity"]["town"], "Not found");
}
