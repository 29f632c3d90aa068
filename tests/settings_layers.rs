use std::fs;
use std::path::{Path, PathBuf};

use placeresolver::settings::Settings;

fn write_settings(name: &str, text: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("placeresolver-{}-{}.toml", name, std::process::id()));
    fs::write(&path, text).expect("temp file is writable");
    path
}

#[test]
fn defaults_match_bundled_file() {
    let loaded = Settings::load(None).expect("settings load");
    assert_eq!(loaded, Settings::default());
    assert_eq!(loaded.validation.duplicate_distance, 5);
    assert_eq!(loaded.data.dir, Path::new("data"));
}

#[test]
fn file_overrides_only_what_it_names() {
    let path = write_settings(
        "partial",
        "[cache]\nenabled = false\nplace_capacity = 16\n\n[validation]\nduplicate_distance = 3\n",
    );
    let loaded = Settings::load(Some(&path)).expect("settings load");
    fs::remove_file(&path).ok();
    assert!(!loaded.cache.enabled);
    assert_eq!(loaded.cache.place_capacity, 16);
    assert_eq!(loaded.cache.guess_capacity, Settings::default().cache.guess_capacity);
    assert_eq!(loaded.validation.duplicate_distance, 3);
    assert_eq!(loaded.log.filter, "info");
}

#[test]
fn named_file_must_exist() {
    assert!(Settings::load(Some(Path::new("/definitely/not/here.toml"))).is_err());
}

#[test]
fn malformed_values_are_config_errors() {
    let path = write_settings("broken", "[cache]\nplace_capacity = \"many\"\n");
    let loaded = Settings::load(Some(&path));
    fs::remove_file(&path).ok();
    assert!(matches!(loaded, Err(placeresolver::ResolverError::Config(_))));
}
