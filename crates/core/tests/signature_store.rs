use std::collections::BTreeSet;

use serde_json::Value;

use kindred_core::store::SignatureStore;

#[test]
fn saved_corpus_uses_the_interop_layout() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("corpus.json");

    let mut store = SignatureStore::new();
    store.add_name("adware-kit", r"^Lcom/adkit/").unwrap();
    store.add_element("adware-kit", "loader", "1001", 120);
    store.add_element("adware-kit", "loader", "1002", 80);
    // Re-adding a known element must not inflate SIZE.
    store.add_element("adware-kit", "loader", "1001", 120);
    store.save(&path).unwrap();

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let family = &raw["adware-kit"];
    assert_eq!(family["NAME"], Value::String(r"^Lcom/adkit/".into()));
    assert_eq!(family["loader"]["SIZE"], Value::from(200u64));
    assert_eq!(family["loader"]["1001"], Value::from(120u64));
    assert_eq!(family["loader"]["1002"], Value::from(80u64));
}

#[test]
fn corpus_round_trips_through_disk() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("corpus.json");

    let mut store = SignatureStore::new();
    store.add_name("spyware", r"^Lcom/spy/").unwrap();
    store.add_element("spyware", "exfil", "7", 42);
    store.save(&path).unwrap();

    let loaded = SignatureStore::load(&path);
    assert!(!loaded.is_empty());
    assert_eq!(loaded.family_names().collect::<Vec<_>>(), vec!["spyware"]);

    let families = loaded.matching_families(["Lcom/spy/Tracker;"]);
    assert!(families.contains("spyware"));
}

#[test]
fn hand_written_corpus_loads() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("corpus.json");
    std::fs::write(
        &path,
        r#"{"banker": {"NAME": "^Lcom/bank/", "injector": {"SIZE": 300, "55": 100, "56": 200}}}"#,
    )
    .unwrap();

    let store = SignatureStore::load(&path);
    let elems: BTreeSet<String> = ["55".to_string()].into_iter().collect();
    let coverage = store.coverage(&elems);
    assert_eq!(coverage.len(), 1);
    assert_eq!(coverage[0].family, "banker");
    assert_eq!(coverage[0].group, "injector");
    assert_eq!(coverage[0].present, 1);
    assert_eq!(coverage[0].total, 2);
    assert_eq!(coverage[0].present_size, 100);
    assert!((coverage[0].percent - 50.0).abs() < 1e-9);
}

#[test]
fn missing_or_malformed_corpus_degrades_to_empty() {
    let temp = tempfile::tempdir().unwrap();

    let missing = SignatureStore::load(&temp.path().join("does-not-exist.json"));
    assert!(missing.is_empty());

    let garbage_path = temp.path().join("garbage.json");
    std::fs::write(&garbage_path, "definitely { not json").unwrap();
    let garbage = SignatureStore::load(&garbage_path);
    assert!(garbage.is_empty());

    let wrong_shape_path = temp.path().join("array.json");
    std::fs::write(&wrong_shape_path, "[1, 2, 3]").unwrap();
    let wrong_shape = SignatureStore::load(&wrong_shape_path);
    assert!(wrong_shape.is_empty());
}

#[test]
fn invalid_name_pattern_is_rejected() {
    let mut store = SignatureStore::new();
    assert!(store.add_name("broken", "[unclosed").is_err());
}

#[test]
fn classification_only_matches_configured_families() {
    let mut store = SignatureStore::new();
    store.add_name("fam-a", r"^Lcom/alpha/").unwrap();
    store.add_name("fam-b", r"^Lcom/beta/").unwrap();

    let matched = store.matching_families(["Lcom/alpha/Main;", "Lorg/other/Thing;"]);
    assert_eq!(matched.into_iter().collect::<Vec<_>>(), vec!["fam-a".to_string()]);

    let none = store.matching_families(["Lorg/unrelated/X;"]);
    assert!(none.is_empty());
}

#[test]
fn coverage_omits_groups_without_overlap() {
    let mut store = SignatureStore::new();
    store.add_element("fam", "g1", "1", 10);
    store.add_element("fam", "g2", "2", 20);

    let elems: BTreeSet<String> = ["1".to_string()].into_iter().collect();
    let coverage = store.coverage(&elems);
    assert_eq!(coverage.len(), 1);
    assert_eq!(coverage[0].group, "g1");
}
