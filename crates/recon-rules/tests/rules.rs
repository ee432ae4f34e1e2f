use std::fs;
use std::path::PathBuf;

use recon_rules::{ReconcileRules, RulesError};

fn unique_temp_file(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "recon-rules-{}-{}-{}.toml",
        name,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    path
}

#[test]
fn partial_file_overrides_only_named_values() {
    let rules = ReconcileRules::from_toml_str(
        r#"
[levels]
high = 90.0

[naming]
custom_suffixes = ["__c", "__x"]
"#,
    )
    .unwrap();
    assert_eq!(rules.levels.high, 90.0);
    assert_eq!(rules.levels.medium, 60.0);
    assert_eq!(rules.weights, ReconcileRules::default().weights);
    assert_eq!(rules.naming.custom_suffixes, vec!["__c", "__x"]);
    rules.validate().unwrap();
}

#[test]
fn weights_must_sum_to_one() {
    let path = unique_temp_file("weights");
    fs::write(
        &path,
        "[weights]\nname_similarity = 0.9\n",
    )
    .unwrap();
    let err = ReconcileRules::from_toml_path(&path).unwrap_err();
    assert!(matches!(err, RulesError::InvalidRules { .. }));
    assert!(err.to_string().contains("sum to 1.0"));
    let _ = fs::remove_file(&path);
}

#[test]
fn inverted_levels_rejected() {
    let rules = ReconcileRules::from_toml_str("[levels]\nhigh = 50.0\nmedium = 70.0\n").unwrap();
    assert!(rules.validate().is_err());
}

#[test]
fn malformed_toml_reports_path() {
    let path = unique_temp_file("malformed");
    fs::write(&path, "[weights\n").unwrap();
    let err = ReconcileRules::from_toml_path(&path).unwrap_err();
    assert!(matches!(err, RulesError::Toml { .. }));
    assert!(err.to_string().contains(&path.display().to_string()));
    let _ = fs::remove_file(&path);
}

#[test]
fn missing_file_is_io_error() {
    let err = ReconcileRules::from_toml_path(&unique_temp_file("missing")).unwrap_err();
    assert!(matches!(err, RulesError::Io { .. }));
}

#[test]
fn rendered_rules_parse_back() {
    let rules = ReconcileRules::default();
    let text = rules.to_toml_string().unwrap();
    let back = ReconcileRules::from_toml_str(&text).unwrap();
    assert_eq!(back, rules);
}

#[test]
fn rendered_levels_snapshot() {
    let rules = ReconcileRules::default();
    let levels = format!("high={} medium={}", rules.levels.high, rules.levels.medium);
    insta::assert_snapshot!(levels, @"high=85 medium=60");
}
