use burn_triage::{DecisionThresholds, EngineConfig, EngineError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_partial_thresholds_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("thresholds.toml");
    fs::write(
        &path,
        r#"
bypass_skin_check = true

[thresholds]
min_skin_fraction = 0.2
max_jsd = 0.05
"#,
    )
    .unwrap();

    let config = EngineConfig::from_toml_file(&path).unwrap();
    assert!(config.bypass_skin_check);
    assert_eq!(config.analysis_size, 128);
    assert_eq!(config.input_size, 224);
    assert_eq!(config.thresholds.min_skin_fraction, 0.2);
    assert_eq!(config.thresholds.max_jsd, 0.05);
    assert_eq!(
        config.thresholds.accept_hard,
        DecisionThresholds::default().accept_hard
    );
}

#[test]
fn test_default_config_survives_toml() {
    let text = EngineConfig::default().to_toml_string().unwrap();
    let parsed = EngineConfig::from_toml_str(&text).unwrap();
    assert_eq!(parsed, EngineConfig::default());
}

#[test]
fn test_out_of_range_thresholds_are_configuration_errors() {
    for doc in [
        "[thresholds]\naccept_hard = 1.5\n",
        "[thresholds]\nmax_entropy = -0.1\n",
        "[thresholds]\nmax_jsd = 0.9\n",
        "analysis_size = 0\n",
    ] {
        let err = EngineConfig::from_toml_str(doc).unwrap_err();
        assert!(
            matches!(err, EngineError::Configuration(_)),
            "{doc:?} gave {err}"
        );
    }
}

#[test]
fn test_missing_thresholds_file() {
    let err = EngineConfig::from_toml_file("/no/such/thresholds.toml").unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}
