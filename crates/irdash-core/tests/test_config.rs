use approx::assert_abs_diff_eq;

use irdash_core::pipeline::config::ReductionConfig;

#[test]
fn empty_config_uses_defaults() {
    let config: ReductionConfig = toml::from_str("").unwrap();

    assert!(config.background.subtract);
    assert!(!config.background.reset_flagged_in_sources);
    assert_eq!(config.background.edge_margin, 10);
    assert_abs_diff_eq!(config.background.rate_floor, -1.0);
    assert_abs_diff_eq!(config.background.median_cap, 5.0);

    assert_eq!(config.cosmic.region.min_col, 915);
    assert_eq!(config.cosmic.region.max_row, 295);
    assert_abs_diff_eq!(config.cosmic.faint_limit, 1.0);
    assert!(config.cosmic.custom.is_none());
    assert!(!config.cosmic.remove_custom);

    assert_abs_diff_eq!(config.detector.gain, 1.0);
    assert_abs_diff_eq!(config.detector.readnoise, 20.0);
    assert_abs_diff_eq!(config.detector.objlim, 15.0);
}

#[test]
fn partial_sections_override_only_their_keys() {
    let source = r#"
[background]
subtract = false
edge_margin = 4

[cosmic]
faint_limit = 0.5
custom = 2048
remove_custom = true

[cosmic.region]
min_col = 100
max_row = 50

[detector]
gain = 2.5
"#;
    let config: ReductionConfig = toml::from_str(source).unwrap();

    assert!(!config.background.subtract);
    assert_eq!(config.background.edge_margin, 4);
    // Untouched keys keep their defaults.
    assert_abs_diff_eq!(config.background.median_cap, 5.0);

    assert_eq!(config.cosmic.region.min_col, 100);
    assert_eq!(config.cosmic.region.max_row, 50);
    assert_abs_diff_eq!(config.cosmic.faint_limit, 0.5);
    assert_eq!(config.cosmic.custom, Some(2048));
    assert!(config.cosmic.remove_custom);

    assert_abs_diff_eq!(config.detector.gain, 2.5);
    assert_abs_diff_eq!(config.detector.readnoise, 20.0);
}

#[test]
fn config_round_trips_through_toml() {
    let config = ReductionConfig::default();
    let serialized = toml::to_string(&config).unwrap();
    let back: ReductionConfig = toml::from_str(&serialized).unwrap();
    assert_eq!(back.background.edge_margin, config.background.edge_margin);
    assert_eq!(back.cosmic.region.min_col, config.cosmic.region.min_col);
}
