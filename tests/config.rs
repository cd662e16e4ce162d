use std::fs;

use assert_matches::assert_matches;

use seqdedup::config::{
    Config, ConfigLoader, DEFAULT_CONFIG_FILE, ResolvedConfig, TypeMarkerEntry, TypeMarkerObject,
};
use seqdedup::error::SeqDedupError;
use seqdedup::fasta::DEFAULT_LINE_WIDTH;

#[test]
fn parse_config_shorthand_and_detailed() {
    let config = Config {
        schema_version: None,
        type_markers: vec![
            TypeMarkerEntry::Shorthand("BU_ATCC8492".to_string()),
            TypeMarkerEntry::Detailed(TypeMarkerObject {
                marker: "BU_DSM2079".to_string(),
            }),
        ],
        line_width: Some(80),
        manifest: Some("unique.json".to_string()),
    };

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.type_markers.len(), 2);
    assert!(resolved.type_markers.matches("BU_DSM2079_CDS7"));
    assert_eq!(resolved.line_width, 80);
    assert_eq!(resolved.manifest.as_deref(), Some("unique.json"));
}

#[test]
fn duplicate_markers_collapse() {
    let config: Config =
        serde_json::from_str(r#"{"type_markers": ["X_2", {"marker": "X_2"}]}"#).unwrap();
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.type_markers.len(), 1);
    assert_eq!(resolved.line_width, DEFAULT_LINE_WIDTH);
}

#[test]
fn blank_marker_rejected() {
    let config: Config = serde_json::from_str(r#"{"type_markers": [" "]}"#).unwrap();
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, SeqDedupError::InvalidTypeMarker(_));
}

#[test]
fn load_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("seqdedup.json");
    fs::write(&path, r#"{"schema_version": 1, "type_markers": ["BU_ATCC8492"], "line_width": 0}"#)
        .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.line_width, 0);
    assert!(resolved.type_markers.matches("BU_ATCC8492_1"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve_or_default(path.to_str()).unwrap_err();
    assert_matches!(err, SeqDedupError::ConfigRead(_));
}

#[test]
fn invalid_json_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("seqdedup.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, SeqDedupError::ConfigParse(_));
}

#[test]
fn detailed_entry_ignores_extra_keys() {
    let config: Config = serde_json::from_str(
        r#"{"type_markers": [{"marker": "BU_DSM2079", "label": "B. uniformis type strain"}]}"#,
    )
    .unwrap();
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert!(resolved.type_markers.matches("BU_DSM2079_CDS7"));
}

#[test]
fn absent_default_file_falls_back_to_defaults() {
    // Tests run from the package root, which carries no config file.
    assert!(!std::path::Path::new(DEFAULT_CONFIG_FILE).exists());
    assert_matches!(ConfigLoader::resolve(None), Err(SeqDedupError::MissingConfig));

    let resolved = ConfigLoader::resolve_or_default(None).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert!(resolved.type_markers.is_empty());
    assert_eq!(resolved.line_width, DEFAULT_LINE_WIDTH);
}

#[test]
fn command_line_markers_extend_file_markers() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("seqdedup.json");
    fs::write(&path, r#"{"type_markers": ["BU_ATCC8492"]}"#).unwrap();

    let cli = vec!["X_2".to_string()];
    let resolved = ConfigLoader::resolve_or_default(path.to_str())
        .unwrap()
        .with_type_markers(&cli)
        .unwrap();
    assert_eq!(resolved.type_markers.len(), 2);
    assert!(resolved.type_markers.matches("BU_ATCC8492_1"));
    assert!(resolved.type_markers.matches("X_2"));
}

#[test]
fn invalid_command_line_marker_is_rejected() {
    let err = ResolvedConfig::default()
        .with_type_markers(&["two words"])
        .unwrap_err();
    assert_matches!(err, SeqDedupError::InvalidTypeMarker(_));
    assert_eq!(err.exit_code(), 2);
}
