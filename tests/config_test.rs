//! Layered settings loading: defaults, global file, local file, environment.

use std::fs;

use rstest::rstest;
use tempfile::TempDir;

use mindlayout::application::ApplicationError;
use mindlayout::config::{local_config_path, Settings};
use mindlayout::domain::StackingMode;

#[test]
fn given_no_files_when_loading_layers_then_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load_layers(
        Some(&dir.path().join("missing.toml")),
        Some(&local_config_path(dir.path())),
    )
    .expect("load defaults");

    assert_eq!(settings, Settings::default());
}

#[test]
fn given_global_and_local_files_when_loading_then_local_wins_per_field() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let global = dir.path().join("mindlayout.toml");
    fs::write(
        &global,
        "horizontal_spacing = 100.0\nvertical_margin = 30.0\nstacking = \"bounding-box\"\n",
    )
    .unwrap();
    let local = local_config_path(dir.path());
    fs::write(&local, "vertical_margin = 12.5\nroot_x = 400.0\n").unwrap();

    // Act
    let settings = Settings::load_layers(Some(&global), Some(&local)).unwrap();

    // Assert
    assert_eq!(settings.horizontal_spacing, 100.0);
    assert_eq!(settings.vertical_margin, 12.5);
    assert_eq!(settings.root_x, 400.0);
    assert_eq!(settings.stacking, StackingMode::BoundingBox);
    assert_eq!(settings.node_width, 120.0);
}

#[test]
fn given_broken_toml_when_loading_then_config_error_names_file() {
    let dir = TempDir::new().unwrap();
    let local = local_config_path(dir.path());
    fs::write(&local, "vertical_margin = = 3").unwrap();

    let err = Settings::load_layers(None, Some(&local)).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
    assert!(err.to_string().contains(".mindlayout.toml"));
}

#[test]
fn given_file_and_env_when_overriding_then_env_wins() {
    let dir = TempDir::new().unwrap();
    let local = local_config_path(dir.path());
    fs::write(&local, "horizontal_spacing = 10.0\n").unwrap();
    let mut env = config::Map::new();
    env.insert("MINDLAYOUT_HORIZONTAL_SPACING".to_string(), "55".to_string());

    let settings = Settings::load_layers(None, Some(&local)).unwrap();
    let settings = Settings::apply_env_overrides(settings, Some(env)).unwrap();

    assert_eq!(settings.horizontal_spacing, 55.0);
}

#[test]
fn given_unknown_stacking_in_env_when_overriding_then_error() {
    let mut env = config::Map::new();
    env.insert("MINDLAYOUT_STACKING".to_string(), "spiral".to_string());

    let err = Settings::apply_env_overrides(Settings::default(), Some(env)).unwrap_err();

    assert!(err.to_string().contains("spiral"));
}

#[rstest]
#[case::negative_margin(Settings { vertical_margin: -1.0, ..Default::default() }, "vertical_margin")]
#[case::zero_height(Settings { node_height: 0.0, ..Default::default() }, "node_height")]
#[case::infinite_anchor(Settings { root_y: f64::INFINITY, ..Default::default() }, "root_y")]
fn given_out_of_range_value_when_validating_then_field_reported(
    #[case] settings: Settings,
    #[case] field: &str,
) {
    let err = settings.validate().unwrap_err();
    assert!(err.to_string().contains(field), "{err}");
}

#[test]
fn given_settings_when_rendered_as_toml_then_parses_back() {
    let settings = Settings {
        stacking: StackingMode::BoundingBox,
        ..Default::default()
    };

    let text = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&text).unwrap();

    assert_eq!(parsed, settings);
    assert!(text.contains("stacking = \"bounding-box\""));
}

#[test]
fn given_template_when_parsed_then_yields_defaults() {
    let parsed: Settings = toml::from_str(&Settings::template()).unwrap();
    assert_eq!(parsed, Settings::default());
}
