//! JSON export/import of mind maps.

use std::fs;
use std::path::PathBuf;

use rstest::rstest;
use serde_json::{json, Value};

use mindlayout::application::{ApplicationError, MindMap};
use mindlayout::config::Settings;
use mindlayout::domain::{Dimensions, DomainError, NodeId, Side, StructuralError};
use mindlayout::util::testing;

fn resource(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources/maps")
        .join(name)
}

fn load(name: &str) -> String {
    fs::read_to_string(resource(name)).expect("read test resource")
}

fn imported_project() -> MindMap {
    testing::init_test_setup();
    let mut map = MindMap::new(Settings::default());
    map.import_str(&load("project.json")).expect("import project");
    map
}

#[test]
fn given_project_file_when_imported_then_structure_and_content_restored() {
    // Act
    let map = imported_project();

    // Assert
    let root = NodeId::from("root");
    assert_eq!(map.root(), Some(&root));
    assert_eq!(map.node_count(), 6);
    let ids: Vec<&str> = map.children(&root).iter().map(|c| c.as_str()).collect();
    assert_eq!(ids, vec!["goals", "tasks"]);

    let tasks = NodeId::from("tasks");
    let node = map.node(&tasks).unwrap();
    assert_eq!(node.kind, "topic");
    assert_eq!(node.data.as_ref().unwrap()["owner"], json!("ops"));
    assert_eq!(map.dimensions(&tasks), Some(Dimensions::new(160.0, 60.0)));
    assert!(map.node(&NodeId::from("goals")).unwrap().selected);
    assert!(map.find_overlaps().is_empty());
}

#[test]
fn given_inconsistent_levels_and_sides_when_imported_then_rederived() {
    let map = imported_project();

    let q1 = NodeId::from("goals-q1");

    assert_eq!(map.level(&q1), Some(2));
    assert_eq!(map.side(&q1), Some(Side::Left));
    assert!(map.position(&q1).unwrap().x < 0.0);
}

#[test]
fn given_map_when_exported_then_uses_wire_field_names() {
    let map = imported_project();

    let value: Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();

    assert_eq!(value["type"], json!("central"));
    assert_eq!(value["level"], json!(0));
    let goals = &value["children"][0];
    assert_eq!(goals["isSelected"], json!(true));
    assert_eq!(goals["side"], json!("left"));
    assert_eq!(goals["children"][0]["level"], json!(2));
    assert!(goals.get("data").is_none());
    assert_eq!(value["children"][1]["data"]["priority"], json!(2));
}

#[test]
fn given_exported_map_when_reimported_then_layout_matches() {
    let map = imported_project();
    let json = map.to_json().unwrap();

    let mut copy = MindMap::new(Settings::default());
    copy.import_str(&json).unwrap();

    assert_eq!(copy.export().unwrap(), map.export().unwrap());
    let before: Vec<_> = map.positions().into_iter().cloned().collect();
    let after: Vec<_> = copy.positions().into_iter().cloned().collect();
    assert_eq!(after, before);
}

#[rstest]
#[case::bad_side("bad_side.json", "root.children[1].children[0]", "side")]
#[case::duplicate_ids("duplicate_ids.json", "root.children[1]", "duplicate")]
fn given_invalid_document_when_imported_then_rejected_with_path_and_map_unchanged(
    #[case] file: &str,
    #[case] expected_path: &str,
    #[case] expected_message: &str,
) {
    // Arrange
    let mut map = imported_project();
    let before = map.export().unwrap();

    // Act
    let err = map.import_str(&load(file)).unwrap_err();

    // Assert
    match err {
        ApplicationError::Domain(DomainError::Validation { path, message }) => {
            assert_eq!(path, expected_path);
            assert!(message.contains(expected_message), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(map.export().unwrap(), before);
}

#[rstest]
#[case::missing_children(json!({"id": "r", "text": "", "type": "t", "level": 0, "side": "right"}), "children")]
#[case::negative_level(json!({"id": "r", "text": "", "type": "t", "level": -1, "side": "right", "children": []}), "level")]
#[case::numeric_text(json!({"id": "r", "text": 5, "type": "t", "level": 0, "side": "right", "children": []}), "text")]
#[case::not_an_object(json!(["r"]), "object")]
#[case::zero_width(json!({"id": "r", "text": "", "type": "t", "level": 0, "side": "right", "width": 0.0, "height": 300.0, "children": []}), "width")]
fn given_malformed_node_when_imported_then_field_is_named(#[case] doc: Value, #[case] field: &str) {
    let mut map = MindMap::new(Settings::default());

    let err = map.import_value(&doc).unwrap_err();

    assert!(err.to_string().contains(field), "{err}");
    assert_eq!(map.node_count(), 0);
}

#[test]
fn given_garbage_when_imported_then_json_error() {
    let mut map = MindMap::new(Settings::default());
    let err = map.import_str("{ not json").unwrap_err();
    assert!(matches!(err, ApplicationError::Json { .. }));
}

#[test]
fn given_empty_map_when_exported_then_no_root() {
    let map = MindMap::new(Settings::default());
    assert_eq!(map.export().unwrap_err(), DomainError::from(StructuralError::NoRoot));
}
