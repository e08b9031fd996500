//! JSON export and import of whole mind maps
//!
//! Import validates the complete document before touching the map and
//! reports the first offending node by path, e.g. `root.children[2]`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::editor::MindMap;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Dimensions, DomainError, DomainResult, NodeData, NodeId, Side, StructuralError};

/// One node of the exported tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportNode {
    pub id: NodeId,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub level: usize,
    pub side: Side,
    pub children: Vec<ExportNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub is_selected: bool,
    /// Last measured size, kept so a reloaded map lays out the same.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl ExportNode {
    fn node_data(&self) -> NodeData {
        NodeData {
            id: self.id.clone(),
            text: self.text.clone(),
            kind: self.kind.clone(),
            data: self.data.clone(),
            selected: self.is_selected,
        }
    }

    fn dimensions(&self) -> Option<Dimensions> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(Dimensions::new(w, h)),
            _ => None,
        }
    }
}

/// Check a JSON document against the export format.
pub fn validate_tree(value: &Value) -> DomainResult<()> {
    let mut seen = HashSet::new();
    validate_node(value, "root", &mut seen)
}

fn validate_node<'a>(value: &'a Value, path: &str, seen: &mut HashSet<&'a str>) -> DomainResult<()> {
    let obj = value
        .as_object()
        .ok_or_else(|| DomainError::validation(path, "node must be an object"))?;
    let field = |name: &str| obj.get(name);
    let invalid = |name: &str, expected: &str| {
        DomainError::validation(path, format!("field `{}` must be {}", name, expected))
    };

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("id", "a string"))?;
    for name in ["text", "type"] {
        if !field(name).is_some_and(Value::is_string) {
            return Err(invalid(name, "a string"));
        }
    }
    if field("level").and_then(Value::as_u64).is_none() {
        return Err(invalid("level", "a non-negative integer"));
    }
    if !matches!(field("side").and_then(Value::as_str), Some("left" | "right")) {
        return Err(invalid("side", "\"left\" or \"right\""));
    }
    if field("data").is_some_and(|d| !d.is_object()) {
        return Err(invalid("data", "an object"));
    }
    if field("isSelected").is_some_and(|s| !s.is_boolean()) {
        return Err(invalid("isSelected", "a boolean"));
    }
    for name in ["width", "height"] {
        if field(name).is_some_and(|v| !v.as_f64().is_some_and(|n| n.is_finite() && n > 0.0)) {
            return Err(invalid(name, "a positive number"));
        }
    }
    let children = obj
        .get("children")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("children", "an array"))?;

    if !seen.insert(id) {
        return Err(DomainError::validation(path, format!("duplicate node id `{}`", id)));
    }
    for (i, child) in children.iter().enumerate() {
        validate_node(child, &format!("{}.children[{}]", path, i), seen)?;
    }
    Ok(())
}

impl MindMap {
    /// Snapshot the whole tree, root first.
    pub fn export(&self) -> DomainResult<ExportNode> {
        let root = self.root().ok_or(StructuralError::NoRoot)?;
        Ok(self.export_node(root))
    }

    fn export_node(&self, id: &NodeId) -> ExportNode {
        let data = self.node(id);
        let dims = self.dimensions(id);
        ExportNode {
            id: id.clone(),
            text: data.map(|d| d.text.clone()).unwrap_or_default(),
            kind: data.map(|d| d.kind.clone()).unwrap_or_default(),
            level: self.level(id).unwrap_or(0),
            side: self.side(id).unwrap_or_default(),
            children: self
                .children(id)
                .iter()
                .map(|child| self.export_node(child))
                .collect(),
            data: data.and_then(|d| d.data.clone()),
            is_selected: data.is_some_and(|d| d.selected),
            width: dims.map(|d| d.width),
            height: dims.map(|d| d.height),
        }
    }

    pub fn to_json(&self) -> ApplicationResult<String> {
        let tree = self.export()?;
        serde_json::to_string_pretty(&tree).map_err(|e| ApplicationError::Json {
            context: "export".to_string(),
            source: e,
        })
    }

    /// Replace the map's content with an exported tree.
    ///
    /// Levels are re-derived from the nesting and every descendant takes the
    /// side of its root branch, whatever the document says. On error the map
    /// is unchanged.
    #[instrument(level = "debug", skip(self, value))]
    pub fn import_value(&mut self, value: &Value) -> ApplicationResult<()> {
        validate_tree(value)?;
        let tree: ExportNode =
            serde_json::from_value(value.clone()).map_err(|e| ApplicationError::Json {
                context: "import".to_string(),
                source: e,
            })?;

        let mut fresh = MindMap::new(self.settings().clone());
        fresh.set_auto_layout(false);
        fresh.add_node_data(None, tree.node_data(), None)?;
        if let Some(dims) = tree.dimensions() {
            fresh.positioner.update_node_dimensions(&tree.id, dims);
        }
        for child in &tree.children {
            import_subtree(&mut fresh, &tree.id, child)?;
        }
        debug!("import: {} nodes", fresh.node_count());

        self.replace_tree(fresh);
        Ok(())
    }

    pub fn import_str(&mut self, json: &str) -> ApplicationResult<()> {
        let value: Value = serde_json::from_str(json).map_err(|e| ApplicationError::Json {
            context: "import".to_string(),
            source: e,
        })?;
        self.import_value(&value)
    }
}

fn import_subtree(map: &mut MindMap, parent: &NodeId, node: &ExportNode) -> DomainResult<()> {
    map.add_node_data(Some(parent), node.node_data(), Some(node.side))?;
    if let Some(dims) = node.dimensions() {
        map.positioner.update_node_dimensions(&node.id, dims);
    }
    for child in &node.children {
        import_subtree(map, &node.id, child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn leaf(id: &str) -> Value {
        json!({"id": id, "text": id, "type": "topic", "level": 1, "side": "right", "children": []})
    }

    #[test]
    fn validation_reports_nested_path() {
        let mut bad = leaf("c");
        bad["side"] = json!("up");
        let doc = json!({
            "id": "r", "text": "r", "type": "topic", "level": 0, "side": "right",
            "children": [leaf("a"), {"id": "b", "text": "b", "type": "topic", "level": 1,
                "side": "left", "children": [bad]}]
        });

        let err = validate_tree(&doc).unwrap_err();

        match err {
            DomainError::Validation { path, message } => {
                assert_eq!(path, "root.children[1].children[0]");
                assert!(message.contains("side"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_rejects_duplicate_ids() {
        let doc = json!({
            "id": "r", "text": "r", "type": "topic", "level": 0, "side": "right",
            "children": [leaf("a"), leaf("a")]
        });
        assert!(matches!(
            validate_tree(&doc),
            Err(DomainError::Validation { ref path, .. }) if path == "root.children[1]"
        ));
    }

    #[test]
    fn optional_fields_are_type_checked() {
        let mut doc = leaf("r");
        doc["isSelected"] = json!("yes");
        assert!(validate_tree(&doc).is_err());
        doc["isSelected"] = json!(true);
        doc["data"] = json!({"color": "red"});
        assert!(validate_tree(&doc).is_ok());
    }
}
