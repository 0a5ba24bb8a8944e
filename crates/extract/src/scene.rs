use std::collections::HashMap;

use polyz_protocol::NodeEntry;

use crate::strategy::{SceneExtractor, SceneOutline};

const SCENE_HEADER: &str = "[gd_scene";
const NODE_MARKER: &str = "[node name=";
const EXT_RESOURCE_MARKER: &str = "[ext_resource";
const SCRIPT_MARKER: &str = "script = ExtResource";

/// Text scene (`.tscn`) node outline.
///
/// Nodes are emitted in declaration order. `script = ExtResource(..)` lines
/// attach to the most recent node and resolve through the scene's
/// `[ext_resource]` table; an unknown id is kept as written.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSceneExtractor;

impl SceneExtractor for TextSceneExtractor {
    fn extract(&self, text: &str) -> SceneOutline {
        if !text.trim_start().starts_with(SCENE_HEADER) {
            log::debug!("No {SCENE_HEADER} header, skipping node scan");
            return SceneOutline::default();
        }

        let mut resources: HashMap<String, String> = HashMap::new();
        let mut nodes = Vec::new();
        let mut current: Option<NodeEntry> = None;
        // Property lines only belong to a node until the next section header
        let mut in_node = false;

        for raw in text.lines() {
            let line = raw.trim();

            if line.starts_with(NODE_MARKER) {
                nodes.extend(current.take());
                current = attr_value(line, "name").map(|name| {
                    let mut node = NodeEntry::new(name);
                    node.node_type = attr_value(line, "type");
                    node
                });
                in_node = current.is_some();
                continue;
            }

            if line.starts_with(EXT_RESOURCE_MARKER) {
                if let (Some(id), Some(path)) = (attr_value(line, "id"), attr_value(line, "path")) {
                    resources.insert(id, path);
                }
                in_node = false;
                continue;
            }

            if line.starts_with('[') {
                in_node = false;
                continue;
            }

            if in_node && line.starts_with(SCRIPT_MARKER) {
                if let Some(node) = current.as_mut() {
                    node.script_attached = script_reference(line, &resources);
                }
            }
        }
        nodes.extend(current);

        SceneOutline {
            structured: true,
            nodes,
        }
    }
}

/// Value of `key=...` inside a section header, quoted or bare.
///
/// `[ext_resource path="res://a.gd" type="Script" id=1]` yields `res://a.gd`
/// for `path` and `1` for `id`.
fn attr_value(line: &str, key: &str) -> Option<String> {
    let mut search = 0;
    while let Some(offset) = line[search..].find(key) {
        let start = search + offset;
        let after = start + key.len();
        search = after;

        // Must be a whole attribute name, e.g. `type` but not `node_type`
        let preceded_ok = line[..start]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace() || c == '[' || c == '(');
        let Some(rest) = line[after..].strip_prefix('=') else {
            continue;
        };
        if !preceded_ok {
            continue;
        }

        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"')?;
            return Some(quoted[..end].to_string());
        }
        let end = rest
            .find(|c: char| c.is_whitespace() || c == ']')
            .unwrap_or(rest.len());
        let value = rest[..end].trim();
        return (!value.is_empty()).then(|| value.to_string());
    }
    None
}

/// `script = ExtResource("1_abc")`, `script = ExtResource( 1 )` or an inline
/// `path="res://..."`
fn script_reference(line: &str, resources: &HashMap<String, String>) -> Option<String> {
    if let Some(path) = attr_value(line, "path") {
        return Some(path);
    }
    let open = line.find('(')?;
    let close = line[open..].find(')')? + open;
    let id = line[open + 1..close].trim().trim_matches('"').trim();
    if id.is_empty() {
        return None;
    }
    match resources.get(id) {
        Some(path) => Some(path.clone()),
        None => {
            log::debug!("Script resource id {id} has no ext_resource entry, keeping it as written");
            Some(id.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LEVEL: &str = r#"[gd_scene load_steps=3 format=3 uid="uid://c4k2"]

[ext_resource type="Script" path="res://actors/player.gd" id="1_pl"]
[ext_resource type="Texture2D" uid="uid://b7" path="res://art/hero.png" id="2_tx"]

[node name="Level" type="Node2D"]

[node name="Player" type="CharacterBody2D" parent="."]
script = ExtResource("1_pl")

[node name="Sprite" type="Sprite2D" parent="Player"]
texture = ExtResource("2_tx")

[node name="Door" parent="." instance=ExtResource("3_dr")]
"#;

    #[test]
    fn nodes_in_declaration_order() {
        let outline = TextSceneExtractor.extract(LEVEL);
        assert!(outline.structured);

        let names: Vec<&str> = outline.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Level", "Player", "Sprite", "Door"]);
        assert_eq!(outline.nodes[0].node_type.as_deref(), Some("Node2D"));
        assert_eq!(outline.nodes[3].node_type, None);
    }

    #[test]
    fn script_resolves_through_ext_resources() {
        let outline = TextSceneExtractor.extract(LEVEL);
        assert_eq!(
            outline.nodes[1].script_attached.as_deref(),
            Some("res://actors/player.gd")
        );
        assert_eq!(outline.nodes[0].script_attached, None);
        assert_eq!(outline.nodes[2].script_attached, None);
    }

    #[test]
    fn godot3_unquoted_ids() {
        let text = "[gd_scene load_steps=2 format=2]\n\n\
                    [ext_resource path=\"res://enemy.gd\" type=\"Script\" id=1]\n\n\
                    [node name=\"Enemy\" type=\"KinematicBody2D\"]\n\
                    script = ExtResource( 1 )\n";
        let outline = TextSceneExtractor.extract(text);
        assert_eq!(outline.nodes.len(), 1);
        assert_eq!(
            outline.nodes[0].script_attached.as_deref(),
            Some("res://enemy.gd")
        );
    }

    #[test]
    fn unknown_resource_id_is_kept() {
        let text = "[gd_scene format=3]\n[node name=\"A\" type=\"Node\"]\nscript = ExtResource(\"9_x\")\n";
        let outline = TextSceneExtractor.extract(text);
        assert_eq!(outline.nodes[0].script_attached.as_deref(), Some("9_x"));
    }

    #[test]
    fn inline_script_path_is_used_directly() {
        let text = "[gd_scene format=2]\n[node name=\"A\" type=\"Node\"]\nscript = ExtResource(path=\"res://a.gd\")\n";
        let outline = TextSceneExtractor.extract(text);
        assert_eq!(outline.nodes[0].script_attached.as_deref(), Some("res://a.gd"));
    }

    #[test]
    fn script_outside_node_section_is_ignored() {
        let text = "[gd_scene format=3]\n\
                    [node name=\"A\" type=\"Node\"]\n\
                    [sub_resource type=\"GDScript\" id=\"s\"]\n\
                    script = ExtResource(\"1\")\n";
        let outline = TextSceneExtractor.extract(text);
        assert_eq!(outline.nodes.len(), 1);
        assert_eq!(outline.nodes[0].script_attached, None);
    }

    #[test]
    fn non_scene_text_is_unstructured() {
        let outline = TextSceneExtractor.extract("RSCC\u{0}\u{1}binary junk");
        assert_eq!(outline, SceneOutline::default());
        assert!(!outline.structured);

        let outline = TextSceneExtractor.extract("");
        assert!(!outline.structured);
    }

    #[test]
    fn attr_value_matches_whole_keys() {
        let line = r#"[node name="Hud" type="CanvasLayer" parent="." node_type="x"]"#;
        assert_eq!(attr_value(line, "type").as_deref(), Some("CanvasLayer"));
        assert_eq!(attr_value(line, "name").as_deref(), Some("Hud"));
        assert_eq!(attr_value(line, "missing"), None);
        assert_eq!(attr_value("[ext_resource id=7]", "id").as_deref(), Some("7"));
    }
}
