use serde::{Deserialize, Serialize};

/// Version tag stamped into every index document.
pub const INDEXER_VERSION: &str = "polyz.ai v0.1";

/// One node declaration found in a scene file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,

    /// Declared node type; instanced sub-scenes carry none
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    /// Script resource path attached to the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_attached: Option<String>,
}

impl NodeEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: None,
            script_attached: None,
        }
    }
}

/// Structural summary of one script file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub file_path: String,

    pub lines_of_code: usize,

    /// Declared type name, or the file base name when the script declares none
    pub class_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Function/method names in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,

    pub content_summary: String,
}

/// Structural summary of one scene file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub file_path: String,

    pub lines_of_code: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub total_files: usize,
    pub total_scripts: usize,
    pub total_scenes: usize,

    /// UTC, `YYYY-MM-DDTHH:MM:SSZ`
    pub created_at: String,

    pub indexed_by: String,
}

/// The project index document sent as context with a prompt.
///
/// Built once per indexing run and never mutated afterwards: fields are only
/// reachable through shared accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIndex {
    project_name: String,
    project_path: String,
    #[serde(default)]
    scripts: Vec<ScriptRecord>,
    #[serde(default)]
    scenes: Vec<SceneRecord>,
    metadata: IndexMetadata,
}

impl ProjectIndex {
    /// Assemble a document; metadata counts are derived from the records.
    pub fn new(
        project_name: impl Into<String>,
        project_path: impl Into<String>,
        scripts: Vec<ScriptRecord>,
        scenes: Vec<SceneRecord>,
        created_at: impl Into<String>,
    ) -> Self {
        let metadata = IndexMetadata {
            total_files: scripts.len() + scenes.len(),
            total_scripts: scripts.len(),
            total_scenes: scenes.len(),
            created_at: created_at.into(),
            indexed_by: INDEXER_VERSION.to_string(),
        };
        Self {
            project_name: project_name.into(),
            project_path: project_path.into(),
            scripts,
            scenes,
            metadata,
        }
    }

    /// Report discovered file counts in the metadata instead of record
    /// counts, so files that could not be read still count.
    pub fn with_discovered(mut self, scripts: usize, scenes: usize) -> Self {
        self.metadata.total_scripts = scripts;
        self.metadata.total_scenes = scenes;
        self.metadata.total_files = scripts + scenes;
        self
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    pub fn scripts(&self) -> &[ScriptRecord] {
        &self.scripts
    }

    pub fn scenes(&self) -> &[SceneRecord] {
        &self.scenes
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn script(&self, file_path: &str) -> Option<&ScriptRecord> {
        self.scripts.iter().find(|s| s.file_path == file_path)
    }

    pub fn scene(&self, file_path: &str) -> Option<&SceneRecord> {
        self.scenes.iter().find(|s| s.file_path == file_path)
    }

    /// Tab-indented JSON, the persisted artifact layout
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        crate::serialize_json_tabs(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ProjectIndex {
        ProjectIndex::new(
            "Platformer",
            "res://",
            vec![
                ScriptRecord {
                    file_path: "res://player.gd".to_string(),
                    lines_of_code: 42,
                    class_name: "Player".to_string(),
                    extends: Some("CharacterBody2D".to_string()),
                    functions: vec!["_ready".to_string(), "jump".to_string()],
                    content_summary: "GDScript extending CharacterBody2D with 2 functions"
                        .to_string(),
                },
                ScriptRecord {
                    file_path: "res://util/math.gd".to_string(),
                    lines_of_code: 3,
                    class_name: "math".to_string(),
                    extends: None,
                    functions: vec![],
                    content_summary: "GDScript".to_string(),
                },
            ],
            vec![SceneRecord {
                file_path: "res://main.tscn".to_string(),
                lines_of_code: 12,
                nodes: vec![NodeEntry {
                    name: "Player".to_string(),
                    node_type: Some("CharacterBody2D".to_string()),
                    script_attached: Some("res://player.gd".to_string()),
                }],
            }],
            "2026-10-19T08:30:00Z",
        )
    }

    #[test]
    fn metadata_counts_follow_records() {
        let index = sample();
        let meta = index.metadata();
        assert_eq!(meta.total_files, 3);
        assert_eq!(meta.total_scripts, 2);
        assert_eq!(meta.total_scenes, 1);
        assert_eq!(meta.indexed_by, INDEXER_VERSION);
    }

    #[test]
    fn discovered_counts_override_record_counts() {
        let index = sample().with_discovered(3, 1);
        let meta = index.metadata();
        assert_eq!(meta.total_scripts, 3);
        assert_eq!(meta.total_scenes, 1);
        assert_eq!(meta.total_files, 4);
        assert_eq!(index.scripts().len(), 2);
    }

    #[test]
    fn json_round_trip_preserves_paths_and_counts() {
        let index = sample();
        let json = index.to_json_pretty().unwrap();
        let parsed = ProjectIndex::from_json(&json).unwrap();

        assert_eq!(parsed.scripts().len(), index.scripts().len());
        assert_eq!(parsed.scenes().len(), index.scenes().len());
        let paths: Vec<&str> = parsed.scripts().iter().map(|s| s.file_path.as_str()).collect();
        assert_eq!(paths, vec!["res://player.gd", "res://util/math.gd"]);
        assert_eq!(parsed, index);
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let json = sample().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let math = &value["scripts"][1];
        assert!(math.get("extends").is_none());
        assert!(math.get("functions").is_none());
        assert_eq!(value["scenes"][0]["nodes"][0]["type"], "CharacterBody2D");
    }

    #[test]
    fn pretty_output_uses_tabs() {
        let json = sample().to_json_pretty().unwrap();
        assert!(json.contains("\n\t\"project_name\": \"Platformer\""));
    }

    #[test]
    fn scene_without_nodes_reads_back_empty() {
        let text = r#"{"file_path":"res://a.scn","lines_of_code":0}"#;
        let scene: SceneRecord = serde_json::from_str(text).unwrap();
        assert!(scene.nodes.is_empty());
    }
}
