use crate::Result;
use polyz_protocol::ProjectIndex;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the project root holding polyz state
pub const STATE_DIR: &str = ".polyz";

pub const INDEX_FILE: &str = "project_index.json";

/// Text returned when no usable artifact exists
pub const EMPTY_INDEX_JSON: &str = "{}";

#[must_use]
pub fn index_file_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join(INDEX_FILE)
}

/// Persist the document as tab-indented JSON, creating parent directories
pub fn write_index(path: &Path, index: &ProjectIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = index.to_json_pretty()?;
    fs::write(path, json)?;
    log::info!("Project index saved to {}", path.display());
    Ok(())
}

/// Artifact text ready to embed in a request.
///
/// Never fails: a missing, unreadable or malformed artifact yields `{}`.
pub fn load_index_json(path: &Path) -> String {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No project index at {}", path.display());
            return EMPTY_INDEX_JSON.to_string();
        }
        Err(err) => {
            log::warn!("Failed to read project index {}: {err}", path.display());
            return EMPTY_INDEX_JSON.to_string();
        }
    };

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(_) => text,
        Err(err) => {
            log::warn!("Ignoring malformed project index {}: {err}", path.display());
            EMPTY_INDEX_JSON.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use polyz_protocol::ScriptRecord;
    use tempfile::tempdir;

    fn sample() -> ProjectIndex {
        ProjectIndex::new(
            "Demo",
            "/games/demo",
            vec![ScriptRecord {
                file_path: "res://player.gd".to_string(),
                lines_of_code: 3,
                class_name: "Player".to_string(),
                extends: Some("Node".to_string()),
                functions: vec!["_ready".to_string()],
                content_summary: "GDScript extending Node with 1 functions".to_string(),
            }],
            Vec::new(),
            "2024-05-01T10:00:00Z",
        )
    }

    #[test]
    fn write_then_load() {
        let temp = tempdir().unwrap();
        let path = index_file_path(temp.path());
        write_index(&path, &sample()).unwrap();

        let text = load_index_json(&path);
        assert!(text.contains("\n\t\"project_name\": \"Demo\""));
        assert_eq!(ProjectIndex::from_json(&text).unwrap(), sample());
    }

    #[test]
    fn missing_or_malformed_yields_empty_object() {
        let temp = tempdir().unwrap();
        let path = index_file_path(temp.path());
        assert_eq!(load_index_json(&path), "{}");

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_index_json(&path), "{}");

        // a directory where the file should be
        let dir_path = temp.path().join("as_dir");
        fs::create_dir_all(&dir_path).unwrap();
        assert_eq!(load_index_json(&dir_path), "{}");
    }
}
