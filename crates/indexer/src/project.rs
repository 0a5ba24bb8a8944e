use crate::path::RES_ROOT;
use crate::tree::FileTree;

pub const PROJECT_FILE: &str = "project.godot";

const FALLBACK_NAME: &str = "Untitled Project";

/// Display name of the project.
///
/// `configured` wins when set; otherwise `config/name` under `[application]`
/// in `res://project.godot`, then the root directory name.
pub fn project_name(tree: &dyn FileTree, configured: Option<&str>) -> String {
    if let Some(name) = configured.filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }

    tree.read_to_string(&format!("{RES_ROOT}{PROJECT_FILE}"))
        .ok()
        .and_then(|text| declared_name(&text))
        .or_else(|| tree.root_name())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

fn declared_name(project_file: &str) -> Option<String> {
    let mut section = "";
    for raw in project_file.lines() {
        let line = raw.trim();
        if line.starts_with('[') && line.ends_with(']') {
            section = &line[1..line.len() - 1];
            continue;
        }
        if section != "application" {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == "config/name" {
            let name = value.trim().trim_matches('"').trim();
            return (!name.is_empty()).then(|| name.to_string());
        }
    }
    None
}
