//! Prompt enrichment: the user's prompt followed by a plain-text `Context:`
//! block with editor state and file contents.
//!
//! ```text
//! <prompt>
//!
//! Context:
//!
//! Currently Edited Scene: res://main.tscn
//! <script content of a selected node, capped>
//! Selected Node: Player (Path: /root/Main/Player) Script: res://player.gd
//!
//! Scene: res://main.tscn
//! <content, capped>
//!
//! Script: res://player.gd
//! <content, capped>
//! ```

use crate::error::Result;
use crate::path;
use crate::scanner::{FileScanner, ScanMode};
use crate::tree::FileTree;

/// Per-file character ceiling for embedded content
pub const MAX_CONTENT_CHARS: usize = 8000;

pub const TRUNCATION_MARKER: &str = "\n[Content truncated due to size...]";

/// A node selected in the editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedNode {
    pub name: String,

    /// Node path inside the scene tree, e.g. `/root/Main/Player`
    pub path: String,

    /// Attached script, if any
    pub script: Option<String>,
}

/// Editor state captured when a prompt is sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub open_scenes: Vec<String>,
    pub edited_scene: Option<String>,
    pub selection: Vec<SelectedNode>,
}

/// File content for embedding, cut at [`MAX_CONTENT_CHARS`] characters.
///
/// Unreadable files render as an inline error line instead of failing.
pub fn read_capped(tree: &dyn FileTree, res_path: &str) -> String {
    match tree.read_to_string(res_path) {
        Ok(content) => cap_content(content),
        Err(e) => {
            log::debug!("Could not read {res_path} for context: {e}");
            format!("Error: Could not open file {res_path}")
        }
    }
}

/// Truncate to [`MAX_CONTENT_CHARS`] characters and append the marker
pub fn cap_content(content: String) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => {
            let mut capped = content[..cut].to_string();
            capped.push_str(TRUNCATION_MARKER);
            capped
        }
        None => content,
    }
}

/// Append the context block for `prompt`.
///
/// Files come from a traversal in `mode`; open scenes are added after the
/// matched ones without duplicates. Selection lines are only emitted when a
/// scene is being edited.
pub fn enrich_prompt(
    tree: &dyn FileTree,
    prompt: &str,
    mode: &ScanMode,
    snapshot: &EditorSnapshot,
) -> Result<String> {
    let scan = FileScanner::new(tree).scan(mode)?;

    let mut scenes: Vec<String> = scan.scenes().map(|f| f.path.clone()).collect();
    let scripts: Vec<String> = scan.scripts().map(|f| f.path.clone()).collect();
    for open in &snapshot.open_scenes {
        let open = path::normalize(open);
        if !scenes.contains(&open) {
            scenes.push(open);
        }
    }

    let mut context = String::from("\n\nContext:\n");

    if let Some(edited) = &snapshot.edited_scene {
        context.push_str(&format!("\nCurrently Edited Scene: {edited}\n"));
        for node in &snapshot.selection {
            let mut info = format!("Selected Node: {} (Path: {})", node.name, node.path);
            if let Some(script) = &node.script {
                info.push_str(" Script: ");
                info.push_str(script);
                if !script.is_empty() {
                    context.push_str(&read_capped(tree, script));
                    context.push('\n');
                }
            }
            context.push_str(&info);
            context.push('\n');
        }
    }

    for scene in &scenes {
        context.push_str(&format!("\nScene: {scene}\n"));
        context.push_str(&read_capped(tree, scene));
        context.push('\n');
    }
    for script in &scripts {
        context.push_str(&format!("\nScript: {script}\n"));
        context.push_str(&read_capped(tree, script));
        context.push('\n');
    }

    log::debug!(
        "Enriched prompt with {} scenes and {} scripts ({} chars of context)",
        scenes.len(),
        scripts.len(),
        context.len()
    );
    Ok(format!("{prompt}{context}"))
}
