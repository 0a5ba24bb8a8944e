//! # Polyz Protocol
//!
//! Document and wire types shared by the indexer, the request controller and
//! the inference backend.
//!
//! ## Shapes
//!
//! ```text
//! ProjectIndex
//!     ├─ project_name, project_path
//!     ├─ scripts[]  ── ScriptRecord { file_path, lines_of_code, class_name, extends?, functions[], content_summary }
//!     ├─ scenes[]   ── SceneRecord  { file_path, lines_of_code, nodes[] ── NodeEntry { name, type?, script_attached? } }
//!     └─ metadata   ── IndexMetadata { total_files, total_scripts, total_scenes, created_at, indexed_by }
//!
//! PromptRequest { prompt, model?, project_index?, file_contents? }  ──>  POST body
//! ```

use serde::Serialize;

mod index;
mod request;
mod usage;

pub use index::{
    IndexMetadata, NodeEntry, ProjectIndex, SceneRecord, ScriptRecord, INDEXER_VERSION,
};
pub use request::{json_headers, PromptRequest};
pub use usage::TokenUsage;

/// Serialize with tab indentation, the layout used for the persisted index.
pub fn serialize_json_tabs<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}
