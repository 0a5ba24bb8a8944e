//! # Polyz Extract
//!
//! Best-effort structural metadata for project files, gathered by trimming
//! each line and matching literal prefixes. These are pattern matches, not
//! parsers: anything that does not match is skipped and extraction never
//! fails.
//!
//! ## Architecture
//!
//! ```text
//! file path
//!     │
//!     ├──> FileKind::from_path   (gd / cs → Script(dialect), tscn / scn → Scene)
//!     │
//!     └──> ExtractorRegistry
//!            ├─ ScriptExtractor per Dialect ── extract(text) → ScriptOutline
//!            └─ SceneExtractor               ── extract(text) → SceneOutline
//! ```
//!
//! ## Example
//!
//! ```rust
//! use polyz_extract::{Dialect, ExtractorRegistry};
//!
//! let registry = ExtractorRegistry::default();
//! let outline = registry
//!     .script(Dialect::GdScript)
//!     .unwrap()
//!     .extract("extends Node2D\n\nfunc _ready():\n\tpass\n");
//!
//! assert_eq!(outline.extends.as_deref(), Some("Node2D"));
//! assert_eq!(outline.functions, vec!["_ready"]);
//! ```

mod csharp;
mod dialect;
mod gdscript;
mod registry;
mod scene;
mod strategy;

pub use csharp::CSharpExtractor;
pub use dialect::{Dialect, FileKind, SceneFormat};
pub use gdscript::GdScriptExtractor;
pub use registry::ExtractorRegistry;
pub use scene::TextSceneExtractor;
pub use strategy::{SceneExtractor, SceneOutline, ScriptExtractor, ScriptOutline};

/// Line count as reported in index records: newline-separated segments, so a
/// trailing newline contributes one empty line.
pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

#[cfg(test)]
mod tests {
    use super::line_count;

    #[test]
    fn counts_segments() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("a\nb\n"), 3);
    }
}
