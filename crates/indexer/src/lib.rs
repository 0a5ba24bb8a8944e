//! # Polyz Indexer
//!
//! Project traversal and index document assembly for a Godot project, plus
//! prompt enrichment from editor state.
//!
//! ## Pipeline
//!
//! ```text
//! FileTree (disk or memory)
//!     │
//!     ├──> FileScanner (depth-first, exhaustive or keyword-filtered)
//!     │      └─> classified res:// paths
//!     │
//!     ├──> ExtractorRegistry (per-dialect line scanners)
//!     │      └─> ScriptRecord / SceneRecord
//!     │
//!     └──> ProjectIndex + IndexStats
//!            └─> .polyz/project_index.json (tab-indented)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use polyz_indexer::{index_file_path, write_index, FsTree, ProjectIndexer};
//!
//! fn main() -> polyz_indexer::Result<()> {
//!     let tree = FsTree::new("/path/to/project")?;
//!     let run = ProjectIndexer::new(&tree).index()?;
//!
//!     write_index(&index_file_path(tree.root_path()), &run.index)?;
//!     println!("Indexed {}", run.stats);
//!     Ok(())
//! }
//! ```

mod artifact;
mod context;
mod error;
mod indexer;
pub mod path;
mod project;
mod scanner;
mod stats;
mod tree;

pub use artifact::{
    index_file_path, load_index_json, write_index, EMPTY_INDEX_JSON, INDEX_FILE, STATE_DIR,
};
pub use context::{
    cap_content, enrich_prompt, read_capped, EditorSnapshot, SelectedNode, MAX_CONTENT_CHARS,
    TRUNCATION_MARKER,
};
pub use error::{IndexerError, Result};
pub use indexer::{timestamp_now, IndexRun, ProjectIndexer};
pub use project::{project_name, PROJECT_FILE};
pub use scanner::{FileScanner, Scan, ScanMode, ScannedFile};
pub use stats::IndexStats;
pub use tree::{DirListing, FileTree, FsTree, MemoryTree};
