use crate::error::Result;
use crate::path;
use crate::project::project_name;
use crate::scanner::{FileScanner, ScanMode, ScannedFile};
use crate::stats::IndexStats;
use crate::tree::FileTree;
use polyz_extract::{line_count, Dialect, ExtractorRegistry, FileKind};
use polyz_protocol::{ProjectIndex, SceneRecord, ScriptRecord};
use std::time::Instant;

/// A finished indexing run
#[derive(Debug, Clone)]
pub struct IndexRun {
    pub index: ProjectIndex,
    pub stats: IndexStats,
}

/// Builds a [`ProjectIndex`] from a [`FileTree`]
pub struct ProjectIndexer<'a> {
    tree: &'a dyn FileTree,
    registry: ExtractorRegistry,
    configured_name: Option<String>,
}

impl<'a> ProjectIndexer<'a> {
    pub fn new(tree: &'a dyn FileTree) -> Self {
        Self {
            tree,
            registry: ExtractorRegistry::default(),
            configured_name: None,
        }
    }

    /// Name that overrides the one declared in `project.godot`
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.configured_name = Some(name.into());
        self
    }

    /// Index every script and scene in the project
    pub fn index(&self) -> Result<IndexRun> {
        self.index_with_mode(&ScanMode::Exhaustive)
    }

    pub fn index_with_mode(&self, mode: &ScanMode) -> Result<IndexRun> {
        self.index_at(mode, timestamp_now())
    }

    /// Index with an explicit `created_at` stamp
    pub fn index_at(&self, mode: &ScanMode, created_at: String) -> Result<IndexRun> {
        let start = Instant::now();
        log::info!("Indexing project at {}", self.tree.root());

        let scan = FileScanner::new(self.tree).scan(mode)?;
        let mut stats = IndexStats::new();
        for error in &scan.errors {
            stats.add_error(error.clone());
        }

        let mut scripts = Vec::new();
        let mut scenes = Vec::new();
        for file in &scan.files {
            match file.kind {
                FileKind::Script(dialect) => {
                    if let Some(record) = self.script_record(file, dialect, &mut stats) {
                        scripts.push(record);
                    }
                }
                FileKind::Scene(_) => scenes.push(self.scene_record(file, &mut stats)),
            }
        }

        let name = project_name(self.tree, self.configured_name.as_deref());
        log::debug!("Project name: {name}");
        let index = ProjectIndex::new(name, self.tree.root(), scripts, scenes, created_at)
            .with_discovered(scan.scripts().count(), scan.scenes().count());

        stats.time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!("Indexing completed: {stats}");
        Ok(IndexRun { index, stats })
    }

    fn script_record(
        &self,
        file: &ScannedFile,
        dialect: Dialect,
        stats: &mut IndexStats,
    ) -> Option<ScriptRecord> {
        log::debug!("Processing script: {}", file.path);
        let Some(extractor) = self.registry.script(dialect) else {
            log::debug!("No extractor for {} ({})", file.path, dialect.as_str());
            return None;
        };
        let text = match self.tree.read_to_string(&file.path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Skipping unreadable script {}: {e}", file.path);
                stats.add_error(format!("{}: {e}", file.path));
                return None;
            }
        };

        let lines = line_count(&text);
        let outline = extractor.extract(&text);
        stats.add_script(dialect.as_str(), lines);

        Some(ScriptRecord {
            file_path: file.path.clone(),
            lines_of_code: lines,
            class_name: outline
                .class_name
                .unwrap_or_else(|| path::base_name(&file.path).to_string()),
            extends: outline.extends,
            functions: outline.functions,
            content_summary: outline.summary,
        })
    }

    fn scene_record(&self, file: &ScannedFile, stats: &mut IndexStats) -> SceneRecord {
        log::debug!("Processing scene: {}", file.path);
        let text = match self.tree.read_to_string(&file.path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Scene {} could not be read: {e}", file.path);
                stats.add_error(format!("{}: {e}", file.path));
                stats.add_scene(0);
                return SceneRecord {
                    file_path: file.path.clone(),
                    lines_of_code: 0,
                    nodes: Vec::new(),
                };
            }
        };

        let lines = line_count(&text);
        let outline = self.registry.scene().extract(&text);
        if !outline.structured {
            log::debug!("{} is not a text scene, recording line count only", file.path);
        }
        stats.add_scene(lines);

        SceneRecord {
            file_path: file.path.clone(),
            lines_of_code: lines,
            nodes: outline.nodes,
        }
    }
}

/// UTC timestamp in the index document's `YYYY-MM-DDTHH:MM:SSZ` form
pub fn timestamp_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
