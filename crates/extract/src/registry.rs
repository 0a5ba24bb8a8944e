use std::collections::HashMap;

use crate::csharp::CSharpExtractor;
use crate::dialect::{Dialect, FileKind};
use crate::gdscript::GdScriptExtractor;
use crate::scene::TextSceneExtractor;
use crate::strategy::{SceneExtractor, ScriptExtractor};

/// Extractor lookup keyed by dialect.
///
/// Traversal code asks the registry for a strategy instead of matching on
/// file types itself, so a new dialect is one `register` call.
pub struct ExtractorRegistry {
    scripts: HashMap<Dialect, Box<dyn ScriptExtractor>>,
    scene: Box<dyn SceneExtractor>,
}

impl ExtractorRegistry {
    /// Registry with no script dialects and the given scene strategy
    pub fn with_scene(scene: Box<dyn SceneExtractor>) -> Self {
        Self {
            scripts: HashMap::new(),
            scene,
        }
    }

    /// Register (or replace) the extractor for its dialect
    pub fn register(&mut self, extractor: Box<dyn ScriptExtractor>) {
        self.scripts.insert(extractor.dialect(), extractor);
    }

    pub fn script(&self, dialect: Dialect) -> Option<&dyn ScriptExtractor> {
        self.scripts.get(&dialect).map(|e| &**e)
    }

    pub fn scene(&self) -> &dyn SceneExtractor {
        &*self.scene
    }

    /// True when files of this kind produce a record
    pub fn supports(&self, kind: FileKind) -> bool {
        match kind {
            FileKind::Script(dialect) => self.scripts.contains_key(&dialect),
            FileKind::Scene(_) => true,
        }
    }

    /// Registered dialects, sorted
    pub fn dialects(&self) -> Vec<Dialect> {
        let mut dialects: Vec<Dialect> = self.scripts.keys().copied().collect();
        dialects.sort();
        dialects
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::with_scene(Box::new(TextSceneExtractor));
        registry.register(Box::new(GdScriptExtractor));
        registry.register(Box::new(CSharpExtractor));
        registry
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("dialects", &self.dialects())
            .finish_non_exhaustive()
    }
}
