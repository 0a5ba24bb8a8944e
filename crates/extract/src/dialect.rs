use std::path::Path;

/// Scripting dialect recognized by the indexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    GdScript,
    CSharp,
}

impl Dialect {
    /// Detect dialect from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "gd" => Some(Dialect::GdScript),
            "cs" => Some(Dialect::CSharp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::GdScript => "gdscript",
            Dialect::CSharp => "csharp",
        }
    }

    /// Line comment prefix
    pub fn comment_prefix(self) -> &'static str {
        match self {
            Dialect::GdScript => "#",
            Dialect::CSharp => "//",
        }
    }
}

/// On-disk scene encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneFormat {
    /// `.tscn`
    Text,
    /// `.scn`
    Binary,
}

/// Classification of a project file. Files with no kind are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Script(Dialect),
    Scene(SceneFormat),
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "tscn" => Some(FileKind::Scene(SceneFormat::Text)),
            "scn" => Some(FileKind::Scene(SceneFormat::Binary)),
            other => Dialect::from_extension(other).map(FileKind::Script),
        }
    }

    /// Classify a path such as `res://actors/player.gd`
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_scene(self) -> bool {
        matches!(self, FileKind::Scene(_))
    }

    pub fn is_script(self) -> bool {
        matches!(self, FileKind::Script(_))
    }
}
