use crate::dialect::Dialect;
use polyz_protocol::NodeEntry;

/// What a script extractor recovers from one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutline {
    /// Declared type name, if the script declares one
    pub class_name: Option<String>,

    /// Parent / base type
    pub extends: Option<String>,

    pub namespace: Option<String>,

    /// Function or method names in source order
    pub functions: Vec<String>,

    /// One-line description, e.g. `GDScript extending Node with 3 functions`
    pub summary: String,
}

/// What a scene extractor recovers from one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneOutline {
    /// False when the text is not a loadable scene resource
    pub structured: bool,

    pub nodes: Vec<NodeEntry>,
}

/// Line-scanning metadata strategy for one scripting dialect.
///
/// Implementations must be total: malformed input yields a sparse outline,
/// never a panic or error.
pub trait ScriptExtractor: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn extract(&self, text: &str) -> ScriptOutline;
}

/// Line-scanning node hierarchy strategy for scene files
pub trait SceneExtractor: Send + Sync {
    fn extract(&self, text: &str) -> SceneOutline;
}
