use serde::{Deserialize, Serialize};

/// Statistics about one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files recorded in the index
    pub files: usize,

    pub scripts: usize,

    pub scenes: usize,

    /// Total lines across recorded files
    pub total_lines: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Scripts per dialect (`gdscript`, `csharp`)
    pub dialects: std::collections::BTreeMap<String, usize>,

    /// Files or directories that could not be read
    pub errors: Vec<String>,
}

impl IndexStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_script(&mut self, dialect: &str, lines: usize) {
        self.files += 1;
        self.scripts += 1;
        self.total_lines += lines;
        *self.dialects.entry(dialect.to_string()).or_insert(0) += 1;
    }

    pub fn add_scene(&mut self, lines: usize) {
        self.files += 1;
        self.scenes += 1;
        self.total_lines += lines;
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files ({} scripts, {} scenes), {} lines in {} ms",
            self.files, self.scripts, self.scenes, self.total_lines, self.time_ms
        )?;
        if !self.errors.is_empty() {
            write!(f, ", {} errors", self.errors.len())?;
        }
        Ok(())
    }
}
