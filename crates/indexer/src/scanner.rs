use crate::error::Result;
use crate::path::{self, RES_ROOT};
use crate::tree::{DirListing, FileTree};
use polyz_extract::FileKind;

/// Which files a traversal keeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// Every script and scene
    Exhaustive,

    /// Files whose base name contains one of the keywords (lowercase)
    Relevant { keywords: Vec<String> },
}

impl ScanMode {
    /// Keywords are the whitespace-separated words of the prompt, case-folded
    pub fn relevant_to(prompt: &str) -> Self {
        ScanMode::Relevant {
            keywords: prompt.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    pub fn from_flag(include_all: bool, prompt: &str) -> Self {
        if include_all {
            ScanMode::Exhaustive
        } else {
            Self::relevant_to(prompt)
        }
    }

    /// True when the file at `res_path` passes this mode's filter
    pub fn matches(&self, res_path: &str) -> bool {
        match self {
            ScanMode::Exhaustive => true,
            ScanMode::Relevant { keywords } => {
                let base = path::base_name(res_path).to_lowercase();
                keywords.iter().any(|k| base.contains(k.as_str()))
            }
        }
    }
}

/// A classified project file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: String,
    pub kind: FileKind,
}

/// Traversal result in depth-first order
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub files: Vec<ScannedFile>,

    /// Directories that could not be listed
    pub errors: Vec<String>,
}

impl Scan {
    pub fn scripts(&self) -> impl Iterator<Item = &ScannedFile> {
        self.files.iter().filter(|f| f.kind.is_script())
    }

    pub fn scenes(&self) -> impl Iterator<Item = &ScannedFile> {
        self.files.iter().filter(|f| f.kind.is_scene())
    }
}

/// Depth-first walker over a [`FileTree`]: a directory's files first, then
/// each subdirectory in listing order.
pub struct FileScanner<'a> {
    tree: &'a dyn FileTree,
}

impl<'a> FileScanner<'a> {
    pub fn new(tree: &'a dyn FileTree) -> Self {
        Self { tree }
    }

    /// Walk from `res://`. Only an unlistable root is an error; deeper
    /// failures are recorded in [`Scan::errors`].
    pub fn scan(&self, mode: &ScanMode) -> Result<Scan> {
        let mut scan = Scan::default();
        let root = self.tree.list(RES_ROOT)?;
        self.visit_listing(root, mode, &mut scan);

        log::debug!(
            "Scan found {} scripts and {} scenes",
            scan.scripts().count(),
            scan.scenes().count()
        );
        Ok(scan)
    }

    fn visit(&self, dir: &str, mode: &ScanMode, scan: &mut Scan) {
        match self.tree.list(dir) {
            Ok(listing) => self.visit_listing(listing, mode, scan),
            Err(e) => {
                log::warn!("Failed to list {dir}: {e}");
                scan.errors.push(format!("{dir}: {e}"));
            }
        }
    }

    fn visit_listing(&self, listing: DirListing, mode: &ScanMode, scan: &mut Scan) {
        for file in listing.files {
            let path = path::normalize(&file);
            let Some(kind) = FileKind::from_path(&path) else {
                continue;
            };
            if mode.matches(&path) {
                scan.files.push(ScannedFile { path, kind });
            }
        }
        for subdir in listing.subdirs {
            self.visit(&subdir, mode, scan);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MemoryTree;
    use pretty_assertions::assert_eq;

    fn project() -> MemoryTree {
        MemoryTree::default()
            .with_file("res://main.tscn", "")
            .with_file("res://player.gd", "")
            .with_file("res://icon.svg", "")
            .with_file("res://project.godot", "")
            .with_file("res://actors/enemy.gd", "")
            .with_file("res://actors/Boss.cs", "")
            .with_file("res://actors/bosses/dragon.scn", "")
            .with_file("res://ui/PlayerHUD.tscn", "")
    }

    fn paths(scan: &Scan) -> Vec<&str> {
        scan.files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn exhaustive_is_depth_first_files_before_subdirs() {
        let tree = project();
        let scan = FileScanner::new(&tree).scan(&ScanMode::Exhaustive).unwrap();
        assert_eq!(
            paths(&scan),
            vec![
                "res://main.tscn",
                "res://player.gd",
                "res://actors/Boss.cs",
                "res://actors/enemy.gd",
                "res://actors/bosses/dragon.scn",
                "res://ui/PlayerHUD.tscn",
            ]
        );
        assert_eq!(scan.scripts().count(), 3);
        assert_eq!(scan.scenes().count(), 3);
        assert!(scan.errors.is_empty());
    }

    #[test]
    fn relevance_matches_case_folded_base_names() {
        let tree = project();
        let mode = ScanMode::relevant_to("fix the PLAYER jump");
        let scan = FileScanner::new(&tree).scan(&mode).unwrap();
        assert_eq!(paths(&scan), vec!["res://player.gd", "res://ui/PlayerHUD.tscn"]);
    }

    #[test]
    fn relevance_with_no_keywords_keeps_nothing() {
        let tree = project();
        let scan = FileScanner::new(&tree).scan(&ScanMode::relevant_to("   ")).unwrap();
        assert!(scan.files.is_empty());
    }

    #[test]
    fn extension_is_not_part_of_the_match() {
        let mode = ScanMode::relevant_to("gd tscn");
        assert!(!mode.matches("res://player.gd"));
        assert!(!mode.matches("res://ui/PlayerHUD.tscn"));
        assert!(ScanMode::from_flag(true, "gd").matches("res://player.gd"));
    }
}
