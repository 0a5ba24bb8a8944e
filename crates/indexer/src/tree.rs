use crate::error::{IndexerError, Result};
use crate::path::{self, RES_ROOT};
use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// One directory level: direct child files and subdirectories, as `res://` paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub files: Vec<String>,
    pub subdirs: Vec<String>,
}

/// Read-only view of a project directory tree addressed by `res://` paths
pub trait FileTree {
    /// Project location as shown to the backend (an absolute directory for
    /// on-disk trees)
    fn root(&self) -> &str;

    fn list(&self, dir: &str) -> Result<DirListing>;

    fn read_to_string(&self, path: &str) -> Result<String>;

    /// Name of the root directory, used when the project declares no name
    fn root_name(&self) -> Option<String> {
        if self.root().starts_with(RES_ROOT) {
            return None;
        }
        Path::new(self.root())
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
    }
}

/// On-disk project tree (.gitignore aware, hidden entries skipped)
#[derive(Debug, Clone)]
pub struct FsTree {
    root: PathBuf,
    display: String,
}

impl FsTree {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(root.display().to_string()));
        }
        let root = root.canonicalize()?;
        let display = root.display().to_string();
        Ok(Self { root, display })
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, res_path: &str) -> Result<PathBuf> {
        path::to_fs_path(&self.root, res_path)
            .ok_or_else(|| IndexerError::InvalidPath(res_path.to_string()))
    }
}

impl FileTree for FsTree {
    fn root(&self) -> &str {
        &self.display
    }

    fn list(&self, dir: &str) -> Result<DirListing> {
        let dir = path::normalize(dir);
        let fs_dir = self.resolve(&dir)?;
        if !fs_dir.is_dir() {
            return Err(IndexerError::InvalidPath(dir));
        }

        let mut builder = WalkBuilder::new(&fs_dir);
        builder
            .max_depth(Some(1))
            .hidden(true) // .godot, .import, .polyz and friends
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        let mut listing = DirListing::default();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry in {dir}: {e}");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                log::debug!("Skipping non UTF-8 name {}", entry.path().display());
                continue;
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };

            let child = path::join(&dir, name);
            if file_type.is_dir() {
                listing.subdirs.push(child);
            } else if file_type.is_file() {
                listing.files.push(child);
            }
        }
        Ok(listing)
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        let fs_path = self.resolve(path)?;
        Ok(std::fs::read_to_string(fs_path)?)
    }
}

/// In-memory project tree.
///
/// Directories are implied by file paths. A file inserted with
/// [`MemoryTree::insert_unreadable`] is listed but fails to read.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    root: String,
    files: BTreeMap<String, Option<String>>,
}

impl MemoryTree {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, path: &str, content: impl Into<String>) {
        self.files.insert(path::normalize(path), Some(content.into()));
    }

    pub fn insert_unreadable(&mut self, path: &str) {
        self.files.insert(path::normalize(path), None);
    }

    /// Builder form of [`MemoryTree::insert`]
    pub fn with_file(mut self, path: &str, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new(RES_ROOT)
    }
}

impl FileTree for MemoryTree {
    fn root(&self) -> &str {
        &self.root
    }

    fn list(&self, dir: &str) -> Result<DirListing> {
        let dir = path::normalize(dir);
        let prefix = if dir == RES_ROOT {
            dir.clone()
        } else {
            format!("{dir}/")
        };

        let mut listing = DirListing::default();
        let mut subdirs = BTreeSet::new();
        for key in self.files.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((subdir, _)) => {
                    subdirs.insert(path::join(&dir, subdir));
                }
                None => listing.files.push(key.clone()),
            }
        }
        listing.subdirs = subdirs.into_iter().collect();
        Ok(listing)
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        let key = path::normalize(path);
        match self.files.get(&key) {
            Some(Some(content)) => Ok(content.clone()),
            Some(None) => Err(IndexerError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{key} is not readable"),
            ))),
            None => Err(IndexerError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{key} not found"),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn memory_tree_lists_one_level() {
        let tree = MemoryTree::default()
            .with_file("res://main.tscn", "")
            .with_file("res://actors/player.gd", "")
            .with_file("res://actors/enemies/slime.gd", "")
            .with_file("res://ui/hud.tscn", "");

        let top = tree.list("res://").unwrap();
        assert_eq!(top.files, vec!["res://main.tscn"]);
        assert_eq!(top.subdirs, vec!["res://actors", "res://ui"]);

        let actors = tree.list("res://actors/").unwrap();
        assert_eq!(actors.files, vec!["res://actors/player.gd"]);
        assert_eq!(actors.subdirs, vec!["res://actors/enemies"]);
    }

    #[test]
    fn memory_tree_read_errors() {
        let mut tree = MemoryTree::default();
        tree.insert("locked.gd", "secret");
        tree.insert_unreadable("locked.gd");

        assert!(tree.read_to_string("res://locked.gd").is_err());
        assert!(tree.read_to_string("res://missing.gd").is_err());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn fs_tree_skips_hidden_and_ignored() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".godot/imported")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::create_dir_all(root.join("scenes")).unwrap();
        fs::write(root.join(".godot/imported/cache.gd"), "").unwrap();
        fs::write(root.join("build/out.gd"), "").unwrap();
        fs::write(root.join("scenes/main.tscn"), "[gd_scene]").unwrap();
        fs::write(root.join("player.gd"), "extends Node").unwrap();
        fs::write(root.join(".gitignore"), "/build\n").unwrap();

        let tree = FsTree::new(root).unwrap();
        let top = tree.list("res://").unwrap();
        assert_eq!(top.files, vec!["res://player.gd"]);
        assert_eq!(top.subdirs, vec!["res://scenes"]);

        let scenes = tree.list("res://scenes").unwrap();
        assert_eq!(scenes.files, vec!["res://scenes/main.tscn"]);
        assert_eq!(
            tree.read_to_string("res://player.gd").unwrap(),
            "extends Node"
        );
    }

    #[test]
    fn fs_tree_rejects_missing_root_and_escapes() {
        let temp = tempdir().unwrap();
        assert!(FsTree::new(temp.path().join("nope")).is_err());

        let tree = FsTree::new(temp.path()).unwrap();
        assert!(tree.read_to_string("res://../outside.gd").is_err());
        assert!(tree.list("res://missing").is_err());
    }

    #[test]
    fn root_name_comes_from_directory() {
        let tree = MemoryTree::new("/home/dev/SpaceGame");
        assert_eq!(tree.root_name().as_deref(), Some("SpaceGame"));
        assert_eq!(MemoryTree::default().root_name(), None);
    }
}
