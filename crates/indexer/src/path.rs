//! `res://` path helpers.
//!
//! Every path the indexer emits is `res://` followed by `/`-separated
//! segments, with no empty or `.` segments.

use std::path::{Component, Path, PathBuf};

pub const RES_ROOT: &str = "res://";

/// Canonical form of a project path.
///
/// Accepts `res://` paths, bare relative paths and backslash separators:
/// `res:///actors//player.gd`, `actors\player.gd` and `./actors/player.gd`
/// all become `res://actors/player.gd`.
pub fn normalize(path: &str) -> String {
    let rest = path.strip_prefix(RES_ROOT).unwrap_or(path);
    let segments: Vec<&str> = rest
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    format!("{RES_ROOT}{}", segments.join("/"))
}

/// Child path of a directory
pub fn join(dir: &str, name: &str) -> String {
    normalize(&format!("{}/{name}", normalize(dir)))
}

/// Path without the `res://` prefix, empty for the root
pub fn relative(path: &str) -> String {
    let normalized = normalize(path);
    normalized[RES_ROOT.len()..].to_string()
}

/// Last segment with its extension removed: `res://ui/PlayerHUD.tscn` → `PlayerHUD`
pub fn base_name(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file.rfind('.') {
        Some(0) | None => file,
        Some(dot) => &file[..dot],
    }
}

/// On-disk location of a project path under `root`.
///
/// `..` segments are rejected so a lookup can never leave the project.
pub fn to_fs_path(root: &Path, path: &str) -> Option<PathBuf> {
    let relative = relative(path);
    let relative = Path::new(&relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}
