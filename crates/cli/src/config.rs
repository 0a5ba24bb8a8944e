use anyhow::{Context, Result};
use polyz_client::{BackendConfig, ControllerConfig};
use polyz_indexer::{INDEX_FILE, STATE_DIR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "polyz.toml";

/// `polyz.toml`. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub project: ProjectConfig,
    pub context: ContextConfig,
    pub controller: ControllerConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub root: PathBuf,

    /// Overrides the name declared in `project.godot`
    pub name: Option<String>,

    /// Index artifact location, relative to `root` unless absolute
    pub index_path: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            name: None,
            index_path: Path::new(STATE_DIR).join(INDEX_FILE),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Append editor and project file context to prompts
    pub enrich: bool,

    /// Embed every script and scene instead of prompt-matched ones
    pub include_all_files: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between controller polls
    pub tick_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { tick_ms: 16 }
    }
}

impl SessionConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Config {
    /// Load from `path`. A missing file yields defaults; an unreadable or
    /// invalid one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Where the index artifact lives for this project
    pub fn index_path(&self) -> PathBuf {
        if self.project.index_path.is_absolute() {
            self.project.index_path.clone()
        } else {
            self.project.root.join(&self.project.index_path)
        }
    }
}
