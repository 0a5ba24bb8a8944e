use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where prompts are sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Model identifier forwarded in the request body
    pub model: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            path: "/api/prompts/godot".to_string(),
            model: Some("claude-3-opus-20240229".to_string()),
        }
    }
}

impl BackendConfig {
    pub fn target(&self) -> String {
        format!("{}:{}{}", self.host, self.port, self.path)
    }
}

/// Exchange thresholds. Every field has a default; a config file may set any
/// subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Abort the exchange once this much time has passed since `start`
    pub hard_timeout_secs: u64,

    /// While still sending, log and re-check for a response after this long
    pub soft_recheck_secs: u64,

    /// While still sending, start draining regardless after this long
    pub force_drain_secs: u64,

    /// Emit a progress tick every N polls while waiting
    pub progress_every_polls: u64,

    /// Consecutive empty reads tolerated while the socket reports a body
    pub max_empty_chunks: u32,

    /// Consecutive empty reads tolerated on a forced drain
    pub max_empty_chunks_forced: u32,

    /// Polls to wait for response headers once draining
    pub no_response_polls: u32,

    /// Reads attempted per poll while draining
    pub drain_burst: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            hard_timeout_secs: 180,
            soft_recheck_secs: 60,
            force_drain_secs: 120,
            progress_every_polls: 100,
            max_empty_chunks: 200,
            max_empty_chunks_forced: 60,
            no_response_polls: 200,
            drain_burst: 8,
        }
    }
}

impl ControllerConfig {
    pub fn hard_timeout(&self) -> Duration {
        Duration::from_secs(self.hard_timeout_secs)
    }

    pub fn soft_recheck(&self) -> Duration {
        Duration::from_secs(self.soft_recheck_secs)
    }

    pub fn force_drain(&self) -> Duration {
        Duration::from_secs(self.force_drain_secs)
    }
}
