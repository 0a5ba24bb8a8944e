//! The UI side of a session: editor state in, messages out

use crate::render;
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use polyz_indexer::{EditorSnapshot, SelectedNode};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Sender {
    pub fn name(self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "AI Assistant",
            Sender::System => "System",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collaborator a [`crate::Session`] reports to and reads editor state from
pub trait Host {
    fn open_scenes(&self) -> Vec<String>;

    fn edited_scene(&self) -> Option<String>;

    fn selection(&self) -> Vec<SelectedNode>;

    /// Content the host already holds for `path` (e.g. an unsaved buffer).
    /// `None` falls back to reading the project tree.
    fn file_content(&self, _path: &str) -> Option<String> {
        None
    }

    fn append_message(&mut self, from: Sender, text: &str, is_reply: bool);

    /// Called periodically while a reply is pending
    fn show_progress(&mut self, _elapsed: Duration) {}

    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            open_scenes: self.open_scenes(),
            edited_scene: self.edited_scene(),
            selection: self.selection(),
        }
    }
}

/// Host for the `polyz` binary: replies on stdout, system notes on stderr, a
/// spinner while waiting
pub struct TerminalHost {
    out: Term,
    err: Term,
    snapshot: EditorSnapshot,
    echo_user: bool,
    spinner: Option<ProgressBar>,
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalHost {
    pub fn new() -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            snapshot: EditorSnapshot::default(),
            echo_user: false,
            spinner: None,
        }
    }

    /// Editor state reported for enrichment
    pub fn with_snapshot(mut self, snapshot: EditorSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Print the user's own prompts back
    pub fn echo_user(mut self, echo: bool) -> Self {
        self.echo_user = echo;
        self
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn spinner(&mut self) -> &ProgressBar {
        self.spinner.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(template) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
                spinner.set_style(template);
            }
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        })
    }
}

impl Host for TerminalHost {
    fn open_scenes(&self) -> Vec<String> {
        self.snapshot.open_scenes.clone()
    }

    fn edited_scene(&self) -> Option<String> {
        self.snapshot.edited_scene.clone()
    }

    fn selection(&self) -> Vec<SelectedNode> {
        self.snapshot.selection.clone()
    }

    fn append_message(&mut self, from: Sender, text: &str, is_reply: bool) {
        self.stop_spinner();
        if from == Sender::User && !self.echo_user {
            return;
        }

        let term = if from == Sender::System {
            &self.err
        } else {
            &self.out
        };
        let styled = term.features().colors_supported();
        let name = if is_reply {
            style(format!("{from}:")).green().bold()
        } else {
            style(format!("{from}:")).cyan().bold()
        };
        let body = if is_reply {
            render::render(text, styled)
        } else {
            text.to_string()
        };

        if let Err(e) = term.write_line(&format!("{name}\n{body}\n")) {
            log::warn!("Could not write message: {e}");
        }
    }

    fn show_progress(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs();
        self.spinner().set_message(format!(
            "Thinking... {secs}s (this may take 1-2 minutes)"
        ));
    }
}
