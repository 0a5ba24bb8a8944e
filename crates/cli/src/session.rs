//! One user's conversation: prompt history, indexing, and the exchange in
//! flight, reported to a [`Host`].

use crate::config::Config;
use crate::history::MessageHistory;
use crate::host::{Host, Sender};
use anyhow::{Context, Result};
use polyz_client::{
    Clock, Completion, ExchangeError, HttpSocket, OutboundRequest, ParseError, ParsedResponse,
    RequestController, SystemClock, Tick,
};
use polyz_indexer::{
    cap_content, enrich_prompt, load_index_json, path, write_index, DirListing, FileTree,
    IndexRun, ProjectIndexer, ScanMode,
};
use polyz_protocol::PromptRequest;
use std::collections::BTreeMap;

const NETWORK_REPLY: &str = "I encountered a network error while trying to process your request. Please ensure your backend server is running and try again.";
const NO_REPLY: &str = "I didn't receive a proper response from the server. Please try again.";
const EMPTY_REPLY: &str = "I received an empty response from the server. This could be because the server is taking too long to process your request. Please try again later.";
const LATE_REPLY: &str = "I started processing your request, but didn't receive a response from the backend server in time. The response might be taking longer than expected. Please try again or check the server status.";
const FORMAT_REPLY: &str = "I received a response but it was in an unexpected format. Please try again.";

/// File tree that prefers content the host already holds
pub struct HostTree<'a> {
    tree: &'a dyn FileTree,
    host: &'a dyn Host,
}

impl<'a> HostTree<'a> {
    pub fn new(tree: &'a dyn FileTree, host: &'a dyn Host) -> Self {
        Self { tree, host }
    }
}

impl FileTree for HostTree<'_> {
    fn root(&self) -> &str {
        self.tree.root()
    }

    fn list(&self, dir: &str) -> polyz_indexer::Result<DirListing> {
        self.tree.list(dir)
    }

    fn read_to_string(&self, path: &str) -> polyz_indexer::Result<String> {
        match self.host.file_content(path) {
            Some(content) => Ok(content),
            None => self.tree.read_to_string(path),
        }
    }

    fn root_name(&self) -> Option<String> {
        self.tree.root_name()
    }
}

/// How an exchange ended, after the host has been told
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply {
        text: String,
        status_code: Option<u16>,
    },
    /// The backend answered without any reply text
    NoContent,
    Failed(ExchangeError),
}

pub struct Session<S, C = SystemClock> {
    tree: Box<dyn FileTree>,
    controller: RequestController<S, C>,
    history: MessageHistory,
    config: Config,
}

impl<S: HttpSocket> Session<S, SystemClock> {
    pub fn new(tree: Box<dyn FileTree>, socket: S, config: Config) -> Self {
        Self::with_clock(tree, socket, SystemClock::new(), config)
    }
}

impl<S: HttpSocket, C: Clock> Session<S, C> {
    pub fn with_clock(tree: Box<dyn FileTree>, socket: S, clock: C, config: Config) -> Self {
        let controller = RequestController::with_clock(socket, clock, config.controller.clone());
        Self {
            tree,
            controller,
            history: MessageHistory::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut MessageHistory {
        &mut self.history
    }

    pub fn controller(&self) -> &RequestController<S, C> {
        &self.controller
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Index the project and persist the artifact
    pub fn index_project(&mut self, host: &mut dyn Host) -> Result<IndexRun> {
        host.append_message(Sender::System, "Indexing project files...", false);

        let run = {
            let tree = HostTree::new(self.tree.as_ref(), &*host);
            let mut indexer = ProjectIndexer::new(&tree);
            if let Some(name) = &self.config.project.name {
                indexer = indexer.with_project_name(name.clone());
            }
            indexer.index()
        };
        let run = match run {
            Ok(run) => run,
            Err(e) => {
                host.append_message(Sender::System, &format!("Indexing failed: {e}"), false);
                return Err(e).context("Failed to index project");
            }
        };

        let index_path = self.config.index_path();
        match write_index(&index_path, &run.index) {
            Ok(()) => host.append_message(
                Sender::System,
                &format!(
                    "Project indexed successfully! Index saved to: {}",
                    index_path.display()
                ),
                false,
            ),
            Err(e) => host.append_message(
                Sender::System,
                &format!("Project indexed, but could not save index file. Error: {e}"),
                false,
            ),
        }
        Ok(run)
    }

    /// The prompt text as sent: plain, or followed by a context block when
    /// enrichment is on. Enrichment problems degrade to the plain prompt.
    pub fn build_prompt(&self, prompt: &str, host: &dyn Host) -> String {
        if !self.config.context.enrich {
            return prompt.to_string();
        }
        let mode = ScanMode::from_flag(self.config.context.include_all_files, prompt);
        let tree = HostTree::new(self.tree.as_ref(), host);
        match enrich_prompt(&tree, prompt, &mode, &host.snapshot()) {
            Ok(enriched) => enriched,
            Err(e) => {
                log::warn!("Could not build prompt context: {e}");
                prompt.to_string()
            }
        }
    }

    /// Send `prompt` with the persisted project index and any `attachments`
    /// (project paths whose content goes in `file_contents`).
    ///
    /// Returns whether an exchange was started. Every reason it was not is
    /// reported to the host.
    pub fn submit(&mut self, prompt: &str, attachments: &[String], host: &mut dyn Host) -> bool {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return false;
        }
        if self.is_busy() {
            host.append_message(
                Sender::System,
                "A request is already in progress. Please wait for it to finish.",
                false,
            );
            return false;
        }

        self.history.push(prompt);
        log::info!("Sending message: {prompt}");
        host.append_message(Sender::User, prompt, false);

        let text = self.build_prompt(prompt, &*host);
        let files = self.read_attachments(attachments, host);
        let mut request = PromptRequest::new(text)
            .with_project_index(load_index_json(&self.config.index_path()))
            .with_file_contents(files);
        if let Some(model) = &self.config.backend.model {
            request = request.with_model(model.clone());
        }

        let outbound = match OutboundRequest::json(&self.config.backend, &request) {
            Ok(outbound) => outbound,
            Err(e) => {
                host.append_message(
                    Sender::System,
                    &format!("Could not encode request: {e}"),
                    false,
                );
                return false;
            }
        };

        match self.controller.start(outbound) {
            Ok(()) => {
                host.show_progress(std::time::Duration::ZERO);
                true
            }
            Err(e) => {
                report_failure(host, &e);
                false
            }
        }
    }

    fn read_attachments(
        &self,
        attachments: &[String],
        host: &mut dyn Host,
    ) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        for attachment in attachments {
            let res_path = path::normalize(attachment);
            let content = HostTree::new(self.tree.as_ref(), &*host).read_to_string(&res_path);
            match content {
                Ok(content) => {
                    files.insert(res_path, cap_content(content));
                }
                Err(e) => host.append_message(
                    Sender::System,
                    &format!("Could not attach {res_path}: {e}"),
                    false,
                ),
            }
        }
        files
    }

    /// Advance the exchange one step. Returns the outcome once it ends.
    pub fn tick(&mut self, host: &mut dyn Host) -> Option<Outcome> {
        match self.controller.poll() {
            Tick::Idle | Tick::Pending => None,
            Tick::Progress { elapsed } => {
                log::debug!("Still waiting for a reply after {}s", elapsed.as_secs());
                host.show_progress(elapsed);
                None
            }
            Tick::Done(Ok(done)) => Some(deliver(host, done)),
            Tick::Done(Err(e)) => {
                report_failure(host, &e);
                Some(Outcome::Failed(e))
            }
        }
    }

    /// Tick on the configured interval until the exchange ends. `None` when
    /// nothing was in flight.
    pub fn wait(&mut self, host: &mut dyn Host) -> Option<Outcome> {
        let tick = self.config.session.tick();
        while self.is_busy() {
            if let Some(outcome) = self.tick(host) {
                return Some(outcome);
            }
            std::thread::sleep(tick);
        }
        None
    }

    pub fn cancel(&mut self) {
        self.controller.cancel();
    }
}

fn deliver(host: &mut dyn Host, done: Completion) -> Outcome {
    match done.response {
        ParsedResponse::Reply { text, .. } if !text.is_empty() => {
            host.append_message(Sender::Assistant, &text, true);
            Outcome::Reply {
                text,
                status_code: done.status_code,
            }
        }
        _ => {
            host.append_message(Sender::Assistant, NO_REPLY, true);
            Outcome::NoContent
        }
    }
}

fn report_failure(host: &mut dyn Host, error: &ExchangeError) {
    let (system, reply) = match error {
        ExchangeError::Busy => (Some(error.to_string()), None),
        ExchangeError::Connect { .. } => (
            Some(format!("Failed to connect to server. {error}")),
            Some(NETWORK_REPLY.to_string()),
        ),
        ExchangeError::Send(_) | ExchangeError::Transport(_) | ExchangeError::Status(_) => (
            Some(format!("Request failed: {error}")),
            Some(NETWORK_REPLY.to_string()),
        ),
        ExchangeError::Timeout { elapsed, status } => {
            let secs = elapsed.as_secs();
            (
                Some(format!(
                    "Connection to backend timed out after {secs} seconds. Status: {status}"
                )),
                Some(format!(
                    "I'm sorry, but the connection to the backend server timed out after waiting {secs} seconds. The server might be overloaded or experiencing issues."
                )),
            )
        }
        ExchangeError::NoResponse => (
            Some("The backend server didn't return a response in time.".to_string()),
            Some(LATE_REPLY.to_string()),
        ),
        ExchangeError::EmptyBody { .. } => (None, Some(EMPTY_REPLY.to_string())),
        ExchangeError::Parse(ParseError::Format { .. }) => (
            Some("Failed to parse response from server.".to_string()),
            Some(FORMAT_REPLY.to_string()),
        ),
        ExchangeError::Parse(ParseError::UnexpectedShape { .. }) => (
            Some("Received invalid response format from server.".to_string()),
            Some(NO_REPLY.to_string()),
        ),
    };

    if let Some(system) = system {
        host.append_message(Sender::System, &system, false);
    }
    if let Some(reply) = reply {
        host.append_message(Sender::Assistant, &reply, true);
    }
}
