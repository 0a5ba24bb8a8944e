//! # Polyz CLI
//!
//! Terminal host for the prompt pipeline: indexes a Godot project, sends
//! prompts with project context to the backend and prints the replies.
//!
//! ```text
//! polyz index                      # write .polyz/project_index.json
//! polyz ask "add a double jump"    # one exchange
//! polyz chat                       # interactive, with prompt recall
//! polyz context "player movement"  # show the enriched prompt
//! polyz parse reply.json           # inspect a saved backend response
//! ```

use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use polyz_client::{parse_response, ParsedResponse, TcpSocket};
use polyz_indexer::{EditorSnapshot, FsTree};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

pub mod config;
pub mod history;
pub mod host;
pub mod render;
pub mod session;

pub use config::Config;
pub use history::{MessageHistory, MAX_HISTORY};
pub use host::{Host, Sender, TerminalHost};
pub use session::{HostTree, Outcome, Session};

const GREETING: &str = "Hello! I'm your coding assistant. How can I help you today?";

#[derive(Parser)]
#[command(name = "polyz")]
#[command(about = "Project-aware prompts for a Godot coding assistant", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (missing file means defaults)
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Project root (overrides [project].root)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for replies)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the project and save the index artifact
    Index(IndexArgs),

    /// Send one prompt and print the reply
    Ask(AskArgs),

    /// Interactive session with prompt recall
    Chat(ChatArgs),

    /// Print the enriched prompt without sending it
    Context(ContextArgs),

    /// Parse a saved backend response body (file or stdin)
    Parse(ParseArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Print the index document to stdout
    #[arg(long)]
    json: bool,
}

#[derive(Args, Default)]
struct EditorArgs {
    /// Open scene; the first one is treated as the edited scene
    #[arg(long = "scene", value_name = "PATH")]
    scenes: Vec<String>,
}

impl EditorArgs {
    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            open_scenes: self.scenes.clone(),
            edited_scene: self.scenes.first().cloned(),
            selection: Vec::new(),
        }
    }
}

#[derive(Args)]
struct AskArgs {
    /// Prompt text
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,

    /// Append project and editor context to the prompt
    #[arg(long)]
    context: bool,

    /// Embed every script and scene, not just prompt-matched ones
    #[arg(long)]
    all_files: bool,

    /// Attach a project file's content (repeatable)
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<String>,

    #[command(flatten)]
    editor: EditorArgs,
}

#[derive(Args)]
struct ChatArgs {
    /// Append project and editor context to every prompt
    #[arg(long)]
    context: bool,

    /// Embed every script and scene, not just prompt-matched ones
    #[arg(long)]
    all_files: bool,

    #[command(flatten)]
    editor: EditorArgs,
}

#[derive(Args)]
struct ContextArgs {
    /// Prompt text
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,

    /// Embed every script and scene, not just prompt-matched ones
    #[arg(long)]
    all_files: bool,

    #[command(flatten)]
    editor: EditorArgs,
}

#[derive(Args)]
struct ParseArgs {
    /// Response body file; stdin when omitted
    file: Option<PathBuf>,
}

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

pub fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(&cli.config)?;
    if let Some(root) = &cli.root {
        config.project.root = root.clone();
    }

    match cli.command {
        Commands::Index(args) => run_index(config, args),
        Commands::Ask(args) => run_ask(config, args),
        Commands::Chat(args) => run_chat(config, args),
        Commands::Context(args) => run_context(config, args),
        Commands::Parse(args) => run_parse(args),
    }
}

fn open_session(config: Config) -> Result<Session<TcpSocket>> {
    let tree = FsTree::new(&config.project.root).with_context(|| {
        format!("Invalid project root {}", config.project.root.display())
    })?;
    Ok(Session::new(Box::new(tree), TcpSocket::new(), config))
}

fn run_index(config: Config, args: IndexArgs) -> Result<()> {
    let mut session = open_session(config)?;
    let mut host = TerminalHost::new();
    let run = session.index_project(&mut host)?;
    log::info!("Indexed {}", run.stats);
    for error in &run.stats.errors {
        log::warn!("  {error}");
    }
    if args.json {
        print_stdout(&run.index.to_json_pretty()?)?;
    }
    Ok(())
}

fn run_ask(mut config: Config, args: AskArgs) -> Result<()> {
    config.context.enrich |= args.context;
    config.context.include_all_files |= args.all_files;
    let prompt = args.prompt.join(" ");

    let mut session = open_session(config)?;
    let mut host = TerminalHost::new().with_snapshot(args.editor.snapshot());
    if !session.submit(&prompt, &args.files, &mut host) {
        bail!("Request was not sent");
    }
    match session.wait(&mut host) {
        Some(Outcome::Failed(e)) => Err(e).context("Exchange failed"),
        _ => Ok(()),
    }
}

fn run_chat(mut config: Config, args: ChatArgs) -> Result<()> {
    config.context.enrich |= args.context;
    config.context.include_all_files |= args.all_files;

    let interactive = io::stdin().is_terminal();
    let mut session = open_session(config)?;
    // piped prompts are not visible otherwise
    let mut host = TerminalHost::new()
        .with_snapshot(args.editor.snapshot())
        .echo_user(!interactive);
    host.append_message(Sender::Assistant, GREETING, true);

    loop {
        let line = if interactive {
            let mut recall = session.history().recall();
            let input = dialoguer::Input::<String>::new()
                .with_prompt(Sender::User.name())
                .allow_empty(true)
                .history_with(&mut recall)
                .interact_text();
            match input {
                Ok(line) => line,
                Err(e) => {
                    log::debug!("Input closed: {e}");
                    break;
                }
            }
        } else {
            let mut line = String::new();
            if io::stdin().read_line(&mut line)? == 0 {
                break;
            }
            line
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/index" => {
                if let Err(e) = session.index_project(&mut host) {
                    log::warn!("{e:#}");
                }
            }
            "/history" => {
                let entries: Vec<String> = session
                    .history()
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| format!("{:>2}. {entry}", i + 1))
                    .collect();
                let text = if entries.is_empty() {
                    "No messages yet.".to_string()
                } else {
                    entries.join("\n")
                };
                host.append_message(Sender::System, &text, false);
            }
            prompt => {
                if session.submit(prompt, &[], &mut host) {
                    session.wait(&mut host);
                }
            }
        }
    }
    Ok(())
}

fn run_context(mut config: Config, args: ContextArgs) -> Result<()> {
    config.context.enrich = true;
    config.context.include_all_files |= args.all_files;
    let prompt = args.prompt.join(" ");

    let session = open_session(config)?;
    let host = TerminalHost::new().with_snapshot(args.editor.snapshot());
    print_stdout(&session.build_prompt(&prompt, &host))
}

fn run_parse(args: ParseArgs) -> Result<()> {
    let body = match &args.file {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut body = Vec::new();
            io::stdin()
                .read_to_end(&mut body)
                .context("Failed to read stdin")?;
            body
        }
    };

    let parsed = parse_response(&body).context("Response could not be parsed")?;
    if let Some(usage) = parsed.usage() {
        eprintln!("Token usage: {usage}");
    }
    match parsed {
        ParsedResponse::Reply {
            text, via_fallback, ..
        } => {
            if via_fallback {
                log::warn!("Body is not valid JSON; reply recovered by substring search");
            }
            print_stdout(&render::render(&text, false))
        }
        ParsedResponse::Empty { .. } => {
            eprintln!("Response contains no reply text");
            Ok(())
        }
    }
}
