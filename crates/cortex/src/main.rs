use anyhow::{Context, anyhow};
use clap::Parser;
use cortex_engine::Agent;
use cortex_engine::cli::{self, FileOptions, InputMode, LineOptions, OutputHandlers, ReplOptions};
use cortex_engine::config::{ConfigLoader, CortexConfig};
use cortex_engine::formatter::format_batch;
use cortex_engine::memory::{FileStore, InMemoryStore, KeyValueStore};
use cortex_engine::page::{LogOverlay, MemoryPage};
use cortex_engine::protocol::ExecutableAction;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cortex", version, about = "Natural-language commands against a page")]
struct Args {
    /// Page fixture (JSON) to act on
    #[arg(long)]
    page: PathBuf,

    /// Commands to execute, one per line (non-interactive mode)
    #[arg(long)]
    file: Option<String>,

    /// JSON array of actions to run as one batch
    #[arg(long, conflicts_with = "file")]
    actions: Option<PathBuf>,

    /// Treat each input line as a JSON request message
    #[arg(long)]
    json: bool,

    /// Profile persona used for profile fills
    #[arg(long)]
    persona: Option<String>,

    /// Store file for memories and the user profile (default: ~/.cortex/store.json)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Keep memories in process only
    #[arg(long, conflicts_with = "store")]
    ephemeral: bool,

    /// Config file (default: ./cortex.yaml, then ~/.cortex/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the randomized pause after each action
    #[arg(long)]
    no_humanize: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries command output only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args).await?;

    let fixture = tokio::fs::read_to_string(&args.page)
        .await
        .with_context(|| format!("reading page fixture {}", args.page.display()))?;
    let page = MemoryPage::from_json(&fixture).context("parsing page fixture")?;

    let store: Arc<dyn KeyValueStore> = if args.ephemeral {
        Arc::new(InMemoryStore::new())
    } else {
        let path = match &args.store {
            Some(path) => path.clone(),
            None => FileStore::default_path().context("no home directory for the store")?,
        };
        tracing::info!(path = %path.display(), "using store");
        Arc::new(FileStore::new(path))
    };

    let agent = Agent::new(Arc::new(page), store, Arc::new(LogOverlay), &config);
    let output = OutputHandlers {
        out: |msg| println!("{}", msg),
        err: |msg| eprintln!("{}", msg),
    };
    let line_options = LineOptions {
        mode: if args.json {
            InputMode::Json
        } else {
            InputMode::Natural
        },
        persona: args.persona.as_deref(),
    };

    if let Some(path) = &args.actions {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading actions {}", path.display()))?;
        let actions: Vec<ExecutableAction> =
            serde_json::from_str(&raw).context("parsing actions")?;
        let batch = agent.run_batch(&actions, args.persona.as_deref()).await;
        (output.out)(&format_batch(&batch));
        if !batch.ok {
            return Err(anyhow!("batch stopped"));
        }
        return Ok(());
    }

    if let Some(file_path) = &args.file {
        cli::run_file(
            &agent,
            output,
            file_path,
            line_options,
            FileOptions {
                stop_on_error: false,
            },
        )
        .await
        .map_err(|e| anyhow!("executing file {}: {}", file_path, e))?;
    } else {
        let repl_options = ReplOptions {
            banner_lines: &[
                "Page loaded. Enter commands (e.g., 'fill email from profile', 'click submit').",
                "':cancel' stops highlighting. Type 'exit' or 'quit' to close.",
            ],
            prompt: "> ",
            exit_commands: &["exit", "quit"],
            ctrl_c_message: Some("Bye."),
        };
        cli::run_repl(&agent, output, line_options, repl_options)
            .await
            .map_err(|e| anyhow!("session error: {}", e))?;
    }

    Ok(())
}

async fn load_config(args: &Args) -> anyhow::Result<CortexConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    if args.no_humanize {
        config.runtime.humanize = false;
    }
    Ok(config)
}
