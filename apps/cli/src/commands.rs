//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use mindcite_core::pipeline::ProgressReporter;
use mindcite_shared::{
    AppConfig, MindCiteError, MindMapNode, MindMapPayload, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// MindCite — study notes in, verified mind map out.
#[derive(Parser)]
#[command(
    name = "mindcite",
    version,
    about = "Turn medical study notes (PDF) into a mind map with verified citations.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a mind map from a PDF of study notes.
    Generate {
        /// Path to the PDF document.
        file: PathBuf,

        /// Write the payload JSON here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Override the configured generative model.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Refine one node's summary and tags against its citations.
    Refine {
        /// Path to a JSON file holding the node to refine.
        #[arg(long)]
        node: PathBuf,

        /// Override the configured generative model.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mindcite=info",
        1 => "mindcite=debug",
        _ => "mindcite=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate { file, out, model } => {
            cmd_generate(&file, out.as_deref(), model.as_deref()).await
        }
        Command::Refine { node, model } => cmd_refine(&node, model.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Convert a pipeline error into a report carrying its status class.
fn operation_failed(e: MindCiteError) -> color_eyre::eyre::Report {
    tracing::error!(status = e.status_class(), error = %e, "operation failed");
    eyre!("{e} [{}]", e.status_class())
}

/// Load config and apply the optional model override.
fn resolve_config(model: Option<&str>) -> Result<AppConfig> {
    let mut config = load_config().map_err(operation_failed)?;
    if let Some(model) = model {
        config.generative.default_model = model.to_string();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(file: &Path, out: Option<&Path>, model: Option<&str>) -> Result<()> {
    let config = resolve_config(model)?;

    let bytes = std::fs::read(file).map_err(|e| operation_failed(MindCiteError::io(file, e)))?;

    info!(
        file = %file.display(),
        model = %config.generative.default_model,
        "generating mind map"
    );

    let reporter = CliProgress::new();
    let payload = mindcite_core::generate(&config, &bytes, &reporter)
        .await
        .map_err(operation_failed)?;

    let json = serde_json::to_string_pretty(&payload)?;
    match out {
        Some(path) => {
            std::fs::write(path, &json)
                .map_err(|e| operation_failed(MindCiteError::io(path, e)))?;

            let verified = payload.nodes.iter().filter(|n| n.verified).count();
            println!();
            println!("  Mind map written to {}", path.display());
            println!("  Nodes:    {}", payload.nodes.len());
            println!("  Verified: {verified}");
            println!("  Edges:    {}", payload.edges.len());
            println!();
        }
        // Bare JSON on stdout so the payload can be piped to a consumer.
        None => println!("{json}"),
    }

    Ok(())
}

async fn cmd_refine(node_path: &Path, model: Option<&str>) -> Result<()> {
    let config = resolve_config(model)?;

    let raw = std::fs::read_to_string(node_path)
        .map_err(|e| operation_failed(MindCiteError::io(node_path, e)))?;

    let node: MindMapNode = serde_json::from_str(&raw).map_err(|e| {
        operation_failed(MindCiteError::invalid_request(format!(
            "node payload is malformed: {e}"
        )))
    })?;

    info!(node_id = %node.id, "refining node");

    let revision = mindcite_core::refine(&config, &node)
        .await
        .map_err(operation_failed)?;

    println!("{}", serde_json::to_string_pretty(&revision)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config().map_err(operation_failed)?;
    println!("Config file created at {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config().map_err(operation_failed)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn node_verified(&self, title: &str, current: usize, total: usize, citations: usize) {
        self.spinner.set_message(format!(
            "Verifying [{current}/{total}] {title} ({citations} citations)"
        ));
    }

    fn done(&self, _payload: &MindMapPayload) {
        self.spinner.finish_and_clear();
    }
}
