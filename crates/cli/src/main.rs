mod migrate;
mod rollback;
mod stages;
mod status;
mod store;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use crate::store::JsonFileStore;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Membership store migration toolchain.
#[derive(Parser)]
#[command(name = "quorum", version, about = "Membership store migration toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to the JSON store document (defaults to $QUORUM_STORE, then
    /// ./quorum-store.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations from the built-in catalog
    Migrate,

    /// Roll back the most recently executed migration
    Rollback,

    /// Report aggregate migration status
    Status,

    /// Print the current approval chain of a workflow
    Stages {
        /// Workflow type
        #[arg(long, default_value = "member_onboarding")]
        workflow: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let path = resolve_store_path(cli.store);
    let store = match JsonFileStore::open(&path) {
        Ok(s) => s,
        Err(e) => {
            report_error(
                &format!("cannot open store '{}': {}", path.display(), e),
                cli.output,
                cli.quiet,
            );
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Migrate => migrate::cmd_migrate(store, cli.output, cli.quiet).await,
        Commands::Rollback => rollback::cmd_rollback(store, cli.output, cli.quiet).await,
        Commands::Status => status::cmd_status(store, cli.output, cli.quiet).await,
        Commands::Stages { workflow } => {
            stages::cmd_stages(store, &workflow, cli.output, cli.quiet).await
        }
    }
}

/// Explicit flag wins, then $QUORUM_STORE, then the conventional name in
/// the working directory.
fn resolve_store_path(arg: Option<PathBuf>) -> PathBuf {
    arg.or_else(|| std::env::var_os("QUORUM_STORE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("quorum-store.json"))
}

/// Engine logs go to stderr so `--output json` stdout stays parseable.
fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
