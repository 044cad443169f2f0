//! Culina CLI entry point.
//!
//! Binary name: `culina`
//!
//! Parses CLI arguments, initializes the database and configuration, then
//! dispatches to the chat loop or one of the listing commands.

mod chat;
mod models;
mod sessions;
mod state;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::generate;

use culina_observe::tracing_setup;

use state::AppState;

#[derive(Parser)]
#[command(name = "culina", about = "Personal recipe assistant with a conversational chat")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Export tracing spans via OpenTelemetry (stdout exporter)
    #[arg(long, global = true)]
    otel: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (the default)
    Chat,
    /// List persisted chat sessions
    Sessions,
    /// List models installed on the Ollama host
    Models,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "culina", &mut std::io::stdout());
        return Ok(());
    }

    if cli.otel {
        tracing_setup::init_tracing(true)
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    } else {
        let filter = tracing_setup::verbosity_filter(cli.verbose, cli.quiet);
        tracing_setup::init_tracing_with_filter(filter)
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    }

    let state = AppState::init().await?;

    let result = match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => chat::loop_runner::run_chat_loop(&state).await,
        Commands::Sessions => sessions::list_sessions(&state).await,
        Commands::Models => models::list_models(&state).await,
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    tracing_setup::shutdown_tracing();
    result
}
