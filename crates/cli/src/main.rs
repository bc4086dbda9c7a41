//! scenewright CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Send one message through the configured backend
//! - `render`: Fit and print the context without sending it
//! - `status`: Show configuration and backend selection
//! - `config`: Print the default configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "scenewright",
    about = "scenewright: bounded-context chat client",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message and print the reply
    Chat {
        /// The user message
        #[arg(short, long)]
        message: String,

        /// Profile to use instead of the configured default
        #[arg(short, long, env = "SCENEWRIGHT_PROFILE")]
        profile: Option<String>,

        /// Stream the reply as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Print the fitted context for a message without sending it
    Render {
        /// The user message
        #[arg(short, long)]
        message: String,

        /// Profile to use instead of the configured default
        #[arg(short, long, env = "SCENEWRIGHT_PROFILE")]
        profile: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show configuration status
    Status,

    /// Print a default configuration file
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            profile,
            stream,
        } => commands::chat::run(message, profile, stream).await?,
        Commands::Render {
            message,
            profile,
            json,
        } => commands::render::run(message, profile, json).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Config => commands::config_cmd::run().await?,
    }

    Ok(())
}
