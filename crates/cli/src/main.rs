//! Voiceprint CLI, the main entry point.
//!
//! Commands:
//! - `init`         Write a default config file
//! - `import`       Load a user's past writing
//! - `chat`         Talk to the writing agent
//! - `generate`     Write one text directly, without the agent loop
//! - `fingerprint`  Show (or rebuild) a user's style fingerprint
//! - `status`       Show what data a user has on file
//! - `summarize`    Compact a conversation's memory now

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "voiceprint",
    about = "Voiceprint: an agent that writes in your own voice",
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
    /// Write a default config.toml to ~/.voiceprint
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Import past writing from a JSON export
    Import {
        #[arg(short, long, env = "VOICEPRINT_USER")]
        user: String,

        /// A JSON array of texts, or an object with `profile` and `texts`
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Chat with the writing agent
    Chat {
        #[arg(short, long, env = "VOICEPRINT_USER")]
        user: String,

        /// Resume a conversation; a new one is started when omitted
        #[arg(short, long)]
        conversation: Option<String>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Generate one text in the user's voice
    Generate {
        #[arg(short, long, env = "VOICEPRINT_USER")]
        user: String,

        #[arg(short, long)]
        topic: String,

        #[arg(short, long)]
        angle: Option<String>,
    },

    /// Show the user's style fingerprint
    Fingerprint {
        #[arg(short, long, env = "VOICEPRINT_USER")]
        user: String,

        /// Re-extract from the corpus instead of using the cached copy
        #[arg(long)]
        refresh: bool,
    },

    /// Show which data a user has on file
    Status {
        #[arg(short, long, env = "VOICEPRINT_USER")]
        user: String,
    },

    /// Summarize a conversation's memory now
    Summarize {
        #[arg(short, long)]
        conversation: String,

        /// Compact all memory into one summary instead of appending a batch
        #[arg(long)]
        deep: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

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
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Import { user, file } => commands::import::run(&user, &file).await?,
        Commands::Chat { user, conversation, message } => {
            commands::chat::run(&user, conversation, message).await?
        }
        Commands::Generate { user, topic, angle } => {
            commands::generate::run(&user, topic, angle).await?
        }
        Commands::Fingerprint { user, refresh } => commands::fingerprint::run(&user, refresh).await?,
        Commands::Status { user } => commands::status::run(&user).await?,
        Commands::Summarize { conversation, deep } => {
            commands::summarize::run(&conversation, deep).await?
        }
    }

    Ok(())
}
