use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use murmur::api::ApiServerBuilder;
use murmur::db::{self, HistoryRepo};
use murmur::pipeline::{Inbound, Reply};
use murmur::{Config, Pipeline};

/// Murmur - a voice-capable chat-bot backend
#[derive(Parser)]
#[command(name = "murmur", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides MURMUR_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Send one text message
    Chat {
        /// User ID
        #[arg(short, long)]
        user: String,
        /// Display name used in the prompt
        #[arg(short, long, default_value = "")]
        name: String,
        /// Also synthesize the reply
        #[arg(long)]
        speak: bool,
        /// Message text
        text: String,
    },
    /// Send one voice message (OGG/Opus clip)
    Voice {
        /// User ID
        #[arg(short, long)]
        user: String,
        /// Display name used in the prompt
        #[arg(short, long, default_value = "")]
        name: String,
        /// Also synthesize the reply
        #[arg(long)]
        speak: bool,
        /// Path to the recorded clip
        file: PathBuf,
    },
    /// Show a user's recent history
    History {
        /// User ID
        #[arg(short, long)]
        user: String,
        /// Number of turns (defaults to the history window)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// List stored conversations, most recent first
    Conversations {
        /// Maximum number of conversations
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,murmur=info",
        1 => "info,murmur=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let pool = db::open(&config.store)?;

    match cli.command {
        Command::Serve { port } => serve(&config, pool, port).await,
        Command::Chat {
            user,
            name,
            speak,
            text,
        } => {
            let pipeline = Pipeline::from_config(&config, pool)?;
            let reply = pipeline
                .handle(Inbound::text(user, name, text).speak(speak))
                .await?;
            print_reply(&reply);
            Ok(())
        }
        Command::Voice {
            user,
            name,
            speak,
            file,
        } => {
            let pipeline = Pipeline::from_config(&config, pool)?;
            let reply = pipeline
                .handle(Inbound::voice(user, name, file).speak(speak))
                .await?;
            print_reply(&reply);
            Ok(())
        }
        Command::History { user, limit } => {
            let repo = HistoryRepo::new(pool);
            let limit = limit.unwrap_or(config.llm.history_window);
            let turns = repo.window(&user, limit)?;

            if turns.is_empty() {
                println!("No history for user {user}");
            }
            for turn in &turns {
                println!("{}: {}", turn.speaker().as_str(), turn.text());
            }
            Ok(())
        }
        Command::Conversations { limit } => {
            let repo = HistoryRepo::new(pool);
            let logs = repo.list_logs(limit)?;

            if logs.is_empty() {
                println!("No conversations stored");
            }
            for log in logs {
                println!(
                    "{}\t{} turns\tupdated {}",
                    log.user_id,
                    log.turn_count,
                    log.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(())
        }
    }
}

async fn serve(config: &Config, pool: db::DbPool, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.port);
    let pipeline = Arc::new(Pipeline::from_config(config, pool.clone())?);

    tracing::info!(port, model = %config.llm.model, "starting murmur");

    let server = ApiServerBuilder::new(pool, pipeline, port)
        .config(config)
        .build();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    Ok(())
}

fn print_reply(reply: &Reply) {
    if let Some(transcript) = &reply.transcript {
        println!("you: {transcript}");
    }
    println!("bot: {}", reply.text);
    if let Some(audio) = &reply.audio {
        println!("audio: {}", audio.display());
    }
    if reply.fallback {
        tracing::warn!("reply is a fallback, see log for the upstream error");
    } else if !reply.saved {
        tracing::warn!("exchange was not saved to history");
    }
}
