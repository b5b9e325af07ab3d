//! Presale server entry point.
//!
//! Binary name: `presale`
//!
//! Parses CLI arguments, initializes the database and the orchestration
//! stack, then serves the WebSocket endpoint.

mod router;
mod state;
mod ws;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use state::AppState;

#[derive(Parser)]
#[command(name = "presale", version, about = "Negotiation chat orchestration service")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket server
    Serve {
        /// Bind address, overriding config.toml
        #[arg(long)]
        bind: Option<String>,

        /// Data directory holding config.toml and the database
        #[arg(long, env = "PRESALE_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,presale=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { bind, data_dir } => {
            let data_dir = data_dir.unwrap_or_else(default_data_dir);
            tokio::fs::create_dir_all(&data_dir).await?;

            let state = AppState::init(&data_dir).await?;
            let addr = bind.unwrap_or_else(|| state.config.bind_addr.clone());

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("presale listening on ws://{addr}/ws");

            axum::serve(listener, router::build_router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}

fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".presale")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
