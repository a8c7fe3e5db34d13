//! Streamgate CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the gateway, cache keepalive, and memory reaper
//! - `sweep`: Run one cache keepalive sweep and report
//! - `tenants`: List configured tenants
//! - `init`: Print or write a default configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "streamgate",
    about = "Streamgate: streaming inference gateway",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "STREAMGATE_LOG_JSON")]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Renew every tenant's upstream cache once
    Sweep,

    /// List configured tenants (credentials redacted)
    Tenants,

    /// Print a default configuration
    Init {
        /// Write it to the config path instead of stdout
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Sweep => commands::sweep::run(cli.json).await?,
        Commands::Tenants => commands::tenants::run(cli.json).await?,
        Commands::Init { write } => commands::init::run(write).await?,
    }

    Ok(())
}
