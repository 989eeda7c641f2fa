//! Conduit CLI — runs the RPC data source server.
//!
//! ```bash
//! conduit serve --port 1234
//! conduit serve --definition library.json
//! conduit inspect --definition library.json
//! ```
//!
//! See `conduit --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conduit", about = "Conduit RPC data source server", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the RPC server
    Serve {
        /// Configuration file
        #[arg(long, default_value = "conduit.toml")]
        config: PathBuf,

        /// Listening address, overrides the configuration
        #[arg(long)]
        host: Option<String>,

        /// Listening port, overrides the configuration
        #[arg(long)]
        port: Option<u16>,

        /// Serve this data source definition for every request
        #[arg(long)]
        definition: Option<PathBuf>,
    },
    /// Print the resolved configuration
    Config {
        #[arg(long, default_value = "conduit.toml")]
        config: PathBuf,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
    /// List the collections a running server advertises
    Inspect {
        /// Configuration file providing `rpc.url`
        #[arg(long, default_value = "conduit.toml")]
        config: PathBuf,

        /// Server endpoint, overrides the configuration
        #[arg(long)]
        url: Option<String>,

        /// Data source definition sent with the handshake
        #[arg(long)]
        definition: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, host, port, definition } => {
            commands::serve::run(&config, host, port, definition.as_deref()).await
        }
        Commands::Config { config, host, port } => commands::config::run(&config, host, port),
        Commands::Inspect { config, url, definition } => commands::inspect::run(&config, url, &definition).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
