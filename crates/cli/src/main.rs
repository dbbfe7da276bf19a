#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use dna_cli::commands::ledger::Ledger;
use dna_cli::commands::offline::Offline;
use dna_sdk::{DnaClient, RpcConfig};

/// Command-line entrypoint for the DNA ledger helper.
#[derive(Parser, Debug)]
#[command(
    name = "dna-cli",
    version,
    about = "Register, issue and transfer assets on a DNA node"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// JSON-RPC address(es) of the node, `;`-separated
    #[arg(long = "rpc", env = "DNA_RPC_ADDRESSES", global = true)]
    rpc: Option<String>,
    /// 32-byte hex seed accounts are derived from
    #[arg(long = "seed-hex", env = "SEED_HEX", global = true, hide_env_values = true)]
    seed_hex: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Offline(Offline),
    #[command(flatten)]
    Ledger(Ledger),
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    logging_init();

    let parsed = Cli::parse();
    let seed_hex = parsed.seed_hex.as_deref();

    match parsed.command {
        Commands::Offline(offline) => offline.handle(seed_hex),
        Commands::Ledger(ledger) => {
            let mut config = RpcConfig::from_env()?;
            if let Some(rpc) = parsed.rpc.as_deref() {
                config = config.with_addresses(rpc);
            }
            let client = DnaClient::connect(config)?;
            ledger.handle(&client, seed_hex)
        }
    }
}

fn logging_init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}
