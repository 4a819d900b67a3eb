//! blerec - replay and inspect audio notification captures from a BLE
//! recording device.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{GenerateCommand, InspectCommand, ReplayCommand};

/// blerec - BLE audio recorder tooling.
///
/// Captures hold one notification per line, hex encoded. They can be
/// replayed into a recording, inspected packet by packet, or generated
/// synthetically with deterministic packet loss.
///
/// Configuration is read from ~/.blerec/config.yaml if present.
#[derive(Parser)]
#[command(name = "blerec")]
#[command(about = "BLE audio packet reassembly and recording tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.blerec/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output file
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a capture into a recording
    Replay(ReplayCommand),
    /// Show every packet of a capture and what it produced
    Inspect(InspectCommand),
    /// Write a synthetic capture
    Generate(GenerateCommand),
    /// Print the device GATT profile
    Profile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Replay(cmd) => cmd.run(&cli).await,
        Commands::Inspect(cmd) => cmd.run(&cli),
        Commands::Generate(cmd) => cmd.run(&cli),
        Commands::Profile => commands::print_profile(&cli),
    }
}
