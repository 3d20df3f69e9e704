//! Haptic CLI - drive the control graph from the command line.

mod commands;
mod synthetic;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "haptic")]
#[command(author, version, about = "Haptic control CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller against the debug device with synthetic sensors
    Simulate(commands::simulate::SimulateArgs),

    /// List control modes
    Modes(commands::modes::ModesArgs),

    /// Inspect and validate configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Modes(args) => commands::modes::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
