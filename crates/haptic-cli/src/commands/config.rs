//! Configuration inspection commands.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use haptic_config::{ControlConfig, default_config_path, load_or_default};

/// Arguments for `haptic config`.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show {
        /// Configuration file (defaults to the user config, then built-ins)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check a configuration file
    Validate {
        /// File to check
        path: PathBuf,
    },

    /// Print the default configuration file location
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show { config } => {
            let effective = load_or_default(config.as_deref())?;
            print!("{}", effective.to_toml()?);
        }
        ConfigCommand::Validate { path } => {
            ControlConfig::load(&path)
                .with_context(|| format!("{} is not a valid configuration", path.display()))?;
            println!("OK: {}", path.display());
        }
        ConfigCommand::Path => println!("{}", default_config_path().display()),
    }
    Ok(())
}
