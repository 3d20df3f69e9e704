//! Control mode listing command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use haptic_control::SimpleControlMode;

/// Arguments for `haptic modes`.
#[derive(Args)]
pub struct ModesArgs {
    /// Print only the names, one per line
    #[arg(long)]
    names_only: bool,
}

/// Prints the mode table.
pub fn run(args: ModesArgs) -> anyhow::Result<()> {
    if args.names_only {
        for mode in SimpleControlMode::ALL {
            println!("{mode}");
        }
        return Ok(());
    }

    println!("Control Modes");
    println!("=============");
    println!();
    println!("  {:4}  {:10}  {}", "Id", "Name", "Description");
    println!("  {:4}  {:10}  {}", "--", "----", "-----------");
    for mode in SimpleControlMode::ALL {
        println!("  {:4}  {:10}  {}", mode.id(), mode.name(), mode.description());
    }
    println!();
    println!("Bind a mode per motor with: haptic simulate --mode 0=gravity-z");
    println!("Use 'none' to leave a motor unbound.");
    Ok(())
}
