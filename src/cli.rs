//! Command-line interface definitions
//!
//! The live device session is owned by the surrounding deployment; the CLI
//! works offline against the persisted snapshot.

use aquastat_core::types::UnitSystem;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aquastat - rolling water-consumption accounting and leak detection
#[derive(Parser)]
#[command(name = "aquastat", version, about, long_about = None)]
pub struct Cli {
    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Load a snapshot and print the derived accounting report
    Inspect {
        /// Snapshot file (defaults to the platform data directory)
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Timezone for period boundaries (e.g. 'America/New_York');
        /// defaults to the system timezone
        #[arg(long)]
        timezone: Option<String>,

        /// Water tariff per billing unit (0 disables cost figures)
        #[arg(long, default_value_t = 0.0)]
        tariff: f64,

        /// Billing unit system: metric (per m³) or us_customary (per gallon)
        #[arg(long, default_value_t = UnitSystem::Metric)]
        units: UnitSystem,

        /// Leak detection threshold in L/min
        #[arg(long, default_value_t = 0.0)]
        leak_threshold: f64,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default snapshot path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_inspect() {
        let cli = Cli::parse_from([
            "aquastat",
            "inspect",
            "--tariff",
            "2.5",
            "--units",
            "us_customary",
            "--json",
        ]);
        match cli.command {
            Some(Command::Inspect {
                tariff,
                units,
                json,
                ..
            }) => {
                assert_eq!(tariff, 2.5);
                assert_eq!(units, UnitSystem::UsCustomary);
                assert!(json);
            }
            _ => panic!("expected inspect command"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_units() {
        assert!(Cli::try_parse_from(["aquastat", "inspect", "--units", "cubits"]).is_err());
    }
}
