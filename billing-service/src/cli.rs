use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use meter_client::{MeterKey, Reading, ReadingSet};

#[derive(Parser, Debug)]
#[command(name = "billing", version, about = "Electricity bill calculator: 3 tenants + shared water motor")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Config file (overrides BILLING_CONFIG)")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show whether initial readings exist and the current baselines.
    Status,
    /// Record first-time meter readings.
    Seed {
        #[command(flatten)]
        readings: ReadingArgs,
    },
    /// Compute the bill for new readings; `--save` also advances the baselines.
    Bill {
        #[command(flatten)]
        readings: ReadingArgs,
        #[arg(long, help = "Actual amount paid to the utility, shared by usage")]
        total: Option<f64>,
        #[arg(long, help = "Billing period label, e.g. Oct-2025 (defaults to the current month)")]
        period: Option<String>,
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    /// Show one meter's history, or every row when no meter is given.
    History { meter: Option<MeterKey> },
    /// Write the full history as CSV.
    Export { path: PathBuf },
    /// Drop all readings and history and start fresh.
    Reset {
        #[arg(long, default_value_t = false, help = "Confirm the irreversible reset")]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ReadingArgs {
    pub t1: Reading,
    pub t2: Reading,
    pub t3: Reading,
    pub water: Reading,
}

impl From<ReadingArgs> for ReadingSet {
    fn from(a: ReadingArgs) -> Self {
        ReadingSet::new(a.t1, a.t2, a.t3, a.water)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bill_parses_readings_and_flags() {
        let cli = Cli::try_parse_from([
            "billing", "bill", "150", "120", "130", "90", "--total", "1950", "--period", "Oct-2025", "--save",
        ])
        .unwrap();
        match cli.command {
            Commands::Bill {
                readings,
                total,
                period,
                save,
            } => {
                assert_eq!(ReadingSet::from(readings), ReadingSet::new(150, 120, 130, 90));
                assert_eq!(total, Some(1950.0));
                assert_eq!(period.as_deref(), Some("Oct-2025"));
                assert!(save);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn history_accepts_known_meters_only() {
        let cli = Cli::try_parse_from(["billing", "--json", "history", "water"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::History { meter: Some(MeterKey::Water) }));

        assert!(Cli::try_parse_from(["billing", "history", "t9"]).is_err());
    }

    #[test]
    fn negative_readings_are_rejected() {
        assert!(Cli::try_parse_from(["billing", "seed", "1", "2", "3", "-4"]).is_err());
    }
}
