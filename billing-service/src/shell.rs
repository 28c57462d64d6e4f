use std::{fmt::Write as _, path::PathBuf};

use anyhow::{bail, Result};
use meter_client::{HistoryEntry, HistoryPoint, Meter, MeterKey, ReadingSet};
use serde::Serialize;

use crate::{
    cli::Commands,
    engine::{BillingEngine, BillingResult, Pricing, SystemState},
    export,
};

/// What a command produced, printed as text or JSON by the binary.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Status { state: SystemState, meters: Vec<Meter> },
    Seeded { baselines: ReadingSet },
    Bill { bill: BillingResult, saved: bool },
    History { meter: MeterKey, rows: Vec<HistoryPoint> },
    FullHistory { rows: Vec<HistoryEntry> },
    Exported { path: PathBuf, rows: usize },
    Reset,
}

/// Run one command against an initialized store.
pub async fn execute(command: Commands, engine: &BillingEngine) -> Result<Outcome> {
    let store = engine.store();

    match command {
        Commands::Status => Ok(Outcome::Status {
            state: engine.system_state().await?,
            meters: store.get_meters().await?,
        }),
        Commands::Seed { readings } => {
            let readings = ReadingSet::from(readings);
            engine.seed(&readings).await?;
            Ok(Outcome::Seeded { baselines: readings })
        }
        Commands::Bill {
            readings,
            total,
            period,
            save,
        } => {
            if engine.system_state().await? == SystemState::Uninitialized {
                bail!("no initial readings yet; run `billing seed <t1> <t2> <t3> <water>` first");
            }
            let current = ReadingSet::from(readings);
            let bill = if save {
                engine.settle(&current, total, period.as_deref()).await?
            } else {
                engine.calculate_bill(&current, total).await?
            };
            Ok(Outcome::Bill { bill, saved: save })
        }
        Commands::History { meter: Some(meter) } => Ok(Outcome::History {
            meter,
            rows: store.get_history(meter).await?,
        }),
        Commands::History { meter: None } => Ok(Outcome::FullHistory {
            rows: store.get_full_history().await?,
        }),
        Commands::Export { path } => {
            let rows = export::export_history(store, &path).await?;
            Ok(Outcome::Exported { path, rows })
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("reset drops every reading and cannot be undone; pass --yes to confirm");
            }
            store.reset().await?;
            store.initialize().await?;
            Ok(Outcome::Reset)
        }
    }
}

impl Outcome {
    pub fn render(&self, currency: &str) -> String {
        let mut out = String::new();
        match self {
            Outcome::Status { state, meters } => {
                let label = match state {
                    SystemState::Initialized => "previous readings loaded",
                    SystemState::Uninitialized => "first-time setup needed: run `billing seed`",
                };
                let _ = writeln!(out, "Status: {label}");
                for m in meters {
                    let _ = writeln!(out, "  {:<12} {}", m.key.display_name(), m.last_reading);
                }
            }
            Outcome::Seeded { baselines } => {
                let _ = writeln!(out, "Initial readings saved.");
                for (key, value) in baselines.iter() {
                    let _ = writeln!(out, "  {:<12} {}", key.display_name(), value);
                }
            }
            Outcome::Bill { bill, saved } => {
                let mode = match bill.pricing {
                    Pricing::FlatRate { cost_per_unit } => format!("flat rate {currency}{cost_per_unit}/unit"),
                    Pricing::Proportional { total_bill } => format!("actual bill {currency}{total_bill} shared by usage"),
                };
                let _ = writeln!(out, "Final bill ({mode})");
                let _ = writeln!(
                    out,
                    "  water motor: {} units, {} per tenant",
                    bill.water_units, bill.water_share
                );
                for (tenant, charge) in &bill.charges {
                    let _ = writeln!(
                        out,
                        "  {:<12} units {:>10.2}  amount {currency}{:.2}",
                        tenant.display_name(),
                        charge.units,
                        charge.amount
                    );
                }
                let _ = writeln!(out, "  {:<12} {currency}{:.2}", "Total", bill.total_amount());
                if *saved {
                    let _ = writeln!(out, "Readings saved.");
                }
            }
            Outcome::History { meter, rows } => {
                let _ = writeln!(out, "{} history", meter.as_str().to_uppercase());
                for r in rows {
                    let _ = writeln!(out, "  {:<10} {}", r.period, r.reading);
                }
            }
            Outcome::FullHistory { rows } => {
                for r in rows {
                    let amount = r.amount.map(|a| format!("{currency}{a:.2}")).unwrap_or_default();
                    let _ = writeln!(out, "  {:<6} {:<10} {:>10} {}", r.meter, r.period, r.reading, amount);
                }
            }
            Outcome::Exported { path, rows } => {
                let _ = writeln!(out, "Exported {rows} rows to {}", path.display());
            }
            Outcome::Reset => {
                let _ = writeln!(out, "Database reset. Run `billing seed` to record initial readings.");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ReadingArgs;
    use meter_client::ReadingStore;

    async fn engine() -> BillingEngine {
        let store = ReadingStore::in_memory().await.unwrap();
        store.initialize().await.unwrap();
        BillingEngine::new(store)
    }

    fn readings(t1: u64, t2: u64, t3: u64, water: u64) -> ReadingArgs {
        ReadingArgs { t1, t2, t3, water }
    }

    #[tokio::test]
    async fn bill_before_seed_is_refused() {
        let engine = engine().await;
        let res = execute(
            Commands::Bill {
                readings: readings(1, 1, 1, 1),
                total: None,
                period: None,
                save: false,
            },
            &engine,
        )
        .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn seed_then_saved_bill_cycle() {
        let engine = engine().await;
        execute(Commands::Seed { readings: readings(100, 100, 100, 60) }, &engine)
            .await
            .unwrap();

        let outcome = execute(
            Commands::Bill {
                readings: readings(150, 120, 130, 90),
                total: None,
                period: Some("Oct-2025".to_string()),
                save: true,
            },
            &engine,
        )
        .await
        .unwrap();

        let text = outcome.render("₹");
        assert!(text.contains("Tenant 1"));
        assert!(text.contains("₹600.00"));
        assert!(text.contains("₹1300.00"));
        assert!(text.contains("Readings saved."));

        let history = execute(Commands::History { meter: Some(MeterKey::T2) }, &engine)
            .await
            .unwrap();
        match history {
            Outcome::History { rows, .. } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1], HistoryPoint { period: "Oct-2025".to_string(), reading: 120 });
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsaved_bill_keeps_baselines() {
        let engine = engine().await;
        engine.seed(&ReadingSet::new(100, 100, 100, 60)).await.unwrap();

        execute(
            Commands::Bill {
                readings: readings(150, 120, 130, 90),
                total: Some(1950.0),
                period: None,
                save: false,
            },
            &engine,
        )
        .await
        .unwrap();
        assert_eq!(
            engine.store().get_baselines().await.unwrap(),
            ReadingSet::new(100, 100, 100, 60)
        );
    }

    #[tokio::test]
    async fn reset_requires_confirmation() {
        let engine = engine().await;
        engine.seed(&ReadingSet::new(5, 5, 5, 5)).await.unwrap();

        assert!(execute(Commands::Reset { yes: false }, &engine).await.is_err());
        assert_eq!(engine.system_state().await.unwrap(), SystemState::Initialized);

        execute(Commands::Reset { yes: true }, &engine).await.unwrap();
        assert_eq!(engine.system_state().await.unwrap(), SystemState::Uninitialized);
        assert_eq!(engine.store().get_previous_reading(MeterKey::Water).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn status_serializes_with_kind_tag() {
        let engine = engine().await;
        let outcome = execute(Commands::Status, &engine).await.unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "status");
        assert_eq!(json["state"], "uninitialized");
        assert_eq!(json["meters"].as_array().map(Vec::len), Some(4));
    }
}
