use anyhow::Result;
use billing_service::{
    cli::Cli,
    config::AppConfig,
    engine::BillingEngine,
    observability,
    shell,
};
use clap::Parser;
use meter_client::ReadingStore;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cli = Cli::parse();

    // Load configuration
    let cfg = match &cli.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::load()?,
    };

    let store = ReadingStore::connect(&cfg.database.url, cfg.database.max_connections).await?;
    store.initialize().await?;

    let engine = BillingEngine::new(store).with_cost_per_unit(cfg.billing.cost_per_unit);
    let outcome = shell::execute(cli.command, &engine).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", outcome.render(&cfg.billing.currency_symbol));
    }

    Ok(())
}
