use serde::Deserialize;
use std::{fs, io, path::Path};

use crate::engine::COST_PER_UNIT;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://electricity.db".to_string(),
            max_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub cost_per_unit: f64,
    pub currency_symbol: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            cost_per_unit: COST_PER_UNIT,
            currency_symbol: "₹".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Load from `BILLING_CONFIG`, falling back to `billing-config.toml`.
    ///
    /// A missing default file yields the built-in defaults; a missing file
    /// named explicitly by `BILLING_CONFIG` is an error.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        match env::var("BILLING_CONFIG") {
            Ok(path) => Self::from_path(path),
            Err(_) => match fs::read_to_string("billing-config.toml") {
                Ok(contents) => Self::from_toml_str(&contents),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
                Err(e) => Err(e.into()),
            },
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let cost = self.billing.cost_per_unit;
        if !cost.is_finite() || cost < 0.0 {
            anyhow::bail!("billing.cost_per_unit must be a non-negative amount, got {cost}");
        }
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url must not be empty");
        }
        Ok(())
    }
}
