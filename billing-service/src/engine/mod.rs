use std::collections::BTreeMap;

use meter_client::{MeterKey, ReadingSet, ReadingStore, StoreError};
use serde::Serialize;

mod allocation;
mod error;

pub use allocation::{allocate_units, round2, Allocation, Pricing, COST_PER_UNIT};
pub use error::BillingError;

/// Where the engine reads the baselines a submission is measured against.
#[async_trait::async_trait]
pub trait BaselineSource: Send + Sync {
    async fn baselines(&self) -> Result<ReadingSet, StoreError>;
}

#[async_trait::async_trait]
impl BaselineSource for ReadingStore {
    async fn baselines(&self) -> Result<ReadingSet, StoreError> {
        self.get_baselines().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Uninitialized,
    Initialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TenantCharge {
    pub units: f64,
    pub amount: f64,
}

/// Priced outcome of one submission. Units and amounts are rounded to two
/// decimals; nothing here is fed back into storage except `current`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingResult {
    pub charges: BTreeMap<MeterKey, TenantCharge>,
    pub pricing: Pricing,
    pub water_units: f64,
    pub water_share: f64,
    pub previous: ReadingSet,
    pub current: ReadingSet,
}

impl BillingResult {
    pub fn charge(&self, tenant: MeterKey) -> Option<&TenantCharge> {
        self.charges.get(&tenant)
    }

    pub fn amounts(&self) -> BTreeMap<MeterKey, f64> {
        self.charges.iter().map(|(&t, c)| (t, c.amount)).collect()
    }

    pub fn total_amount(&self) -> f64 {
        round2(self.charges.values().map(|c| c.amount).sum())
    }
}

/// Price a submission against a known baseline snapshot.
pub fn compute_bill(previous: &ReadingSet, current: &ReadingSet, pricing: Pricing) -> Result<BillingResult, BillingError> {
    let allocation = allocate_units(previous, current)?;
    let amounts = pricing.amounts(&allocation);

    let charges = allocation
        .final_units
        .iter()
        .map(|(&t, &units)| {
            let amount = amounts.get(&t).copied().unwrap_or_default();
            (
                t,
                TenantCharge {
                    units: round2(units),
                    amount: round2(amount),
                },
            )
        })
        .collect();

    Ok(BillingResult {
        charges,
        pricing,
        water_units: allocation.water_units,
        water_share: round2(allocation.water_share),
        previous: *previous,
        current: *current,
    })
}

/// Turns new readings into a priced result.
///
/// Holds no state of its own; baselines always come from `source`.
pub struct BillingEngine<S = ReadingStore> {
    source: S,
    cost_per_unit: f64,
}

impl<S: BaselineSource> BillingEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cost_per_unit: COST_PER_UNIT,
        }
    }

    pub fn with_cost_per_unit(mut self, cost_per_unit: f64) -> Self {
        self.cost_per_unit = cost_per_unit;
        self
    }

    pub fn cost_per_unit(&self) -> f64 {
        self.cost_per_unit
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Compute the bill for `current` without touching storage.
    ///
    /// A positive `actual_total_bill` is distributed in proportion to usage;
    /// otherwise every unit is charged at the flat rate.
    pub async fn calculate_bill(
        &self,
        current: &ReadingSet,
        actual_total_bill: Option<f64>,
    ) -> Result<BillingResult, BillingError> {
        let previous = self.source.baselines().await?;
        let res = Pricing::select(actual_total_bill, self.cost_per_unit)
            .and_then(|pricing| compute_bill(&previous, current, pricing));

        if let Err(e) = &res {
            metrics::counter!("billing_submissions_rejected_total").increment(1);
            tracing::warn!(error = %e, "submission rejected");
        }
        res
    }
}

impl BillingEngine<ReadingStore> {
    pub fn store(&self) -> &ReadingStore {
        &self.source
    }

    pub async fn system_state(&self) -> Result<SystemState, BillingError> {
        Ok(if self.source.is_initialized().await? {
            SystemState::Initialized
        } else {
            SystemState::Uninitialized
        })
    }

    /// Record first-time readings as the baseline. No bill is produced.
    pub async fn seed(&self, readings: &ReadingSet) -> Result<(), BillingError> {
        if self.system_state().await? == SystemState::Initialized {
            return Err(BillingError::AlreadyInitialized);
        }
        self.source.update_readings(&readings.to_map(), None, None).await?;
        tracing::info!(?readings, "initial readings recorded");
        Ok(())
    }

    /// Compute the bill and, if the baselines have not moved in the
    /// meantime, advance them and log the submission with tenant amounts.
    pub async fn settle(
        &self,
        current: &ReadingSet,
        actual_total_bill: Option<f64>,
        period: Option<&str>,
    ) -> Result<BillingResult, BillingError> {
        let bill = self.calculate_bill(current, actual_total_bill).await?;
        self.source
            .advance_baselines(&bill.previous, current, period, Some(&bill.amounts()))
            .await?;

        metrics::counter!("billing_submissions_total").increment(1);
        tracing::info!(
            period = period.unwrap_or("<current>"),
            total = bill.total_amount(),
            "submission saved"
        );
        Ok(bill)
    }
}
