use std::{collections::BTreeMap, str::FromStr, sync::Arc};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;

use super::{
    error::{from_sql_reading, to_sql_reading},
    reading_queries::{self as q, HistoryRow},
    StoreError,
};
use crate::{
    clock::{period_label, Clock, SystemClock},
    domain::{HistoryEntry, HistoryPoint, Meter, MeterKey, Reading, ReadingSet},
};

/// Durable baselines plus the append-only reading log.
///
/// The pool is injected so callers decide where the data lives; tests use
/// [`ReadingStore::in_memory`]. All writes go through one mutex, so a batch
/// is never interleaved with another batch from the same process.
#[derive(Clone)]
pub struct ReadingStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    writes: Arc<Mutex<()>>,
}

impl ReadingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Open (creating if needed) the database at `url`, e.g. `sqlite://electricity.db`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(opts)
            .await?;
        Ok(Self::new(pool))
    }

    /// A private in-memory database. Kept on a single connection that never
    /// expires, since every new SQLite memory connection is a fresh database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Create the tables and zero baselines for any missing meter. Safe to
    /// call on every start.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        let _guard = self.writes.lock().await;
        let mut tx = self.pool.begin().await?;
        q::create_schema(&mut tx).await?;
        let inserted = q::insert_missing_meters(&mut tx, &MeterKey::ALL).await?;
        tx.commit().await?;

        if inserted > 0 {
            tracing::info!(inserted, "reading store initialized");
        }
        Ok(())
    }

    /// True once any meter carries a baseline above zero.
    ///
    /// A store whose tables were dropped by [`reset`](Self::reset) reports
    /// false rather than failing.
    pub async fn is_initialized(&self) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        if !q::meters_table_exists(&mut conn).await? {
            return Ok(false);
        }
        Ok(q::count_nonzero_meters(&mut conn).await? > 0)
    }

    pub async fn get_previous_reading(&self, meter: MeterKey) -> Result<Reading, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let value = q::last_reading(&mut conn, meter)
            .await?
            .ok_or_else(|| StoreError::NotFound(meter.to_string()))?;
        tracing::debug!(%meter, value, "loaded baseline");
        from_sql_reading(meter.as_str(), value)
    }

    /// All four baselines read on one connection.
    pub async fn get_baselines(&self) -> Result<ReadingSet, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let mut set = ReadingSet::default();
        for meter in MeterKey::ALL {
            let value = q::last_reading(&mut conn, meter)
                .await?
                .ok_or_else(|| StoreError::NotFound(meter.to_string()))?;
            set.set(meter, from_sql_reading(meter.as_str(), value)?);
        }
        Ok(set)
    }

    pub async fn get_meters(&self) -> Result<Vec<Meter>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let mut meters = Vec::new();
        for row in q::all_meters(&mut conn).await? {
            let key = MeterKey::from_str(&row.meter_id)?;
            meters.push(Meter {
                key,
                last_reading: from_sql_reading(&row.meter_id, row.last_reading)?,
            });
        }
        meters.sort_by_key(|m| m.key);
        Ok(meters)
    }

    /// Overwrite the baseline of every meter in `readings` and log one row
    /// per meter, all in one transaction.
    ///
    /// A missing or blank `period` is replaced by the current month label.
    pub async fn update_readings(
        &self,
        readings: &BTreeMap<MeterKey, Reading>,
        period: Option<&str>,
        amounts: Option<&BTreeMap<MeterKey, f64>>,
    ) -> Result<(), StoreError> {
        self.write_batch(None, readings, period, amounts).await
    }

    /// Like [`update_readings`](Self::update_readings), but only if the stored
    /// baselines still equal `expected`. Otherwise fails with
    /// [`StoreError::Conflict`] and writes nothing.
    pub async fn advance_baselines(
        &self,
        expected: &ReadingSet,
        readings: &ReadingSet,
        period: Option<&str>,
        amounts: Option<&BTreeMap<MeterKey, f64>>,
    ) -> Result<(), StoreError> {
        self.write_batch(Some(expected), &readings.to_map(), period, amounts)
            .await
    }

    pub async fn get_history(&self, meter: MeterKey) -> Result<Vec<HistoryPoint>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = q::meter_history(&mut conn, meter).await?;
        rows.into_iter()
            .map(|r| history_entry(r).map(HistoryPoint::from))
            .collect()
    }

    pub async fn get_full_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = q::full_history(&mut conn).await?;
        rows.into_iter().map(history_entry).collect()
    }

    /// Drop every table. Irreversible; call [`initialize`](Self::initialize)
    /// before using the store again.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let _guard = self.writes.lock().await;
        let mut tx = self.pool.begin().await?;
        q::drop_schema(&mut tx).await?;
        tx.commit().await?;
        tracing::warn!("reading store reset, all baselines and history dropped");
        Ok(())
    }

    fn resolve_period(&self, period: Option<&str>) -> Result<String, StoreError> {
        match period.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Ok(p.to_string()),
            None => period_label(self.clock.now())
                .map_err(|e| StoreError::InvalidValue(format!("cannot format period label: {e}"))),
        }
    }

    async fn write_batch(
        &self,
        expected: Option<&ReadingSet>,
        readings: &BTreeMap<MeterKey, Reading>,
        period: Option<&str>,
        amounts: Option<&BTreeMap<MeterKey, f64>>,
    ) -> Result<(), StoreError> {
        if readings.is_empty() {
            return Ok(());
        }
        let period = self.resolve_period(period)?;

        let _guard = self.writes.lock().await;
        match self.write_batch_locked(expected, readings, &period, amounts).await {
            Ok(()) => {
                metrics::counter!("reading_store_writes_total").increment(1);
                tracing::info!(period = %period, meters = readings.len(), "baselines advanced");
                Ok(())
            }
            Err(e) => {
                metrics::counter!("reading_store_write_errors_total").increment(1);
                tracing::error!(error = %e, period = %period, "reading batch rolled back");
                Err(e)
            }
        }
    }

    async fn write_batch_locked(
        &self,
        expected: Option<&ReadingSet>,
        readings: &BTreeMap<MeterKey, Reading>,
        period: &str,
        amounts: Option<&BTreeMap<MeterKey, f64>>,
    ) -> Result<(), StoreError> {
        // Dropping `tx` on any early return rolls the whole batch back.
        let mut tx = self.pool.begin().await?;

        if let Some(expected) = expected {
            for (meter, want) in expected.iter() {
                let found = q::last_reading(&mut tx, meter)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(meter.to_string()))?;
                let found = from_sql_reading(meter.as_str(), found)?;
                if found != want {
                    return Err(StoreError::Conflict {
                        meter,
                        expected: want,
                        found,
                    });
                }
            }
        }

        for (&meter, &value) in readings {
            let stored = to_sql_reading(value)?;
            if q::set_last_reading(&mut tx, meter, stored).await? == 0 {
                return Err(StoreError::NotFound(meter.to_string()));
            }
            let amount = amounts.and_then(|a| a.get(&meter).copied());
            q::append_history(&mut tx, meter, period, stored, amount).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn history_entry(row: HistoryRow) -> Result<HistoryEntry, StoreError> {
    Ok(HistoryEntry {
        id: row.id,
        meter: MeterKey::from_str(&row.meter_id)?,
        reading: from_sql_reading(&row.meter_id, row.reading)?,
        period: row.period,
        amount: row.amount,
    })
}
