use std::{fs::File, io, path::Path};

use meter_client::{HistoryEntry, ReadingStore, StoreError};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("failed to create export file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write CSV record: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// CSV export of the reading log.
///
/// Columns, in insertion order of the log:
/// - meter_id
/// - period
/// - reading
/// - amount (empty when no amount was billed)
#[derive(Serialize)]
struct HistoryRecord<'a> {
    meter_id: &'a str,
    period: &'a str,
    reading: u64,
    amount: Option<f64>,
}

pub fn write_history_csv<W: io::Write>(entries: &[HistoryEntry], writer: W) -> Result<usize, ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for e in entries {
        wtr.serialize(HistoryRecord {
            meter_id: e.meter.as_str(),
            period: &e.period,
            reading: e.reading,
            amount: e.amount,
        })?;
    }
    wtr.flush()?;
    Ok(entries.len())
}

/// Write the full history to `path`, returning the number of rows exported.
pub async fn export_history(store: &ReadingStore, path: &Path) -> Result<usize, ExportError> {
    let entries = store.get_full_history().await?;
    let file = File::create(path)?;
    let rows = write_history_csv(&entries, file)?;
    tracing::info!(rows, path = %path.display(), "history exported");
    Ok(rows)
}
