use serde::Serialize;

use super::{MeterKey, Reading};

/// One row of the append-only reading log.
///
/// `period` is whatever label the operator chose; rows are ordered by
/// insertion (`id`), never by period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub meter: MeterKey,
    pub period: String,
    pub reading: Reading,
    pub amount: Option<f64>,
}

/// A single meter's view of its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPoint {
    pub period: String,
    pub reading: Reading,
}

impl From<HistoryEntry> for HistoryPoint {
    fn from(e: HistoryEntry) -> Self {
        HistoryPoint {
            period: e.period,
            reading: e.reading,
        }
    }
}
