use crate::domain::{MeterKey, Reading, UnknownMeterKey};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("meter not found: {0}")]
    NotFound(String),
    #[error("baseline for {meter} changed: expected {expected}, found {found}")]
    Conflict {
        meter: MeterKey,
        expected: Reading,
        found: Reading,
    },
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

impl From<UnknownMeterKey> for StoreError {
    fn from(e: UnknownMeterKey) -> Self {
        StoreError::NotFound(e.0)
    }
}

pub(crate) fn to_sql_reading(value: Reading) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidValue(format!("reading {value} exceeds storage range")))
}

pub(crate) fn from_sql_reading(meter: &str, value: i64) -> Result<Reading, StoreError> {
    Reading::try_from(value).map_err(|_| StoreError::InvalidValue(format!("negative reading {value} stored for {meter}")))
}
