use meter_client::{MeterKey, Reading, StoreError};

#[derive(thiserror::Error, Debug)]
pub enum BillingError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{meter} reading {current} is below the stored baseline {previous}")]
    ReadingBelowBaseline {
        meter: MeterKey,
        previous: Reading,
        current: Reading,
    },
    #[error("initial readings were already recorded; reset before seeding again")]
    AlreadyInitialized,
}
