pub mod clock;
pub mod db;
pub mod domain;

pub use db::{ReadingStore, StoreError};
pub use domain::{HistoryEntry, HistoryPoint, Meter, MeterKey, Reading, ReadingSet};
