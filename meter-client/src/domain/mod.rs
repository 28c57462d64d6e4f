pub mod history;
pub mod meter;

pub use history::{HistoryEntry, HistoryPoint};
pub use meter::{Meter, MeterKey, Reading, ReadingSet, UnknownMeterKey};
