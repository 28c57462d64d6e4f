pub mod error;
pub mod reading_queries;
pub mod reading_store;

pub use error::StoreError;
pub use reading_store::ReadingStore;
