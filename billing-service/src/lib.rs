pub mod cli;
pub mod config;
pub mod engine;
pub mod export;
pub mod observability;
pub mod shell;
pub mod validation;

pub use engine::{BillingEngine, BillingError, BillingResult};
