//! Inventory domain module.
//!
//! This crate contains the stock-keeping rules for the storefront back office,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod record;
pub mod sku;
pub mod status;

pub use record::{
    AdjustStock, CreateRecord, Direction, RecordCreated, SetThreshold, StockCommand, StockEvent,
    MAX_QUANTITY, StockMovement, StockRecord, ThresholdChanged, apply_delta,
};
pub use sku::Sku;
pub use status::{StockStatus, classify};
