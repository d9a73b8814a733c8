//! Infrastructure layer: storage backends and the application services that
//! orchestrate domain logic over them.

pub mod accounts;
pub mod stock_service;
pub mod stock_store;

pub use stock_service::{Adjustment, StockError, StockService};
