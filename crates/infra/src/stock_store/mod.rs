//! Stock record persistence boundary.
//!
//! Defines the storage abstraction used by the stock service plus its
//! in-memory (dev/test) and Postgres implementations.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;
pub use r#trait::{StockStore, StoreError};
