//! Stock status classification.

use serde::{Deserialize, Serialize};

use storefront_core::DomainError;

/// Derived availability state of a stock record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in-stock",
            StockStatus::LowStock => "low-stock",
            StockStatus::OutOfStock => "out-of-stock",
        }
    }

    /// Whether an operator should look at this record (low or out of stock).
    pub fn needs_attention(&self) -> bool {
        !matches!(self, StockStatus::InStock)
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for StockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-stock" => Ok(StockStatus::InStock),
            "low-stock" => Ok(StockStatus::LowStock),
            "out-of-stock" => Ok(StockStatus::OutOfStock),
            other => Err(DomainError::validation(format!("unknown stock status '{other}'"))),
        }
    }
}

/// Classify a quantity against its reorder threshold.
///
/// The low-stock band is inclusive: a quantity equal to the threshold is
/// `LowStock`. Zero is always `OutOfStock`, even with a zero threshold.
pub fn classify(quantity: u64, threshold: u64) -> StockStatus {
    if quantity == 0 {
        StockStatus::OutOfStock
    } else if quantity <= threshold {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}
