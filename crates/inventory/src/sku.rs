use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult};

const MAX_SKU_LEN: usize = 64;

/// Stock keeping unit: the unique key of a stock record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    /// Validate and wrap a SKU. Surrounding whitespace is trimmed.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if s.len() > MAX_SKU_LEN {
            return Err(DomainError::validation(format!(
                "sku cannot exceed {MAX_SKU_LEN} characters"
            )));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control() || c == '/') {
            return Err(DomainError::validation(
                "sku cannot contain whitespace, control characters or '/'",
            ));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sku {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sku::parse(&value)
    }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self {
        value.0
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
