use crate::domain::account::AccountId;
use crate::domain::money::Money;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sellable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(rename = "seller")]
    pub seller_id: AccountId,
    pub price: Money,
    pub quantity: u32,
}

impl Product {
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        seller_id: impl Into<AccountId>,
        price: Money,
        quantity: u32,
    ) -> Result<Self> {
        let product = Self {
            id: id.into(),
            name: name.into(),
            seller_id: seller_id.into(),
            price,
            quantity,
        };
        product.validate()?;
        Ok(product)
    }

    /// Checks invariants that deserialized rows cannot enforce on their own.
    pub fn validate(&self) -> Result<()> {
        if self.price.is_negative() {
            return Err(EngineError::ValidationError(format!(
                "Product {} has a negative price",
                self.id
            )));
        }
        Ok(())
    }

    pub fn has_stock(&self, requested: u32) -> bool {
        self.quantity >= requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_negative_price_rejected() {
        let result = Product::new("p1", "Lamp", "sam", Money::new(dec!(-1)), 3);
        assert!(matches!(result, Err(EngineError::ValidationError(_))));
    }

    #[test]
    fn test_free_product_allowed() {
        let product = Product::new("p1", "Sticker", "sam", Money::ZERO, 3).unwrap();
        assert!(product.has_stock(3));
        assert!(!product.has_stock(4));
    }
}
