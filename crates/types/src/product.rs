use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::is_valid_product_id;

/// Catalog item. Read-only inside the negotiation core; the catalog CRUD
/// surface lives with an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,

    /// Listed price and the opening counter, integer rupees
    pub anchor_price: u64,

    /// Seller's cost, integer rupees
    pub cost_price: u64,

    /// Minimum margin over cost, 0 <= m < 1. Derives the floor; never
    /// revealed externally.
    pub min_margin: Decimal,

    /// Target margin over cost, min_margin <= m < 1
    pub target_margin: Decimal,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProductError {
    #[error("invalid product id: {0}")]
    InvalidId(String),

    #[error("anchor price must be positive")]
    NonPositiveAnchor,

    #[error("cost price must be positive and below anchor")]
    InvalidCost,

    #[error("margin out of range: {0}")]
    MarginOutOfRange(String),

    #[error("floor {floor} exceeds target {target} or anchor {anchor}")]
    InconsistentPricing { floor: u64, target: u64, anchor: u64 },
}

impl Product {
    /// Minimum acceptable seller price, integer rupees rounded up
    pub fn floor_price(&self) -> u64 {
        ceil_to_rupee(Decimal::from(self.cost_price) * (Decimal::ONE + self.min_margin))
    }

    /// Target price derived from the target margin, integer rupees rounded up
    pub fn target_price(&self) -> u64 {
        ceil_to_rupee(Decimal::from(self.cost_price) * (Decimal::ONE + self.target_margin))
    }

    /// Check the pricing invariant: floor <= target <= anchor
    pub fn validate(&self) -> Result<(), ProductError> {
        if !is_valid_product_id(&self.id) {
            return Err(ProductError::InvalidId(self.id.clone()));
        }
        if self.anchor_price == 0 {
            return Err(ProductError::NonPositiveAnchor);
        }
        if self.cost_price == 0 || self.cost_price >= self.anchor_price {
            return Err(ProductError::InvalidCost);
        }
        for (name, m) in [("min_margin", self.min_margin), ("target_margin", self.target_margin)] {
            if m < Decimal::ZERO || m >= Decimal::ONE {
                return Err(ProductError::MarginOutOfRange(name.to_string()));
            }
        }
        if self.target_margin < self.min_margin {
            return Err(ProductError::MarginOutOfRange("target_margin".to_string()));
        }

        let floor = self.floor_price();
        let target = self.target_price();
        if floor > target || target > self.anchor_price {
            return Err(ProductError::InconsistentPricing {
                floor,
                target,
                anchor: self.anchor_price,
            });
        }
        Ok(())
    }
}

/// Round a decimal rupee amount up to the next whole rupee
pub fn ceil_to_rupee(amount: Decimal) -> u64 {
    amount.ceil().to_u64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn make_test_product() -> Product {
        Product {
            id: "sku-chappal-42".to_string(),
            name: "Kolhapuri Chappal".to_string(),
            category: "footwear".to_string(),
            anchor_price: 12_999,
            cost_price: 9_000,
            min_margin: Decimal::new(5, 2),     // 0.05
            target_margin: Decimal::new(30, 2), // 0.30
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_floor_price_rounds_up() {
        let product = make_test_product();
        // 9000 * 1.05 = 9450 exactly
        assert_eq!(product.floor_price(), 9_450);

        let mut odd = product.clone();
        odd.cost_price = 9_001;
        // 9001 * 1.05 = 9451.05 -> 9452
        assert_eq!(odd.floor_price(), 9_452);
    }

    #[test]
    fn test_validate_ok() {
        assert!(make_test_product().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_cost_above_anchor() {
        let mut product = make_test_product();
        product.cost_price = 13_000;
        assert_eq!(product.validate(), Err(ProductError::InvalidCost));
    }

    #[test]
    fn test_validate_rejects_bad_margins() {
        let mut product = make_test_product();
        product.min_margin = Decimal::new(-5, 2);
        assert!(matches!(
            product.validate(),
            Err(ProductError::MarginOutOfRange(_))
        ));

        let mut product = make_test_product();
        product.target_margin = Decimal::new(2, 2); // below min_margin
        assert!(matches!(
            product.validate(),
            Err(ProductError::MarginOutOfRange(_))
        ));
    }

    #[test]
    fn test_validate_rejects_floor_above_anchor() {
        let mut product = make_test_product();
        product.anchor_price = 9_100;
        product.target_margin = Decimal::new(5, 2);
        assert!(matches!(
            product.validate(),
            Err(ProductError::InconsistentPricing { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_id() {
        let mut product = make_test_product();
        product.id = "no spaces allowed".to_string();
        assert!(matches!(product.validate(), Err(ProductError::InvalidId(_))));
    }
}
