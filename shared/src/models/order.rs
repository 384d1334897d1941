//! Cart checkout models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product name used for the delivery charge order line
pub const DELIVERY_PRODUCT_NAME: &str = "Delivery";

/// A priced cart line persisted at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_name: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A cart line as posted by the storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "productName", default)]
    pub product_name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub quantity: i64,
}

impl CartItem {
    /// Line amount, or `None` when the line is not payable
    pub fn payable_amount(&self) -> Option<Decimal> {
        if self.product_name.trim().is_empty()
            || self.price <= Decimal::ZERO
            || self.quantity <= 0
        {
            return None;
        }
        Some(self.price * Decimal::from(self.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(name: &str, price: &str, quantity: i64) -> CartItem {
        CartItem {
            product_name: name.to_string(),
            price: Decimal::from_str(price).unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_payable_amount() {
        assert_eq!(
            item("Cement", "85.50", 4).payable_amount(),
            Some(Decimal::from_str("342.00").unwrap())
        );
        assert_eq!(item("  ", "85.50", 4).payable_amount(), None);
        assert_eq!(item("Cement", "0", 4).payable_amount(), None);
        assert_eq!(item("Cement", "85.50", 0).payable_amount(), None);
    }
}
