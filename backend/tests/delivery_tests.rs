//! Delivery fee and checkout line tests
//!
//! Covers the distance-based fee shared by the backend and the storefront,
//! and how a cart plus delivery fee becomes payable order lines.

use std::str::FromStr;

use conserv_backend::services::checkout::order_lines;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    haversine_km, quote_from_warehouse, CartItem, DeliveryPricing, GeoPoint, DELIVERY_PRODUCT_NAME,
};

const PRICING: DeliveryPricing = DeliveryPricing {
    base_fee: 50.0,
    per_km: 5.0,
    free_radius_km: 3.0,
};

/// Port of Spain warehouse
fn warehouse() -> GeoPoint {
    GeoPoint::new(10.6549, -61.5019)
}

fn item(name: &str, price: &str, quantity: i64) -> CartItem {
    CartItem {
        product_name: name.to_string(),
        price: Decimal::from_str(price).unwrap(),
        quantity,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_quote_at_warehouse_is_base_fee() {
        let quote = quote_from_warehouse(warehouse(), warehouse(), &PRICING);
        assert_eq!(quote.distance_km, 0.0);
        assert_eq!(quote.delivery_fee, 50.0);
    }

    #[test]
    fn test_quote_to_san_fernando() {
        let san_fernando = GeoPoint::new(10.2797, -61.4689);
        let quote = quote_from_warehouse(warehouse(), san_fernando, &PRICING);
        assert!(quote.distance_km > 40.0 && quote.distance_km < 45.0);
        assert_eq!(quote.delivery_fee, PRICING.fee_for_distance(quote.distance_km));
        assert!(quote.delivery_fee > 230.0);
    }

    #[test]
    fn test_order_lines_append_delivery() {
        let cart = [item("Sand (1 yd3)", "350", 2), item("Cement", "85.50", 4)];
        let lines = order_lines(&cart, Some(65.004));

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].amount, Decimal::from(700));
        assert_eq!(lines[1].amount, Decimal::from_str("342").unwrap());
        assert_eq!(lines[2].product_name, DELIVERY_PRODUCT_NAME);
        assert_eq!(lines[2].amount, Decimal::from_str("65.00").unwrap());
    }

    #[test]
    fn test_zero_fee_adds_no_delivery_line() {
        let lines = order_lines(&[item("Mesh", "450", 1)], Some(0.0));
        assert!(lines.iter().all(|l| l.product_name != DELIVERY_PRODUCT_NAME));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn trinidad_point() -> impl Strategy<Value = GeoPoint> {
    (10.0f64..11.0, -61.95f64..-60.9).prop_map(|(lat, lng)| GeoPoint::new(lat, lng))
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        /// Fee never drops below the base fee
        #[test]
        fn prop_fee_at_least_base(distance in 0.0f64..500.0) {
            prop_assert!(PRICING.fee_for_distance(distance) >= PRICING.base_fee);
        }

        /// Fee never decreases with distance
        #[test]
        fn prop_fee_is_monotonic(a in 0.0f64..300.0, b in 0.0f64..300.0) {
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(PRICING.fee_for_distance(near) <= PRICING.fee_for_distance(far));
        }

        /// Fee is already rounded to cents
        #[test]
        fn prop_fee_has_two_decimals(distance in 0.0f64..300.0) {
            let fee = PRICING.fee_for_distance(distance);
            prop_assert!(((fee * 100.0).round() - fee * 100.0).abs() < 1e-6);
        }

        /// Great-circle distance is symmetric
        #[test]
        fn prop_haversine_symmetric(a in trinidad_point(), b in trinidad_point()) {
            prop_assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
        }

        /// Order lines sum to the cart amount plus the fee
        #[test]
        fn prop_order_lines_sum(
            prices in prop::collection::vec((1i64..100_000, 1i64..20), 1..10),
            fee_cents in 1i64..100_000,
        ) {
            let cart: Vec<CartItem> = prices
                .iter()
                .map(|(cents, qty)| CartItem {
                    product_name: "Item".into(),
                    price: Decimal::new(*cents, 2),
                    quantity: *qty,
                })
                .collect();
            let fee = fee_cents as f64 / 100.0;
            let lines = order_lines(&cart, Some(fee));

            let expected = cart.iter().filter_map(CartItem::payable_amount).sum::<Decimal>()
                + Decimal::new(fee_cents, 2);
            let actual: Decimal = lines.iter().map(|l| l.amount).sum();
            prop_assert_eq!(actual, expected);
        }
    }
}
