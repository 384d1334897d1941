//! Delivery distance and fee arithmetic

use serde::{Deserialize, Serialize};

use crate::types::{round2, GeoPoint};

/// Mean Earth radius used by the great-circle distance
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle (haversine) distance in kilometers
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let dlat = (to.lat - from.lat).to_radians();
    let dlng = (to.lng - from.lng).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Delivery pricing knobs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DeliveryPricing {
    pub base_fee: f64,
    pub per_km: f64,
    pub free_radius_km: f64,
}

impl DeliveryPricing {
    /// `base + max(0, distance - free_radius) * per_km`, rounded to cents
    pub fn fee_for_distance(&self, distance_km: f64) -> f64 {
        let extra = (distance_km - self.free_radius_km).max(0.0);
        round2(self.base_fee + extra * self.per_km)
    }

    /// `base + distance * per_km`, rounded to cents. Road quotes charge every
    /// kilometer; the free radius only applies to saved locations.
    pub fn road_fee(&self, distance_km: f64) -> f64 {
        round2(self.base_fee + distance_km * self.per_km)
    }
}

/// Distance and fee for a destination
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DeliveryQuote {
    pub distance_km: f64,
    pub delivery_fee: f64,
}

/// Quote a destination by straight-line distance from the warehouse
pub fn quote_from_warehouse(
    warehouse: GeoPoint,
    destination: GeoPoint,
    pricing: &DeliveryPricing,
) -> DeliveryQuote {
    let distance_km = haversine_km(warehouse, destination);
    DeliveryQuote {
        distance_km,
        delivery_fee: pricing.fee_for_distance(distance_km),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICING: DeliveryPricing = DeliveryPricing {
        base_fee: 50.0,
        per_km: 6.0,
        free_radius_km: 5.0,
    };

    #[test]
    fn test_fee_inside_and_at_free_radius_is_base() {
        assert_eq!(PRICING.fee_for_distance(0.0), 50.0);
        assert_eq!(PRICING.fee_for_distance(3.2), 50.0);
        assert_eq!(PRICING.fee_for_distance(5.0), 50.0);
    }

    #[test]
    fn test_road_fee_has_no_free_radius() {
        assert_eq!(PRICING.road_fee(0.0), 50.0);
        assert_eq!(PRICING.road_fee(5.0), 80.0);
        assert_eq!(PRICING.road_fee(12.5), 125.0);
    }

    #[test]
    fn test_fee_beyond_free_radius() {
        assert_eq!(PRICING.fee_for_distance(12.5), 95.0);
        // 50 + 0.333 * 6 = 51.998 -> 52.00
        assert_eq!(PRICING.fee_for_distance(5.333), 52.0);
    }

    #[test]
    fn test_haversine_zero_and_known_distance() {
        let port_of_spain = GeoPoint::new(10.6596, -61.5019);
        assert!(haversine_km(port_of_spain, port_of_spain).abs() < 1e-9);

        // One degree of latitude is ~111.19 km
        let north = GeoPoint::new(11.6596, -61.5019);
        let d = haversine_km(port_of_spain, north);
        assert!((d - 111.19).abs() < 0.05, "got {d}");
    }

    #[test]
    fn test_quote_from_warehouse() {
        let warehouse = GeoPoint::new(10.0, -61.0);
        let quote = quote_from_warehouse(warehouse, warehouse, &PRICING);
        assert_eq!(quote.distance_km, 0.0);
        assert_eq!(quote.delivery_fee, 50.0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn prop_fee_never_below_base(distance in 0.0f64..500.0) {
                prop_assert!(PRICING.fee_for_distance(distance) >= PRICING.base_fee);
            }

            #[test]
            fn prop_fee_is_non_decreasing(a in 0.0f64..500.0, b in 0.0f64..500.0) {
                let (near, far) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(PRICING.fee_for_distance(near) <= PRICING.fee_for_distance(far));
            }

            #[test]
            fn prop_fee_matches_formula_beyond_radius(extra in 0.0f64..200.0) {
                let fee = PRICING.fee_for_distance(PRICING.free_radius_km + extra);
                let expected = crate::types::round2(PRICING.base_fee + extra * PRICING.per_km);
                prop_assert!((fee - expected).abs() <= 0.011);
            }
        }
    }
}
