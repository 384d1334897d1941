//! WebAssembly module for ConServ
//!
//! Provides client-side computation for:
//! - Delivery fee previews on the signup and account maps
//! - Cart totals before checkout
//! - Material labels and unit normalization for the estimator page

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::delivery::*;
pub use shared::models::*;
pub use shared::types::*;

/// Great-circle distance in kilometers between two coordinates
#[wasm_bindgen]
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    haversine_km(GeoPoint::new(lat1, lng1), GeoPoint::new(lat2, lng2))
}

/// Delivery fee for a distance, using the server's formula
#[wasm_bindgen]
pub fn delivery_fee(distance_km: f64, base_fee: f64, per_km: f64, free_radius_km: f64) -> f64 {
    DeliveryPricing {
        base_fee,
        per_km,
        free_radius_km,
    }
    .fee_for_distance(distance_km)
}

/// Fee preview for a point picked on the map
#[wasm_bindgen]
pub fn preview_delivery_fee(
    warehouse_lat: f64,
    warehouse_lng: f64,
    lat: f64,
    lng: f64,
    base_fee: f64,
    per_km: f64,
    free_radius_km: f64,
) -> f64 {
    let pricing = DeliveryPricing {
        base_fee,
        per_km,
        free_radius_km,
    };
    quote_from_warehouse(
        GeoPoint::new(warehouse_lat, warehouse_lng),
        GeoPoint::new(lat, lng),
        &pricing,
    )
    .delivery_fee
}

/// Total of the payable lines in a cart, plus a delivery fee when positive.
/// Unpayable lines are skipped exactly as checkout skips them.
#[wasm_bindgen]
pub fn cart_total(cart_json: &str, delivery_fee: f64) -> Result<f64, JsValue> {
    let cart: Vec<CartItem> = serde_json::from_str(cart_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid cart JSON: {}", e)))?;

    let mut total: Decimal = cart.iter().filter_map(CartItem::payable_amount).sum();
    if delivery_fee > 0.0 {
        total += Decimal::try_from(round2(delivery_fee)).unwrap_or(Decimal::ZERO);
    }
    Ok(total.round_dp(2).to_f64().unwrap_or(0.0))
}

/// Display label for a canonical material key, e.g. `sharp sand (m³)`
#[wasm_bindgen]
pub fn material_name(key: &str) -> Option<String> {
    match key.parse::<MaterialKey>() {
        Ok(key) => Some(key.pretty_name()),
        Err(e) => {
            web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
            None
        }
    }
}

/// Every canonical material key
#[wasm_bindgen]
pub fn material_keys() -> js_sys::Array {
    MaterialKey::ALL
        .iter()
        .map(|k| JsValue::from_str(k.as_str()))
        .collect()
}

/// Canonical staff unit for a free-form unit, or `None` when unknown
#[wasm_bindgen]
pub fn normalize_unit(raw: &str) -> Option<String> {
    Unit::parse_staff(raw).map(|u| u.as_str().to_string())
}


#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn material_keys_lists_every_key() {
        let keys = material_keys();
        assert_eq!(keys.length() as usize, MaterialKey::ALL.len());
        assert_eq!(keys.get(0).as_string().as_deref(), Some(MaterialKey::ALL[0].as_str()));
    }

    #[wasm_bindgen_test]
    fn unknown_material_has_no_name() {
        assert_eq!(material_name("unobtainium_kg"), None);
        assert!(material_name("sand_m3").is_some());
    }

    #[wasm_bindgen_test]
    fn bad_cart_json_is_a_js_error() {
        let err = cart_total("not json", 0.0).unwrap_err();
        assert!(err.as_string().unwrap_or_default().starts_with("Invalid cart JSON"));
    }
}
