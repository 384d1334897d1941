//! Customer and staff accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::GeoPoint;

/// A customer or staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub address: String,
    pub age: i32,
    pub place_id: Option<String>,
    pub formatted_address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Cached great-circle distance from the warehouse
    pub distance_km: Option<f64>,
    /// Cached delivery fee for `distance_km`
    pub delivery_fee: Option<f64>,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Saved delivery location, if both coordinates are known
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    /// Whether the cached distance or fee needs computing
    pub fn needs_delivery_quote(&self) -> bool {
        self.location().is_some() && (self.distance_km.is_none() || self.delivery_fee.is_none())
    }
}
