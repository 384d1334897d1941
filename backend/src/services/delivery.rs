//! Delivery distance and fee caching on accounts
//!
//! Saved locations are priced by straight-line distance from the warehouse
//! and cached on the account. Ad-hoc quotes use the road distance from the
//! maps service instead; the two are not reconciled.

use serde::{Deserialize, Serialize};
use shared::{quote_from_warehouse, round2, DeliveryPricing, DeliveryQuote, GeoPoint, User};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::MapsClient;
use crate::services::auth::{UserRow, USER_COLUMNS};

#[derive(Clone)]
pub struct DeliveryService {
    db: PgPool,
    warehouse: GeoPoint,
    pricing: DeliveryPricing,
}

/// A location picked on the signup or account map
#[derive(Debug, Clone, Deserialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub place_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    /// Great-circle distance from the warehouse
    Haversine,
    /// Road distance from the maps distance-matrix service
    DistanceMatrix,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoadQuote {
    pub distance_km: f64,
    /// Every road kilometer charged
    pub fee: f64,
    /// What the same distance costs under the saved-location formula
    pub fee_with_free_radius: f64,
    pub distance_source: DistanceSource,
}

impl RoadQuote {
    pub fn priced(km: f64, pricing: &DeliveryPricing) -> Self {
        Self {
            distance_km: round2(km),
            fee: pricing.road_fee(km),
            fee_with_free_radius: pricing.fee_for_distance(km),
            distance_source: DistanceSource::DistanceMatrix,
        }
    }
}

pub fn validate_coordinates(lat: f64, lng: f64) -> AppResult<GeoPoint> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::validation("lat", "Invalid lat/lng"));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::validation("lng", "Invalid lat/lng"));
    }
    Ok(GeoPoint::new(lat, lng))
}

impl DeliveryService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            warehouse: config.delivery.warehouse(),
            pricing: config.delivery.pricing(),
        }
    }

    fn quote(&self, destination: GeoPoint) -> DeliveryQuote {
        quote_from_warehouse(self.warehouse, destination, &self.pricing)
    }

    async fn store_quote(&self, user_id: Uuid, quote: DeliveryQuote) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET distance_km = $2, delivery_fee = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(quote.distance_km)
        .bind(quote.delivery_fee)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))?;
        Ok(row.into())
    }

    /// Fill in the cached distance and fee when the location is known but
    /// either value is missing. Otherwise the account is returned unchanged.
    pub async fn ensure_delivery_computed(&self, user: User) -> AppResult<User> {
        if !user.needs_delivery_quote() {
            return Ok(user);
        }
        let Some(location) = user.location() else {
            return Ok(user);
        };
        let quote = self.quote(location);
        tracing::debug!(
            "Cached delivery for {}: {:.2} km, fee {:.2}",
            user.id,
            quote.distance_km,
            quote.delivery_fee
        );
        self.store_quote(user.id, quote).await
    }

    /// Recompute from the saved location
    pub async fn recompute(&self, user: &User) -> AppResult<DeliveryQuote> {
        let location = user
            .location()
            .ok_or_else(|| AppError::ValidationError("No saved lat/lng".into()))?;
        let quote = self.quote(location);
        self.store_quote(user.id, quote).await?;
        Ok(quote)
    }

    /// Save a new delivery location and price it
    pub async fn update_location(
        &self,
        user_id: Uuid,
        update: LocationUpdate,
    ) -> AppResult<DeliveryQuote> {
        let location = validate_coordinates(update.lat, update.lng)?;
        let quote = self.quote(location);
        let formatted_address = update
            .formatted_address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        let place_id = update.place_id.filter(|p| !p.trim().is_empty());

        let result = sqlx::query(
            r#"
            UPDATE users
            SET place_id = $2, formatted_address = $3, lat = $4, lng = $5,
                distance_km = $6, delivery_fee = $7
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(place_id)
        .bind(formatted_address)
        .bind(location.lat)
        .bind(location.lng)
        .bind(quote.distance_km)
        .bind(quote.delivery_fee)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".into()));
        }
        Ok(quote)
    }

    /// Quote a destination by road distance
    pub async fn road_quote(&self, maps: &MapsClient, destination: GeoPoint) -> AppResult<RoadQuote> {
        let km = maps
            .road_distance_km(self.warehouse, destination)
            .await?;
        Ok(RoadQuote::priced(km, &self.pricing))
    }
}
