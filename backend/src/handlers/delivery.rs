//! Delivery location, fee and address handlers

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::external::maps::GeocodedAddress;
use crate::middleware::CurrentUser;
use crate::services::delivery::{validate_coordinates, DistanceSource, LocationUpdate, RoadQuote};
use crate::services::{AuthService, DeliveryService};
use crate::AppState;

use super::ApiJson;

#[derive(Serialize)]
pub struct FeeResponse {
    pub ok: bool,
    pub distance_km: f64,
    pub delivery_fee: f64,
    pub distance_source: DistanceSource,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub quote: RoadQuote,
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
pub struct VerifyAddressRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct VerifyAddressResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub address: GeocodedAddress,
}

/// Recompute the cached fee from the saved location
pub async fn recompute(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> Result<Json<FeeResponse>, AppError> {
    let user = AuthService::new(state.db.clone(), &state.config)
        .get_user(auth.user_id)
        .await?;
    let quote = DeliveryService::new(state.db.clone(), &state.config)
        .recompute(&user)
        .await?;
    Ok(Json(FeeResponse {
        ok: true,
        distance_km: quote.distance_km,
        delivery_fee: quote.delivery_fee,
        distance_source: DistanceSource::Haversine,
    }))
}

/// Save a new delivery location and price it
pub async fn update_location(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    WithRejection(Json(body), _): ApiJson<LocationUpdate>,
) -> Result<Json<FeeResponse>, AppError> {
    let quote = DeliveryService::new(state.db.clone(), &state.config)
        .update_location(auth.user_id, body)
        .await?;
    Ok(Json(FeeResponse {
        ok: true,
        distance_km: quote.distance_km,
        delivery_fee: quote.delivery_fee,
        distance_source: DistanceSource::Haversine,
    }))
}

/// Quote an arbitrary destination by road distance
pub async fn delivery_quote(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let destination = validate_coordinates(body.lat, body.lng)?;
    let quote = DeliveryService::new(state.db.clone(), &state.config)
        .road_quote(&state.maps, destination)
        .await?;
    Ok(Json(QuoteResponse { ok: true, quote }))
}

/// Geocode a typed address so the client can confirm it on a map
pub async fn verify_address(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<VerifyAddressRequest>,
) -> Result<Json<VerifyAddressResponse>, AppError> {
    let address = body.address.trim();
    if address.is_empty() {
        return Err(AppError::validation("address", "Invalid address. Please try again."));
    }
    tracing::info!("Verifying address: {}", address);
    let address = state.maps.geocode(address).await?;
    Ok(Json(VerifyAddressResponse { ok: true, address }))
}
