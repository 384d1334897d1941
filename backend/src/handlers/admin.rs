//! Staff price table administration

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppError;
use crate::pricing::PriceMap;
use crate::AppState;

#[derive(Serialize)]
pub struct ReloadResponse {
    pub ok: bool,
    pub price_keys: usize,
}

#[derive(Serialize)]
pub struct PricesResponse {
    pub ok: bool,
    pub prices: PriceMap,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
    pub prices_error: Option<String>,
}

/// Rebuild the price table from the CSV files
pub async fn reload_prices(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let store = state.prices.clone();
    let config = state.config.pricing.clone();
    let result = tokio::task::spawn_blocking(move || store.reload(&config))
        .await
        .map_err(|e| AppError::Internal(format!("price reload task failed: {}", e)))?;

    let price_keys = result.map_err(AppError::PricesUnavailable)?;
    tracing::info!("Price table reloaded with {} keys", price_keys);
    Ok(Json(ReloadResponse {
        ok: true,
        price_keys,
    }))
}

/// Current canonical prices
pub async fn list_prices(State(state): State<AppState>) -> Json<PricesResponse> {
    let (table, prices_error) = state.prices.snapshot();
    Json(PricesResponse {
        ok: true,
        prices: table.prices().clone(),
        loaded_at: table.loaded_at(),
        prices_error,
    })
}
