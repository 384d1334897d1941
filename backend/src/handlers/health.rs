//! Health check handlers

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub database: String,
    pub has_openai: bool,
    pub data_files: BTreeMap<&'static str, String>,
    pub exists: BTreeMap<&'static str, bool>,
    pub price_keys: usize,
    pub prices_error: Option<String>,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Check database connectivity
    let db_status = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected".to_string(),
        Err(_) => "disconnected".to_string(),
    };

    let pricing = &state.config.pricing;
    let paths = [
        ("aggregates", pricing.aggregates_path()),
        ("building", pricing.building_path()),
        ("lumber", pricing.lumber_path()),
        ("steel", pricing.steel_path()),
    ];
    let data_files = paths
        .iter()
        .map(|(name, path)| (*name, path.display().to_string()))
        .collect();
    let exists = paths
        .iter()
        .map(|(name, path)| (*name, path.exists()))
        .collect();
    let (table, prices_error) = state.prices.snapshot();

    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        has_openai: state.openai.is_configured(),
        data_files,
        exists,
        price_keys: table.len(),
        prices_error,
    })
}
