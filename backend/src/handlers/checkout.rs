//! Checkout and payment gateway handlers

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use serde_json::Value;
use shared::{CartItem, Order};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::checkout::{acknowledge_callback, CheckoutResult};
use crate::services::{AuthService, CheckoutService, DeliveryService};
use crate::AppState;

use super::ApiJson;

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub result: CheckoutResult,
}

#[derive(Serialize)]
pub struct OrdersResponse {
    pub ok: bool,
    pub orders: Vec<Order>,
}

/// Turn the posted cart into orders and start a hosted payment
pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    WithRejection(Json(cart), _): ApiJson<Vec<CartItem>>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let user = AuthService::new(state.db.clone(), &state.config)
        .get_user(auth.user_id)
        .await?;
    let delivery = DeliveryService::new(state.db.clone(), &state.config);
    let user = match delivery.ensure_delivery_computed(user.clone()).await {
        Ok(updated) => updated,
        Err(e) => {
            tracing::warn!("Delivery fee not refreshed before checkout: {}", e);
            user
        }
    };

    let result = CheckoutService::new(state.db.clone(), &state.config.server.public_url)
        .checkout(&user, &cart, &state.wipay)
        .await?;
    Ok(Json(CheckoutResponse { ok: true, result }))
}

/// The caller's orders, newest first
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> Result<Json<OrdersResponse>, AppError> {
    let orders = CheckoutService::new(state.db.clone(), &state.config.server.public_url)
        .list_orders(auth.user_id)
        .await?;
    Ok(Json(OrdersResponse { ok: true, orders }))
}

/// Gateway server-to-server notification
pub async fn payment_callback(body: String) -> Result<Json<Value>, AppError> {
    acknowledge_callback(&body).map(Json)
}

/// Landing point after the hosted payment page
pub async fn payment_success() -> Json<Value> {
    Json(serde_json::json!({"ok": true, "message": "Payment successful!"}))
}
