//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use shared::User;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthTokens, SignupInput};
use crate::services::{AuthService, DeliveryService};
use crate::AppState;

use super::ApiJson;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub ok: bool,
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub ok: bool,
    pub user: User,
}

/// Signup endpoint handler
pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<SignupInput>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let (user, tokens) = auth_service.signup(body).await?;

    // A failed fee computation must not undo the signup
    let delivery = DeliveryService::new(state.db.clone(), &state.config);
    let user = match delivery.ensure_delivery_computed(user.clone()).await {
        Ok(updated) => updated,
        Err(e) => {
            tracing::warn!("Delivery fee not computed at signup for {}: {}", user.id, e);
            user
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            ok: true,
            user,
            tokens,
        }),
    ))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let (user, tokens) = auth_service.login(&body.email, &body.password).await?;

    Ok(Json(SessionResponse {
        ok: true,
        user,
        tokens,
    }))
}

/// Profile with location and cached delivery fields
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = AuthService::new(state.db.clone(), &state.config)
        .get_user(auth.user_id)
        .await?;
    let user = DeliveryService::new(state.db.clone(), &state.config)
        .ensure_delivery_computed(user)
        .await?;
    Ok(Json(MeResponse { ok: true, user }))
}
