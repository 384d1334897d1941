//! Authentication middleware
//!
//! JWT bearer authentication and the staff-only guard

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::verify_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_staff: bool,
}

/// Validates the bearer token and stores the caller in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return AppError::InvalidToken.into_response();
    };

    let claims = match verify_token(bearer.token(), &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };
    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return AppError::InvalidToken.into_response();
    };

    request.extensions_mut().insert(AuthUser {
        user_id,
        is_staff: claims.is_staff,
    });
    next.run(request).await
}

/// Rejects callers without the staff flag. Must run after `auth_middleware`.
pub async fn staff_middleware(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_staff => next.run(request).await,
        Some(user) => {
            tracing::warn!("Staff route refused for {}", user.user_id);
            AppError::StaffOnly.into_response()
        }
        None => AppError::InvalidToken.into_response(),
    }
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::InvalidToken)
    }
}
