//! BuildAdvisor estimate handlers

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::services::estimator::EstimateReply;
use crate::services::EstimatorService;
use crate::AppState;

use super::ApiJson;

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub spec: Value,
}

#[derive(Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub spec: Value,
}

fn spec_or_empty(spec: Value) -> Value {
    if spec.is_null() {
        Value::Object(Default::default())
    } else {
        spec
    }
}

fn estimator(state: &AppState) -> EstimatorService {
    EstimatorService::new(state.prices.clone(), state.openai.clone())
}

/// Estimate from a free-text project description
pub async fn chat(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<ChatRequest>,
) -> Result<Json<EstimateReply>, AppError> {
    let reply = estimator(&state)
        .chat(&body.message, spec_or_empty(body.spec))
        .await?;
    Ok(Json(reply))
}

/// Estimate from previously uploaded drawings or photos
pub async fn extract_bom(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<ExtractRequest>,
) -> Result<Json<EstimateReply>, AppError> {
    if body.file_ids.is_empty() {
        return Err(AppError::validation(
            "file_ids",
            "file_ids must be a non-empty list",
        ));
    }
    let service = estimator(&state);
    service.ready()?;
    let paths = state.uploads.resolve(&body.file_ids).await?;
    let reply = service.extract(&paths, spec_or_empty(body.spec)).await?;
    Ok(Json(reply))
}
