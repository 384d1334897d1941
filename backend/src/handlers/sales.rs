//! Staff sales receipt handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use shared::SalesReceipt;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::sales::ReceiptInput;
use crate::services::SalesService;
use crate::AppState;

use super::{ApiJson, ApiQuery, DateQuery};

#[derive(Serialize)]
pub struct ReceiptResponse {
    pub ok: bool,
    pub receipt: SalesReceipt,
}

#[derive(Serialize)]
pub struct ReceiptsResponse {
    pub ok: bool,
    pub receipts: Vec<SalesReceipt>,
}

pub async fn create_receipt(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<ReceiptInput>,
) -> Result<(StatusCode, Json<ReceiptResponse>), AppError> {
    let receipt = SalesService::new(state.db.clone()).create_receipt(body).await?;
    Ok((StatusCode::CREATED, Json(ReceiptResponse { ok: true, receipt })))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReceiptResponse>, AppError> {
    let receipt = SalesService::new(state.db.clone()).get_receipt(id).await?;
    Ok(Json(ReceiptResponse { ok: true, receipt }))
}

pub async fn list_receipts(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<DateQuery>,
) -> Result<Json<ReceiptsResponse>, AppError> {
    let receipts = SalesService::new(state.db.clone())
        .list_receipts(query.range())
        .await?;
    Ok(Json(ReceiptsResponse { ok: true, receipts }))
}
