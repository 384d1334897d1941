//! Staff supplier and purchase invoice handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use shared::{PurchaseInvoice, Supplier};
use uuid::Uuid;

use crate::error::AppError;
use crate::external::openai::PurchaseDraft;
use crate::services::purchases::InvoiceInput;
use crate::services::PurchaseService;
use crate::AppState;

use super::{draft_or_empty, ApiJson, ApiQuery, DateQuery, FilesRequest, TextRequest};

#[derive(Deserialize)]
pub struct SupplierRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct SupplierResponse {
    pub ok: bool,
    pub supplier: Supplier,
}

#[derive(Serialize)]
pub struct SuppliersResponse {
    pub ok: bool,
    pub suppliers: Vec<Supplier>,
}

#[derive(Serialize)]
pub struct InvoiceResponse {
    pub ok: bool,
    pub invoice: PurchaseInvoice,
}

#[derive(Serialize)]
pub struct InvoicesResponse {
    pub ok: bool,
    pub invoices: Vec<PurchaseInvoice>,
}

#[derive(Serialize)]
pub struct DraftResponse {
    pub ok: bool,
    pub draft: PurchaseDraft,
}

pub async fn list_suppliers(
    State(state): State<AppState>,
) -> Result<Json<SuppliersResponse>, AppError> {
    let suppliers = PurchaseService::new(state.db.clone()).list_suppliers().await?;
    Ok(Json(SuppliersResponse { ok: true, suppliers }))
}

/// Find or create a supplier by name
pub async fn create_supplier(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<SupplierRequest>,
) -> Result<Json<SupplierResponse>, AppError> {
    let supplier = PurchaseService::new(state.db.clone())
        .create_supplier(&body.name)
        .await?;
    Ok(Json(SupplierResponse { ok: true, supplier }))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<InvoiceInput>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let invoice = PurchaseService::new(state.db.clone())
        .create_invoice(body)
        .await?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse { ok: true, invoice })))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = PurchaseService::new(state.db.clone()).get_invoice(id).await?;
    Ok(Json(InvoiceResponse { ok: true, invoice }))
}

/// Replace an invoice's header and lines
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    WithRejection(Json(body), _): ApiJson<InvoiceInput>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = PurchaseService::new(state.db.clone())
        .update_invoice(id, body)
        .await?;
    Ok(Json(InvoiceResponse { ok: true, invoice }))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<DateQuery>,
) -> Result<Json<InvoicesResponse>, AppError> {
    let invoices = PurchaseService::new(state.db.clone())
        .list_invoices(query.range())
        .await?;
    Ok(Json(InvoicesResponse { ok: true, invoices }))
}

/// Draft an invoice from pasted text
pub async fn draft_from_text(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<TextRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    let text = body.required_text()?;
    let draft = draft_or_empty(state.openai.propose_purchase(text).await)?;
    Ok(Json(DraftResponse { ok: true, draft }))
}

/// Draft an invoice from uploaded scans
pub async fn draft_from_files(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<FilesRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    let paths = body.resolve(&state).await?;
    let draft = draft_or_empty(state.openai.propose_invoice_from_files(&paths).await)?;
    Ok(Json(DraftResponse { ok: true, draft }))
}
