//! Staff expense handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use shared::Expense;

use crate::error::AppError;
use crate::external::openai::ExpenseDraft;
use crate::services::expenses::ExpenseInput;
use crate::services::ExpenseService;
use crate::AppState;

use super::{draft_or_empty, ApiJson, ApiQuery, DateQuery, FilesRequest, TextRequest};

/// A single expense, or `{"expenses": [...]}` for a batch
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ExpenseRequest {
    Batch { expenses: Vec<ExpenseInput> },
    Single(ExpenseInput),
}

#[derive(Serialize)]
pub struct ExpensesResponse {
    pub ok: bool,
    pub expenses: Vec<Expense>,
}

#[derive(Serialize)]
pub struct DraftResponse {
    pub ok: bool,
    pub draft: ExpenseDraft,
}

pub async fn create_expenses(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<ExpenseRequest>,
) -> Result<(StatusCode, Json<ExpensesResponse>), AppError> {
    let service = ExpenseService::new(state.db.clone());
    let expenses = match body {
        ExpenseRequest::Single(input) => vec![service.create_expense(input).await?],
        ExpenseRequest::Batch { expenses } => service.create_batch(expenses).await?,
    };
    Ok((StatusCode::CREATED, Json(ExpensesResponse { ok: true, expenses })))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<DateQuery>,
) -> Result<Json<ExpensesResponse>, AppError> {
    let expenses = ExpenseService::new(state.db.clone())
        .list_expenses(query.range())
        .await?;
    Ok(Json(ExpensesResponse { ok: true, expenses }))
}

pub async fn draft_from_text(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<TextRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    let text = body.required_text()?;
    let draft = draft_or_empty(state.openai.propose_expenses(text).await)?;
    Ok(Json(DraftResponse { ok: true, draft }))
}

pub async fn draft_from_files(
    State(state): State<AppState>,
    WithRejection(Json(body), _): ApiJson<FilesRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    let paths = body.resolve(&state).await?;
    let draft = draft_or_empty(state.openai.propose_expenses_from_files(&paths).await)?;
    Ok(Json(DraftResponse { ok: true, draft }))
}
