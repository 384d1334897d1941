//! HTTP request handlers for ConServ

use std::path::PathBuf;

use axum::extract::Query;
use axum::Json;
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use shared::DateRange;

use crate::error::{AppError, AppResult};
use crate::external::AiError;
use crate::AppState;

pub mod admin;
pub mod auth;
pub mod buildadvisor;
pub mod checkout;
pub mod delivery;
pub mod expenses;
pub mod health;
pub mod purchases;
pub mod reporting;
pub mod sales;
pub mod uploads;

pub use admin::{list_prices, reload_prices};
pub use auth::{login, me, signup};
pub use buildadvisor::{chat, extract_bom};
pub use checkout::{checkout, list_orders, payment_callback, payment_success};
pub use delivery::{delivery_quote, recompute, update_location, verify_address};
pub use expenses::{create_expenses, list_expenses};
pub use health::health_check;
pub use purchases::{
    create_invoice, create_supplier, get_invoice, list_invoices, list_suppliers, update_invoice,
};
pub use reporting::{customers_report, gross_profit_report, purchases_report, sales_report};
pub use sales::{create_receipt, get_receipt, list_receipts};
pub use uploads::upload_files;

/// JSON body whose parse failures render as a 400 `AppError`
pub type ApiJson<T> = WithRejection<Json<T>, AppError>;

/// Query string whose parse failures render as a 400 `AppError`
pub type ApiQuery<T> = WithRejection<Query<T>, AppError>;

/// Date filters arrive blank from HTML forms (`?start_date=`); blank means open.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Inclusive `start_date` / `end_date` filter
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub end_date: Option<NaiveDate>,
}

impl DateQuery {
    pub fn range(&self) -> DateRange {
        DateRange::from_bounds(self.start_date, self.end_date)
    }
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: String,
}

impl TextRequest {
    pub fn required_text(&self) -> AppResult<&str> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(AppError::validation("text", "Text is required"));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
pub struct FilesRequest {
    #[serde(default)]
    pub file_ids: Vec<String>,
}

impl FilesRequest {
    pub async fn resolve(&self, state: &AppState) -> AppResult<Vec<PathBuf>> {
        if self.file_ids.is_empty() {
            return Err(AppError::validation(
                "file_ids",
                "file_ids must be a non-empty list",
            ));
        }
        state.uploads.resolve(&self.file_ids).await
    }
}

/// Staff drafting helpers: a missing key is an error, anything else the
/// model gets wrong yields an empty draft.
pub fn draft_or_empty<T: Default>(result: Result<T, AiError>) -> AppResult<T> {
    match result {
        Ok(draft) => Ok(draft),
        Err(AiError::NotConfigured) => Err(AppError::AiNotConfigured),
        Err(e) => {
            tracing::warn!("Draft extraction failed: {}", e);
            Ok(T::default())
        }
    }
}
