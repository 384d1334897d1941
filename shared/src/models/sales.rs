//! Sales receipts

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Unit;

/// A customer sales receipt with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReceipt {
    pub id: Uuid,
    pub customer_name: String,
    pub receipt_number: Option<String>,
    pub receipt_date: NaiveDate,
    pub tax: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub lines: Vec<SalesReceiptLine>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReceiptLine {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub description: String,
    pub material_key: Option<String>,
    pub unit: Unit,
    pub qty: Decimal,
    pub unit_price: Option<Decimal>,
    pub line_total: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesLineInput {
    pub description: String,
    #[serde(default)]
    pub material_key: Option<String>,
    pub unit: String,
    pub qty: Decimal,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub line_total: Option<Decimal>,
}
