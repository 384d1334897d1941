//! Supplier purchase invoices

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Unit;

/// A supplier of materials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A supplier invoice with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseInvoice {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub invoice_number: Option<String>,
    pub invoice_date: NaiveDate,
    pub currency: String,
    pub tax: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub lines: Vec<PurchaseLineItem>,
    pub created_at: DateTime<Utc>,
}

/// One line of a purchase invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLineItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub material_key: Option<String>,
    pub unit: Unit,
    pub qty: Decimal,
    pub unit_price: Option<Decimal>,
    pub line_total: Option<Decimal>,
}

/// Line input for creating or replacing invoice lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLineInput {
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
