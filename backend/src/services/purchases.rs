//! Supplier and purchase invoice service

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::{
    document_total, validate_purchase_lines, DateRange, PurchaseInvoice, PurchaseLineInput,
    PurchaseLineItem, Supplier, Unit, ValidatedLine,
};

use crate::error::{AppError, AppResult};

pub const DEFAULT_CURRENCY: &str = "TTD";

#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// Invoice header and lines, used both to create and to replace an invoice
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceInput {
    pub supplier_name: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub tax: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<PurchaseLineInput>,
}

/// Header fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInvoice {
    pub supplier_name: String,
    pub invoice_number: Option<String>,
    pub invoice_date: NaiveDate,
    pub currency: String,
    pub tax: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub lines: Vec<ValidatedLine>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl InvoiceInput {
    /// Check the header, validate every line, and compute the total
    pub fn validate(self) -> AppResult<ValidatedInvoice> {
        let supplier_name = self.supplier_name.trim().to_string();
        if supplier_name.is_empty() {
            return Err(AppError::validation("supplier_name", "Supplier is required"));
        }
        if self.lines.is_empty() {
            return Err(AppError::validation("lines", "At least one line is required"));
        }
        let tax = self.tax.unwrap_or(Decimal::ZERO);
        if tax < Decimal::ZERO {
            return Err(AppError::validation("tax", "Tax cannot be negative"));
        }
        let currency = non_empty(self.currency)
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        if currency.len() != 3 {
            return Err(AppError::validation("currency", "Currency must be a 3-letter code"));
        }

        let lines = validate_purchase_lines(&self.lines)
            .map_err(|e| AppError::validation("lines", e.to_string()))?;
        let total = document_total(lines.iter().map(|l| l.line_total.as_ref()), tax);

        Ok(ValidatedInvoice {
            supplier_name,
            invoice_number: non_empty(self.invoice_number),
            invoice_date: self.invoice_date,
            currency,
            tax,
            total,
            notes: non_empty(self.notes),
            lines,
        })
    }
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    supplier_id: Uuid,
    supplier_name: String,
    invoice_number: Option<String>,
    invoice_date: NaiveDate,
    currency: String,
    tax: Decimal,
    total: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn with_lines(self, lines: Vec<PurchaseLineItem>) -> PurchaseInvoice {
        PurchaseInvoice {
            id: self.id,
            supplier_id: self.supplier_id,
            supplier_name: self.supplier_name,
            invoice_number: self.invoice_number,
            invoice_date: self.invoice_date,
            currency: self.currency,
            tax: self.tax,
            total: self.total,
            notes: self.notes,
            lines,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    id: Uuid,
    invoice_id: Uuid,
    description: String,
    material_key: Option<String>,
    unit: String,
    qty: Decimal,
    unit_price: Option<Decimal>,
    line_total: Option<Decimal>,
}

impl TryFrom<LineRow> for PurchaseLineItem {
    type Error = AppError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let unit = Unit::parse_staff(&row.unit)
            .ok_or_else(|| AppError::Internal(format!("stored unit '{}' is invalid", row.unit)))?;
        Ok(PurchaseLineItem {
            id: row.id,
            invoice_id: row.invoice_id,
            description: row.description,
            material_key: row.material_key,
            unit,
            qty: row.qty,
            unit_price: row.unit_price,
            line_total: row.line_total,
        })
    }
}

const INVOICE_SELECT: &str = r#"
    SELECT i.id, i.supplier_id, s.name AS supplier_name, i.invoice_number, i.invoice_date,
           i.currency, i.tax, i.total, i.notes, i.created_at
    FROM purchase_invoices i
    JOIN suppliers s ON s.id = i.supplier_id
"#;

impl PurchaseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All suppliers by name
    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, name, created_at FROM suppliers ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    /// Find a supplier by name, creating it when missing
    pub async fn create_supplier(&self, name: &str) -> AppResult<Supplier> {
        let mut tx = self.db.begin().await?;
        let supplier = find_or_create_supplier(&mut tx, name).await?;
        tx.commit().await?;
        Ok(supplier)
    }

    /// Record an invoice and its lines in one transaction
    pub async fn create_invoice(&self, input: InvoiceInput) -> AppResult<PurchaseInvoice> {
        let invoice = input.validate()?;

        let mut tx = self.db.begin().await?;
        let supplier = find_or_create_supplier(&mut tx, &invoice.supplier_name).await?;
        let invoice_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO purchase_invoices
                (supplier_id, invoice_number, invoice_date, currency, tax, total, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(supplier.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.invoice_date)
        .bind(&invoice.currency)
        .bind(invoice.tax)
        .bind(invoice.total)
        .bind(&invoice.notes)
        .fetch_one(&mut *tx)
        .await?;
        insert_lines(&mut tx, invoice_id, &invoice.lines).await?;
        tx.commit().await?;

        tracing::info!(
            "Recorded purchase invoice {} from {} ({} lines, total {})",
            invoice_id,
            supplier.name,
            invoice.lines.len(),
            invoice.total
        );
        self.get_invoice(invoice_id).await
    }

    /// Replace an invoice's header and lines in one transaction
    pub async fn update_invoice(&self, id: Uuid, input: InvoiceInput) -> AppResult<PurchaseInvoice> {
        let invoice = input.validate()?;

        let mut tx = self.db.begin().await?;
        let supplier = find_or_create_supplier(&mut tx, &invoice.supplier_name).await?;
        let updated = sqlx::query(
            r#"
            UPDATE purchase_invoices
            SET supplier_id = $2, invoice_number = $3, invoice_date = $4,
                currency = $5, tax = $6, total = $7, notes = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(supplier.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.invoice_date)
        .bind(&invoice.currency)
        .bind(invoice.tax)
        .bind(invoice.total)
        .bind(&invoice.notes)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase invoice".into()));
        }

        sqlx::query("DELETE FROM purchase_line_items WHERE invoice_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut tx, id, &invoice.lines).await?;
        tx.commit().await?;

        tracing::info!("Updated purchase invoice {}", id);
        self.get_invoice(id).await
    }

    pub async fn get_invoice(&self, id: Uuid) -> AppResult<PurchaseInvoice> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!("{} WHERE i.id = $1", INVOICE_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase invoice".into()))?;
        let mut lines = self.lines_for(&[id]).await?;
        Ok(row.with_lines(lines.remove(&id).unwrap_or_default()))
    }

    /// Invoices dated within the range, newest first
    pub async fn list_invoices(&self, range: DateRange) -> AppResult<Vec<PurchaseInvoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "{} WHERE i.invoice_date BETWEEN $1 AND $2 ORDER BY i.invoice_date DESC, i.created_at DESC",
            INVOICE_SELECT
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut lines = self.lines_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let invoice_lines = lines.remove(&row.id).unwrap_or_default();
                row.with_lines(invoice_lines)
            })
            .collect())
    }

    async fn lines_for(&self, invoice_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<PurchaseLineItem>>> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT id, invoice_id, description, material_key, unit, qty, unit_price, line_total
            FROM purchase_line_items
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, position
            "#,
        )
        .bind(invoice_ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<PurchaseLineItem>> = HashMap::new();
        for row in rows {
            let line = PurchaseLineItem::try_from(row)?;
            grouped.entry(line.invoice_id).or_default().push(line);
        }
        Ok(grouped)
    }
}

async fn find_or_create_supplier(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> AppResult<Supplier> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "Supplier name is required"));
    }
    // The no-op update makes RETURNING yield the existing row on conflict
    let row = sqlx::query_as::<_, SupplierRow>(
        r#"
        INSERT INTO suppliers (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name, created_at
        "#,
    )
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.into())
}

async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
    lines: &[ValidatedLine],
) -> AppResult<()> {
    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO purchase_line_items
                (invoice_id, position, description, material_key, unit, qty, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(invoice_id)
        .bind(position as i32)
        .bind(&line.description)
        .bind(line.material_key.map(|k| k.as_str()))
        .bind(line.unit.as_str())
        .bind(line.qty)
        .bind(line.unit_price)
        .bind(line.line_total)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
