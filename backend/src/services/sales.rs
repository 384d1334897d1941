//! Sales receipt service

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{
    document_total, validate_sales_lines, DateRange, SalesLineInput, SalesReceipt,
    SalesReceiptLine, Unit, ValidatedLine,
};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct SalesService {
    db: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptInput {
    pub customer_name: String,
    #[serde(default)]
    pub receipt_number: Option<String>,
    pub receipt_date: NaiveDate,
    #[serde(default)]
    pub tax: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<SalesLineInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReceipt {
    pub customer_name: String,
    pub receipt_number: Option<String>,
    pub receipt_date: NaiveDate,
    pub tax: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub lines: Vec<ValidatedLine>,
}

impl ReceiptInput {
    pub fn validate(self) -> AppResult<ValidatedReceipt> {
        let customer_name = self.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(AppError::validation("customer_name", "Customer is required"));
        }
        if self.lines.is_empty() {
            return Err(AppError::validation("lines", "At least one line is required"));
        }
        let tax = self.tax.unwrap_or(Decimal::ZERO);
        if tax < Decimal::ZERO {
            return Err(AppError::validation("tax", "Tax cannot be negative"));
        }
        let lines = validate_sales_lines(&self.lines)
            .map_err(|e| AppError::validation("lines", e.to_string()))?;
        let total = document_total(lines.iter().map(|l| l.line_total.as_ref()), tax);

        Ok(ValidatedReceipt {
            customer_name,
            receipt_number: self
                .receipt_number
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            receipt_date: self.receipt_date,
            tax,
            total,
            notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            lines,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: Uuid,
    customer_name: String,
    receipt_number: Option<String>,
    receipt_date: NaiveDate,
    tax: Decimal,
    total: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ReceiptLineRow {
    id: Uuid,
    receipt_id: Uuid,
    description: String,
    material_key: Option<String>,
    unit: String,
    qty: Decimal,
    unit_price: Option<Decimal>,
    line_total: Option<Decimal>,
}

impl TryFrom<ReceiptLineRow> for SalesReceiptLine {
    type Error = AppError;

    fn try_from(row: ReceiptLineRow) -> Result<Self, Self::Error> {
        let unit = Unit::parse_staff(&row.unit)
            .ok_or_else(|| AppError::Internal(format!("stored unit '{}' is invalid", row.unit)))?;
        Ok(SalesReceiptLine {
            id: row.id,
            receipt_id: row.receipt_id,
            description: row.description,
            material_key: row.material_key,
            unit,
            qty: row.qty,
            unit_price: row.unit_price,
            line_total: row.line_total,
        })
    }
}

fn assemble(row: ReceiptRow, lines: Vec<SalesReceiptLine>) -> SalesReceipt {
    SalesReceipt {
        id: row.id,
        customer_name: row.customer_name,
        receipt_number: row.receipt_number,
        receipt_date: row.receipt_date,
        tax: row.tax,
        total: row.total,
        notes: row.notes,
        lines,
        created_at: row.created_at,
    }
}

impl SalesService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a receipt and its lines in one transaction
    pub async fn create_receipt(&self, input: ReceiptInput) -> AppResult<SalesReceipt> {
        let receipt = input.validate()?;

        let mut tx = self.db.begin().await?;
        let receipt_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO sales_receipts (customer_name, receipt_number, receipt_date, tax, total, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&receipt.customer_name)
        .bind(&receipt.receipt_number)
        .bind(receipt.receipt_date)
        .bind(receipt.tax)
        .bind(receipt.total)
        .bind(&receipt.notes)
        .fetch_one(&mut *tx)
        .await?;

        for (position, line) in receipt.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sales_receipt_lines
                    (receipt_id, position, description, material_key, unit, qty, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(receipt_id)
            .bind(position as i32)
            .bind(&line.description)
            .bind(line.material_key.map(|k| k.as_str()))
            .bind(line.unit.as_str())
            .bind(line.qty)
            .bind(line.unit_price)
            .bind(line.line_total)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Recorded sales receipt {} for {} (total {})",
            receipt_id,
            receipt.customer_name,
            receipt.total
        );
        self.get_receipt(receipt_id).await
    }

    pub async fn get_receipt(&self, id: Uuid) -> AppResult<SalesReceipt> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT id, customer_name, receipt_number, receipt_date, tax, total, notes, created_at
            FROM sales_receipts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales receipt".into()))?;
        let mut lines = self.lines_for(&[id]).await?;
        Ok(assemble(row, lines.remove(&id).unwrap_or_default()))
    }

    /// Receipts dated within the range, newest first
    pub async fn list_receipts(&self, range: DateRange) -> AppResult<Vec<SalesReceipt>> {
        let rows = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT id, customer_name, receipt_number, receipt_date, tax, total, notes, created_at
            FROM sales_receipts
            WHERE receipt_date BETWEEN $1 AND $2
            ORDER BY receipt_date DESC, created_at DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut lines = self.lines_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let receipt_lines = lines.remove(&row.id).unwrap_or_default();
                assemble(row, receipt_lines)
            })
            .collect())
    }

    async fn lines_for(&self, receipt_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<SalesReceiptLine>>> {
        let rows = sqlx::query_as::<_, ReceiptLineRow>(
            r#"
            SELECT id, receipt_id, description, material_key, unit, qty, unit_price, line_total
            FROM sales_receipt_lines
            WHERE receipt_id = ANY($1)
            ORDER BY receipt_id, position
            "#,
        )
        .bind(receipt_ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<SalesReceiptLine>> = HashMap::new();
        for row in rows {
            let line = SalesReceiptLine::try_from(row)?;
            grouped.entry(line.receipt_id).or_default().push(line);
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_receipt_total_includes_tax() {
        let input = ReceiptInput {
            customer_name: "R. Ramdial Construction".into(),
            receipt_number: None,
            receipt_date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            tax: Some(dec("12.50")),
            notes: None,
            lines: vec![SalesLineInput {
                description: "Gravel".into(),
                material_key: Some("gravel_m3".into()),
                unit: "yd".into(),
                qty: dec("2"),
                unit_price: Some(dec("450")),
                line_total: None,
            }],
        };
        let receipt = input.validate().unwrap();
        assert_eq!(receipt.lines[0].unit, Unit::Yd3);
        assert_eq!(receipt.total, dec("912.50"));
    }

    #[test]
    fn test_receipt_requires_customer() {
        let input = ReceiptInput {
            customer_name: "".into(),
            receipt_number: None,
            receipt_date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            tax: None,
            notes: None,
            lines: vec![],
        };
        assert!(matches!(
            input.validate(),
            Err(AppError::Validation { field, .. }) if field == "customer_name"
        ));
    }
}
