//! Operating expense service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{DateRange, Expense, ExpenseCategory};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ExpenseService {
    db: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub expense_date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
}

impl ExpenseInput {
    fn validate(&self, index: usize) -> AppResult<(ExpenseCategory, Decimal)> {
        if self.category.trim().is_empty() {
            return Err(AppError::validation(
                "category",
                format!("expense {}: category is required", index),
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(AppError::validation(
                "amount",
                format!("expense {}: amount must be positive", index),
            ));
        }
        Ok((ExpenseCategory::parse_lenient(&self.category), self.amount.round_dp(2)))
    }
}

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: Uuid,
    expense_date: NaiveDate,
    category: String,
    description: String,
    amount: Decimal,
    created_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            expense_date: row.expense_date,
            category: ExpenseCategory::parse_lenient(&row.category),
            description: row.description,
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}

impl ExpenseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_expense(&self, input: ExpenseInput) -> AppResult<Expense> {
        let mut created = self.create_batch(vec![input]).await?;
        created
            .pop()
            .ok_or_else(|| AppError::Internal("expense insert returned nothing".into()))
    }

    /// Insert several expenses atomically; one bad entry rejects them all
    pub async fn create_batch(&self, inputs: Vec<ExpenseInput>) -> AppResult<Vec<Expense>> {
        if inputs.is_empty() {
            return Err(AppError::validation("expenses", "No expenses provided"));
        }
        let validated = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| input.validate(i + 1))
            .collect::<AppResult<Vec<_>>>()?;

        let mut tx = self.db.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());
        for (input, (category, amount)) in inputs.iter().zip(validated) {
            let row = sqlx::query_as::<_, ExpenseRow>(
                r#"
                INSERT INTO expenses (expense_date, category, description, amount)
                VALUES ($1, $2, $3, $4)
                RETURNING id, expense_date, category, description, amount, created_at
                "#,
            )
            .bind(input.expense_date)
            .bind(category.as_str())
            .bind(input.description.trim())
            .bind(amount)
            .fetch_one(&mut *tx)
            .await?;
            created.push(Expense::from(row));
        }
        tx.commit().await?;

        tracing::info!("Recorded {} expenses", created.len());
        Ok(created)
    }

    /// Expenses dated within the range, newest first
    pub async fn list_expenses(&self, range: DateRange) -> AppResult<Vec<Expense>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT id, expense_date, category, description, amount, created_at
            FROM expenses
            WHERE expense_date BETWEEN $1 AND $2
            ORDER BY expense_date DESC, created_at DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Expense::from).collect())
    }

    /// Sum of expenses in the range
    pub async fn total_in_range(&self, range: DateRange) -> AppResult<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM expenses WHERE expense_date BETWEEN $1 AND $2",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn input(category: &str, amount: &str) -> ExpenseInput {
        ExpenseInput {
            expense_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            category: category.into(),
            description: "Truck diesel".into(),
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn test_validate_expense() {
        let (category, amount) = input("Diesel", "300.456").validate(1).unwrap();
        assert_eq!(category, ExpenseCategory::Fuel);
        assert_eq!(amount, Decimal::from_str("300.46").unwrap());

        let (category, _) = input("stationery", "10").validate(1).unwrap();
        assert_eq!(category, ExpenseCategory::Other);
    }

    #[test]
    fn test_validate_rejects_non_positive_amounts() {
        assert!(input("fuel", "0").validate(1).is_err());
        assert!(input("fuel", "-5").validate(1).is_err());
        assert!(input(" ", "5").validate(1).is_err());
    }
}
