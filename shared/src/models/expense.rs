//! Operating expenses

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An operating cost entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub expense_date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Salaries,
    Fuel,
    Maintenance,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Salaries => "salaries",
            ExpenseCategory::Fuel => "fuel",
            ExpenseCategory::Maintenance => "maintenance",
            ExpenseCategory::Other => "other",
        }
    }

    /// Parse a category, mapping anything unrecognised to `Other`
    pub fn parse_lenient(raw: &str) -> ExpenseCategory {
        match raw.trim().to_lowercase().as_str() {
            "salaries" | "salary" | "wages" => ExpenseCategory::Salaries,
            "fuel" | "diesel" | "gas" => ExpenseCategory::Fuel,
            "maintenance" | "repairs" | "repair" => ExpenseCategory::Maintenance,
            _ => ExpenseCategory::Other,
        }
    }
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
