//! Validation and totals for staff-entered documents
//!
//! Purchase invoices and sales receipts share the same line rules:
//! `line_total = qty * unit_price` whenever a unit price is known, and a
//! document total is the sum of its line totals plus tax.

use rust_decimal::Decimal;

use crate::models::{MaterialKey, PurchaseLineInput, SalesLineInput, Unit};

/// A line that passed validation, with its unit normalized and total resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLine {
    pub description: String,
    pub material_key: Option<MaterialKey>,
    pub unit: Unit,
    pub qty: Decimal,
    pub unit_price: Option<Decimal>,
    pub line_total: Option<Decimal>,
}

/// Why a document line was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("line {0}: description is required")]
    MissingDescription(usize),
    #[error("line {0}: unknown unit '{1}'")]
    UnknownUnit(usize, String),
    #[error("line {0}: quantity must be positive")]
    NonPositiveQuantity(usize),
    #[error("line {0}: prices cannot be negative")]
    NegativePrice(usize),
    #[error("line {0}: unknown material key '{1}'")]
    UnknownMaterial(usize, String),
}

/// Resolve a line total from its parts.
///
/// A known unit price always wins, so a stale client-side total can never
/// break `line_total = qty * unit_price`.
pub fn resolve_line_total(
    qty: Decimal,
    unit_price: Option<Decimal>,
    line_total: Option<Decimal>,
) -> Option<Decimal> {
    match unit_price {
        Some(price) => Some(qty * price),
        None => line_total,
    }
}

/// Sum of line totals plus tax
pub fn document_total<'a, I>(line_totals: I, tax: Decimal) -> Decimal
where
    I: IntoIterator<Item = Option<&'a Decimal>>,
{
    line_totals.into_iter().flatten().sum::<Decimal>() + tax
}

fn validate_line(
    index: usize,
    description: &str,
    material_key: Option<&str>,
    unit: &str,
    qty: Decimal,
    unit_price: Option<Decimal>,
    line_total: Option<Decimal>,
) -> Result<ValidatedLine, LineError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(LineError::MissingDescription(index));
    }
    let unit =
        Unit::parse_staff(unit).ok_or_else(|| LineError::UnknownUnit(index, unit.to_string()))?;
    if qty <= Decimal::ZERO {
        return Err(LineError::NonPositiveQuantity(index));
    }
    if unit_price.is_some_and(|p| p < Decimal::ZERO) || line_total.is_some_and(|t| t < Decimal::ZERO)
    {
        return Err(LineError::NegativePrice(index));
    }
    let material_key = match material_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(raw) => Some(
            raw.parse::<MaterialKey>()
                .map_err(|_| LineError::UnknownMaterial(index, raw.to_string()))?,
        ),
        None => None,
    };

    Ok(ValidatedLine {
        description: description.to_string(),
        material_key,
        unit,
        qty,
        unit_price,
        line_total: resolve_line_total(qty, unit_price, line_total),
    })
}

/// Validate every purchase line, failing on the first bad one
pub fn validate_purchase_lines(lines: &[PurchaseLineInput]) -> Result<Vec<ValidatedLine>, LineError> {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            validate_line(
                i + 1,
                &l.description,
                l.material_key.as_deref(),
                &l.unit,
                l.qty,
                l.unit_price,
                l.line_total,
            )
        })
        .collect()
}

/// Validate every sales line, failing on the first bad one
pub fn validate_sales_lines(lines: &[SalesLineInput]) -> Result<Vec<ValidatedLine>, LineError> {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            validate_line(
                i + 1,
                &l.description,
                l.material_key.as_deref(),
                &l.unit,
                l.qty,
                l.unit_price,
                l.line_total,
            )
        })
        .collect()
}
