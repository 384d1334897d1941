//! Volume normalization for purchase and sales reporting
//!
//! All volumes are reconciled to cubic yards. Bags only convert for loose
//! aggregates, where a bag is a known fraction of a yard; for anything else a
//! "bag" has no volume and the line is left out of volume totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Unit;

/// Cubic meters in one cubic yard
pub fn cubic_yard_in_m3() -> Decimal {
    Decimal::new(764_555, 6)
}

/// Loose aggregates that sell by volume or by the bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Sand,
    SharpSand,
    Gravel,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Sand => "sand",
            Aggregate::SharpSand => "sharp_sand",
            Aggregate::Gravel => "gravel",
        }
    }

    /// Exact lookup of a price table material key
    pub fn from_key(key: &str) -> Option<Aggregate> {
        match key.trim() {
            "sand_m3" => Some(Aggregate::Sand),
            "sharp_sand_m3" => Some(Aggregate::SharpSand),
            "gravel_m3" => Some(Aggregate::Gravel),
            _ => None,
        }
    }

    /// Recognize an aggregate from a free-text description.
    /// Sharp sand is checked before sand.
    pub fn recognize(description: &str) -> Option<Aggregate> {
        let text = description.to_lowercase().replace(['_', '-'], " ");
        if text.contains("sharp sand") {
            Some(Aggregate::SharpSand)
        } else if text.contains("sand") {
            Some(Aggregate::Sand)
        } else if text.contains("gravel") {
            Some(Aggregate::Gravel)
        } else {
            None
        }
    }
}

fn present_key(material_key: Option<&str>) -> Option<&str> {
    material_key.map(str::trim).filter(|k| !k.is_empty())
}

/// Aggregate family of a line. A material key is authoritative; the
/// description is only consulted when the line has no key.
pub fn line_aggregate(material_key: Option<&str>, description: &str) -> Option<Aggregate> {
    match present_key(material_key) {
        Some(key) => Aggregate::from_key(key),
        None => Aggregate::recognize(description),
    }
}

/// Report grouping label for a line: the aggregate family when recognized,
/// else the material key, else the lowercased description.
pub fn material_label(material_key: Option<&str>, description: &str) -> String {
    if let Some(agg) = line_aggregate(material_key, description) {
        return agg.as_str().to_string();
    }
    match present_key(material_key) {
        Some(k) => k.to_string(),
        None => description.trim().to_lowercase(),
    }
}

/// Convert a quantity to cubic yards.
///
/// Returns `None` for quantities with no volume: non-volume units, and bags of
/// anything that is not a recognized aggregate.
pub fn to_cubic_yards(
    qty: Decimal,
    unit: Unit,
    aggregate: Option<Aggregate>,
    bags_per_yd3: Decimal,
) -> Option<Decimal> {
    match unit {
        Unit::Yd3 => Some(qty),
        Unit::M3 => Some(qty / cubic_yard_in_m3()),
        Unit::Bag if bags_per_yd3 > Decimal::ZERO && aggregate.is_some() => {
            Some(qty / bags_per_yd3)
        }
        _ => None,
    }
}
