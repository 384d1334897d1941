//! BuildAdvisor bill of materials and priced estimate

use serde::{Deserialize, Serialize};

use super::{MaterialKey, Unit};

/// Appended to the name of a line with no known price
pub const UNPRICED_SUFFIX: &str = " — UNPRICED";

/// One bill-of-materials entry proposed for a project
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub key: MaterialKey,
    pub qty: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateLine {
    pub key: MaterialKey,
    pub name: String,
    pub qty: f64,
    pub unit: Unit,
    pub unit_price: f64,
    pub total: f64,
}

impl EstimateLine {
    pub fn is_priced(&self) -> bool {
        !self.name.ends_with(UNPRICED_SUFFIX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub lines: Vec<EstimateLine>,
    pub total: f64,
}
