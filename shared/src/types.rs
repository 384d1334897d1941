//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// WGS84 coordinate in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Inclusive date range for reports and listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range from optional bounds. Open ends widen to 1900-01-01 and
    /// 2100-12-31, which stay inside the database's date range.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            start: start
                .or_else(|| NaiveDate::from_ymd_opt(1900, 1, 1))
                .unwrap_or(NaiveDate::MIN),
            end: end
                .or_else(|| NaiveDate::from_ymd_opt(2100, 12, 31))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Round to 2 decimal places, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
