//! Stock length detection for per-meter pricing

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const FEET_TO_METERS: f64 = 0.3048;

/// Rebar is sold in 19 ft sticks unless the listing says otherwise
pub const DEFAULT_REBAR_STICK_FT: f64 = 19.0;

/// Implicit `NxMxL` lengths outside this range (in feet) are not lengths
const IMPLICIT_FEET_RANGE: std::ops::RangeInclusive<f64> = 5.0..=40.0;

static METERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:M|METERS|METRES)\b").expect("valid meters regex")
});
static FEET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:FT|FEET|FOOT)\b").expect("valid feet regex")
});
static IMPLICIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"X\s*(\d+(?:\.\d+)?)\b").expect("valid dimension regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Ft,
    M,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    pub fn feet(value: f64) -> Self {
        Self {
            value,
            unit: LengthUnit::Ft,
        }
    }

    pub fn meters(value: f64) -> Self {
        Self {
            value,
            unit: LengthUnit::M,
        }
    }

    pub fn in_meters(&self) -> f64 {
        match self.unit {
            LengthUnit::M => self.value,
            LengthUnit::Ft => self.value * FEET_TO_METERS,
        }
    }

    /// Length from explicit `length_value` / `length_unit` columns. Units
    /// starting with `m` are meters, `f` feet.
    pub fn from_columns(value: Option<&str>, unit: Option<&str>) -> Option<Self> {
        let value: f64 = value?.trim().parse().ok()?;
        if value <= 0.0 {
            return None;
        }
        let unit = unit?.trim().to_ascii_lowercase();
        if unit.starts_with('m') {
            Some(Self::meters(value))
        } else if unit.starts_with('f') {
            Some(Self::feet(value))
        } else {
            None
        }
    }
}

/// Find a stock length in an item description.
///
/// Explicit meters win over explicit feet, which win over a trailing `xL`
/// dimension (`2x4x20` is 20 ft). The trailing dimension must be 5 to 40 and
/// must not be followed by `MM`, `CM` or `M`.
pub fn parse_length(text: &str) -> Option<Length> {
    let up = text.to_uppercase().replace('×', "X");

    if let Some(v) = first_positive(&METERS_RE, &up) {
        return Some(Length::meters(v));
    }
    if let Some(v) = first_positive(&FEET_RE, &up) {
        return Some(Length::feet(v));
    }

    let last = IMPLICIT_RE.captures_iter(&up).last()?;
    let whole = last.get(0)?;
    let rest = up[whole.end()..].trim_start();
    if rest.starts_with('M') || rest.starts_with("CM") {
        return None;
    }
    let value: f64 = last.get(1)?.as_str().parse().ok()?;
    IMPLICIT_FEET_RANGE
        .contains(&value)
        .then(|| Length::feet(value))
}

fn first_positive(re: &Regex, up: &str) -> Option<f64> {
    let caps = re.captures(up)?;
    caps.get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0)
}

/// Price of one meter of a stock length
pub fn per_meter(price: f64, length: Length) -> f64 {
    price / length.in_meters()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_meters() {
        assert_eq!(parse_length("Rebar 1/2 corr 6m"), Some(Length::meters(6.0)));
        assert_eq!(parse_length("PURLIN C 150MM X 6 METRES"), Some(Length::meters(6.0)));
        assert_eq!(parse_length("Mild steel 12 Meters"), Some(Length::meters(12.0)));
    }

    #[test]
    fn test_explicit_feet() {
        assert_eq!(parse_length("Z purlin 20ft"), Some(Length::feet(20.0)));
        assert_eq!(parse_length("Steel 30 FEET"), Some(Length::feet(30.0)));
    }

    #[test]
    fn test_meters_beat_feet() {
        assert_eq!(parse_length("6M (20 FT)"), Some(Length::meters(6.0)));
    }

    #[test]
    fn test_implicit_trailing_dimension() {
        assert_eq!(parse_length("Z Purlin 2x4x20"), Some(Length::feet(20.0)));
        assert_eq!(parse_length("Z Purlin 2×4×20 1.2"), Some(Length::feet(20.0)));
        assert_eq!(parse_length("c purlin 2X6X24"), Some(Length::feet(24.0)));
    }

    #[test]
    fn test_implicit_dimension_guards() {
        // millimeter section sizes are not lengths
        assert_eq!(parse_length("Plate 100x100mm"), None);
        assert_eq!(parse_length("Plywood 4x4"), None);
        assert_eq!(parse_length("Beam 2x4x50"), None);
        assert_eq!(parse_length("Rebar 1/2"), None);
    }

    #[test]
    fn test_per_meter() {
        let p = per_meter(380.0, Length::feet(20.0));
        assert!((p - 62.336).abs() < 0.001);
        assert!((per_meter(120.0, Length::meters(6.0)) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_columns() {
        assert_eq!(
            Length::from_columns(Some("6"), Some("m")),
            Some(Length::meters(6.0))
        );
        assert_eq!(
            Length::from_columns(Some("20"), Some("Feet")),
            Some(Length::feet(20.0))
        );
        assert_eq!(Length::from_columns(Some("20"), Some("in")), None);
        assert_eq!(Length::from_columns(Some("0"), Some("m")), None);
        assert_eq!(Length::from_columns(None, Some("m")), None);
    }
}
