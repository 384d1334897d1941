//! Steel price list: purlins and rebar

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use shared::{MaterialKey, RebarDiameter, RebarGrade};

use super::length::{parse_length, per_meter, Length, DEFAULT_REBAR_STICK_FT};
use super::numeric::parse_price;
use super::rows::CsvRow;
use super::PriceMap;

static DIAMETER_PATTERNS: Lazy<Vec<(RebarDiameter, Regex)>> = Lazy::new(|| {
    [
        (RebarDiameter::ThreeEighths, "3/8", "10"),
        (RebarDiameter::Half, "1/2", "12"),
        (RebarDiameter::FiveEighths, "5/8", "16"),
        (RebarDiameter::ThreeQuarters, "3/4", "20"),
    ]
    .into_iter()
    .map(|(d, fraction, metric)| {
        let pattern = format!(
            r"(?:^|[^0-9/]){}(?:[^0-9/]|$)|(?:^|[^0-9]){}\s*MM",
            regex::escape(fraction),
            metric
        );
        (d, Regex::new(&pattern).expect("valid diameter regex"))
    })
    .collect()
});
static SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*/\s*").expect("valid slash regex"));
static CORRUGATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CORR|DEFORM|RIB|TENS").expect("valid grade regex"));
static MILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"MILD|SMOOTH|\bMS\b").expect("valid grade regex"));

/// Purlin cross-section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PurlinProfile {
    Z,
    C,
}

impl PurlinProfile {
    /// Detect a `Z` or `C` section in an uppercased description
    pub fn detect(up: &str) -> Option<Self> {
        let padded = format!(" {} ", up);
        if padded.contains(" Z ") || up.contains("Z PURLIN") || up.contains("PURLIN Z") {
            Some(PurlinProfile::Z)
        } else if padded.contains(" C ") || up.contains("C PURLIN") || up.contains("PURLIN C") {
            Some(PurlinProfile::C)
        } else {
            None
        }
    }

    pub fn key(&self) -> MaterialKey {
        match self {
            PurlinProfile::Z => MaterialKey::PurlinZM,
            PurlinProfile::C => MaterialKey::PurlinCM,
        }
    }
}

/// Nominal diameter from a description, tolerant of `1 / 2` spacing
pub fn diameter_from_text(text: &str) -> Option<RebarDiameter> {
    let up = text.to_uppercase();
    let compact = SLASH_RE.replace_all(&up, "/");
    DIAMETER_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&compact))
        .map(|(d, _)| *d)
}

/// Bar grade; anything unmarked is sold as corrugated
pub fn grade_from_text(text: &str) -> RebarGrade {
    let up = text.to_uppercase();
    if CORRUGATED_RE.is_match(&up) {
        RebarGrade::Corrugated
    } else if MILD_RE.is_match(&up) {
        RebarGrade::Mild
    } else {
        RebarGrade::Corrugated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SteelKind {
    Purlin,
    Rebar,
}

/// One parsed line of the steel list, kept for the loader report
#[derive(Debug, Clone, Serialize)]
pub struct SteelRow {
    pub name: String,
    pub kind: SteelKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<PurlinProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<RebarDiameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<RebarGrade>,
    pub length: Option<Length>,
    pub unit_price: f64,
    pub price_per_m: f64,
    pub key: Option<MaterialKey>,
}

#[derive(Debug, Clone, Default)]
pub struct SteelPrices {
    pub prices: PriceMap,
    pub rows: Vec<SteelRow>,
}

fn row_length(row: &CsvRow, name: &str) -> Option<Length> {
    Length::from_columns(row.get("lengthvalue"), row.get("lengthunit"))
        .or_else(|| parse_length(name))
}

fn is_priced_per_kg(up: &str) -> bool {
    up.contains(" KG") || up.contains("PER KG") || up.contains("/KG")
}

/// Classify one steel row. Purlins are checked before rebar.
pub fn parse_steel_row(row: &CsvRow) -> Option<SteelRow> {
    let name = row.name()?.to_string();
    let unit_price = parse_price(row.price_text()?)?;
    let up = name.to_uppercase();
    let length = row_length(row, &name);

    if up.contains("PURLIN") {
        let profile = PurlinProfile::detect(&up);
        let price_per_m = length.map_or(unit_price, |l| per_meter(unit_price, l));
        return Some(SteelRow {
            key: profile.map(|p| p.key()),
            name,
            kind: SteelKind::Purlin,
            profile,
            size: None,
            grade: None,
            length,
            unit_price,
            price_per_m,
        });
    }

    let size = row
        .get("sizein")
        .and_then(diameter_from_text)
        .or_else(|| diameter_from_text(&up));
    let grade = row
        .get("grade")
        .map(grade_from_text)
        .unwrap_or_else(|| grade_from_text(&up));

    let price_per_m = match (length, size) {
        (Some(l), _) => per_meter(unit_price, l),
        (None, Some(d)) if is_priced_per_kg(&up) => unit_price * d.kg_per_meter(),
        (None, _) => per_meter(unit_price, Length::feet(DEFAULT_REBAR_STICK_FT)),
    };

    Some(SteelRow {
        key: size.and_then(|d| MaterialKey::rebar(d, grade)),
        name,
        kind: SteelKind::Rebar,
        profile: None,
        size,
        grade: Some(grade),
        length,
        unit_price,
        price_per_m,
    })
}

pub fn load_steel(rows: &[CsvRow]) -> SteelPrices {
    let mut out = SteelPrices::default();
    for row in rows {
        let Some(parsed) = parse_steel_row(row) else {
            continue;
        };
        if let Some(key) = parsed.key {
            out.prices.offer(key, parsed.price_per_m);
        } else {
            tracing::debug!("Steel row '{}' has no priced key", parsed.name);
        }
        out.rows.push(parsed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::rows::read_rows_from;

    fn rows(csv: &str) -> Vec<CsvRow> {
        read_rows_from(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_diameter_detection() {
        assert_eq!(diameter_from_text("Rebar 1/2 corr"), Some(RebarDiameter::Half));
        assert_eq!(diameter_from_text("REBAR1 / 2"), Some(RebarDiameter::Half));
        assert_eq!(diameter_from_text("12mm deformed"), Some(RebarDiameter::Half));
        assert_eq!(diameter_from_text("3/8 mild"), Some(RebarDiameter::ThreeEighths));
        assert_eq!(diameter_from_text("Bar 16MM"), Some(RebarDiameter::FiveEighths));
        assert_eq!(diameter_from_text("3/4\" rebar"), Some(RebarDiameter::ThreeQuarters));
        assert_eq!(diameter_from_text("Rebar 1/2 6m"), Some(RebarDiameter::Half));
        assert_eq!(diameter_from_text("20 mm bar"), Some(RebarDiameter::ThreeQuarters));
        assert_eq!(diameter_from_text("112MM flat"), None);
        assert_eq!(diameter_from_text("11/2 pipe"), None);
        assert_eq!(diameter_from_text("rebar"), None);
    }

    #[test]
    fn test_grade_detection() {
        assert_eq!(grade_from_text("1/2 deformed bar"), RebarGrade::Corrugated);
        assert_eq!(grade_from_text("1/2 mild steel"), RebarGrade::Mild);
        assert_eq!(grade_from_text("1/2 MS 20ft"), RebarGrade::Mild);
        assert_eq!(grade_from_text("1/2 smooth"), RebarGrade::Mild);
        assert_eq!(grade_from_text("1/2 bar"), RebarGrade::Corrugated);
    }

    #[test]
    fn test_rebar_with_length_in_meters() {
        let out = load_steel(&rows("name,price\nRebar 1/2 corr 6m,120\n"));
        let p = out.prices.get(MaterialKey::RebarCorr1_2M).unwrap();
        assert!((p - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebar_defaults_to_19ft_stick() {
        let out = load_steel(&rows("name,price\nRebar 3/8 mild,57.912\n"));
        let p = out.prices.get(MaterialKey::RebarMild3_8M).unwrap();
        assert!((p - 57.912 / (19.0 * 0.3048)).abs() < 1e-9);
        assert!((p - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebar_per_kg() {
        let out = load_steel(&rows("name,price\nRebar 5/8 per kg,10\n"));
        let p = out.prices.get(MaterialKey::RebarCorr5_8M).unwrap();
        assert!((p - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_columns_win() {
        let csv = "name,price,length_value,length_unit,size_in,grade\nBar,90,30,ft,1/2,mild\n";
        let out = load_steel(&rows(csv));
        let p = out.prices.get(MaterialKey::RebarMild1_2M).unwrap();
        assert!((p - 90.0 / (30.0 * 0.3048)).abs() < 1e-9);
    }

    #[test]
    fn test_purlin_before_rebar() {
        let out = load_steel(&rows("name,price\nZ Purlin 2x4x20,380\nC PURLIN 1/2 6M,300\n"));
        let z = out.prices.get(MaterialKey::PurlinZM).unwrap();
        assert!((z - 62.34).abs() < 0.01);
        assert!((out.prices.get(MaterialKey::PurlinCM).unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(out.prices.get(MaterialKey::RebarCorr1_2M), None);
    }

    #[test]
    fn test_unkeyed_rows_are_reported_not_priced() {
        let out = load_steel(&rows("name,price\nRebar 3/4 corr,200\nFlat bar,80\n,5\nRebar 1/2,\n"));
        assert!(out.prices.is_empty());
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].size, Some(RebarDiameter::ThreeQuarters));
        assert_eq!(out.rows[1].size, None);
    }

    #[test]
    fn test_duplicate_rebar_keeps_minimum() {
        let out = load_steel(&rows("name,price\nRebar 1/2 6m,120\nRebar 1/2 corr 6m,90\nRebar 1/2 6M,150\n"));
        assert!((out.prices.get(MaterialKey::RebarCorr1_2M).unwrap() - 15.0).abs() < 1e-9);
    }
}
