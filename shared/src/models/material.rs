//! Canonical material keys and measurement units

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A priced inventory item.
///
/// This is the allow-list: every price table entry, estimate line and
/// material-tagged ERP line must resolve to one of these keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaterialKey {
    // Aggregates (per m³)
    #[serde(rename = "sand_m3")]
    SandM3,
    #[serde(rename = "sharp_sand_m3")]
    SharpSandM3,
    #[serde(rename = "gravel_m3")]
    GravelM3,
    #[serde(rename = "red_sand_m3")]
    RedSandM3,
    #[serde(rename = "backfill_m3")]
    BackfillM3,
    #[serde(rename = "soakaway_boulders_m3")]
    SoakawayBouldersM3,
    // Cement
    #[serde(rename = "cement_bag")]
    CementBag,
    #[serde(rename = "cement_bag_eco")]
    CementBagEco,
    #[serde(rename = "cement_bag_premium")]
    CementBagPremium,
    #[serde(rename = "cement_loose_lb")]
    CementLooseLb,
    // Blocks
    #[serde(rename = "block_4in")]
    Block4In,
    #[serde(rename = "block_6in")]
    Block6In,
    #[serde(rename = "block_8in")]
    Block8In,
    #[serde(rename = "block_clay_4in")]
    BlockClay4In,
    // Steel (per meter)
    #[serde(rename = "rebar_corr_3_8_m")]
    RebarCorr3_8M,
    #[serde(rename = "rebar_corr_1_2_m")]
    RebarCorr1_2M,
    #[serde(rename = "rebar_corr_5_8_m")]
    RebarCorr5_8M,
    #[serde(rename = "rebar_mild_3_8_m")]
    RebarMild3_8M,
    #[serde(rename = "rebar_mild_1_2_m")]
    RebarMild1_2M,
    #[serde(rename = "rebar_mild_5_8_m")]
    RebarMild5_8M,
    // Mesh, wire, purlins
    #[serde(rename = "mesh_A142_sheet")]
    MeshA142Sheet,
    #[serde(rename = "tie_wire_kg")]
    TieWireKg,
    #[serde(rename = "purlin_z_m")]
    PurlinZM,
    #[serde(rename = "purlin_c_m")]
    PurlinCM,
    // Paint
    #[serde(rename = "paint_gal")]
    PaintGal,
}

impl MaterialKey {
    pub const ALL: [MaterialKey; 25] = [
        MaterialKey::SandM3,
        MaterialKey::SharpSandM3,
        MaterialKey::GravelM3,
        MaterialKey::RedSandM3,
        MaterialKey::BackfillM3,
        MaterialKey::SoakawayBouldersM3,
        MaterialKey::CementBag,
        MaterialKey::CementBagEco,
        MaterialKey::CementBagPremium,
        MaterialKey::CementLooseLb,
        MaterialKey::Block4In,
        MaterialKey::Block6In,
        MaterialKey::Block8In,
        MaterialKey::BlockClay4In,
        MaterialKey::RebarCorr3_8M,
        MaterialKey::RebarCorr1_2M,
        MaterialKey::RebarCorr5_8M,
        MaterialKey::RebarMild3_8M,
        MaterialKey::RebarMild1_2M,
        MaterialKey::RebarMild5_8M,
        MaterialKey::MeshA142Sheet,
        MaterialKey::TieWireKg,
        MaterialKey::PurlinZM,
        MaterialKey::PurlinCM,
        MaterialKey::PaintGal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialKey::SandM3 => "sand_m3",
            MaterialKey::SharpSandM3 => "sharp_sand_m3",
            MaterialKey::GravelM3 => "gravel_m3",
            MaterialKey::RedSandM3 => "red_sand_m3",
            MaterialKey::BackfillM3 => "backfill_m3",
            MaterialKey::SoakawayBouldersM3 => "soakaway_boulders_m3",
            MaterialKey::CementBag => "cement_bag",
            MaterialKey::CementBagEco => "cement_bag_eco",
            MaterialKey::CementBagPremium => "cement_bag_premium",
            MaterialKey::CementLooseLb => "cement_loose_lb",
            MaterialKey::Block4In => "block_4in",
            MaterialKey::Block6In => "block_6in",
            MaterialKey::Block8In => "block_8in",
            MaterialKey::BlockClay4In => "block_clay_4in",
            MaterialKey::RebarCorr3_8M => "rebar_corr_3_8_m",
            MaterialKey::RebarCorr1_2M => "rebar_corr_1_2_m",
            MaterialKey::RebarCorr5_8M => "rebar_corr_5_8_m",
            MaterialKey::RebarMild3_8M => "rebar_mild_3_8_m",
            MaterialKey::RebarMild1_2M => "rebar_mild_1_2_m",
            MaterialKey::RebarMild5_8M => "rebar_mild_5_8_m",
            MaterialKey::MeshA142Sheet => "mesh_A142_sheet",
            MaterialKey::TieWireKg => "tie_wire_kg",
            MaterialKey::PurlinZM => "purlin_z_m",
            MaterialKey::PurlinCM => "purlin_c_m",
            MaterialKey::PaintGal => "paint_gal",
        }
    }

    /// Human readable label, e.g. `sharp_sand_m3` -> `sharp sand (m³)`
    pub fn pretty_name(&self) -> String {
        let key = self.as_str();
        let suffixes = [
            ("_m3", " (m³)"),
            ("_m", " (m)"),
            ("_gal", " (gal)"),
            ("_bag", " (bag)"),
            ("_sheet", " (sheet)"),
            ("_kg", " (kg)"),
        ];
        for (suffix, label) in suffixes {
            if let Some(stem) = key.strip_suffix(suffix) {
                return format!("{}{}", stem.replace('_', " "), label);
            }
        }
        key.replace('_', " ")
    }

    /// Rebar key for a nominal diameter and grade. 3/4" has no priced key.
    pub fn rebar(diameter: RebarDiameter, grade: RebarGrade) -> Option<MaterialKey> {
        use RebarDiameter::*;
        use RebarGrade::*;
        match (grade, diameter) {
            (Corrugated, ThreeEighths) => Some(MaterialKey::RebarCorr3_8M),
            (Corrugated, Half) => Some(MaterialKey::RebarCorr1_2M),
            (Corrugated, FiveEighths) => Some(MaterialKey::RebarCorr5_8M),
            (Mild, ThreeEighths) => Some(MaterialKey::RebarMild3_8M),
            (Mild, Half) => Some(MaterialKey::RebarMild1_2M),
            (Mild, FiveEighths) => Some(MaterialKey::RebarMild5_8M),
            (_, ThreeQuarters) => None,
        }
    }
}

impl std::fmt::Display for MaterialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialKey {
    type Err = UnknownMaterialKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterialKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownMaterialKey(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown material key: {0}")]
pub struct UnknownMaterialKey(pub String);

/// Nominal rebar diameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebarDiameter {
    #[serde(rename = "3/8")]
    ThreeEighths,
    #[serde(rename = "1/2")]
    Half,
    #[serde(rename = "5/8")]
    FiveEighths,
    #[serde(rename = "3/4")]
    ThreeQuarters,
}

impl RebarDiameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            RebarDiameter::ThreeEighths => "3/8",
            RebarDiameter::Half => "1/2",
            RebarDiameter::FiveEighths => "5/8",
            RebarDiameter::ThreeQuarters => "3/4",
        }
    }

    /// Approximate mass per meter of bar, in kg
    pub fn kg_per_meter(&self) -> f64 {
        match self {
            RebarDiameter::ThreeEighths => 0.560,
            RebarDiameter::Half => 0.994,
            RebarDiameter::FiveEighths => 1.550,
            RebarDiameter::ThreeQuarters => 2.260,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebarGrade {
    Corrugated,
    Mild,
}

/// Units accepted on estimate lines and staff purchase/sales lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Yd3,
    M3,
    M,
    Kg,
    Bag,
    Sheet,
    Pcs,
    Gal,
    Lb,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Yd3 => "yd3",
            Unit::M3 => "m3",
            Unit::M => "m",
            Unit::Kg => "kg",
            Unit::Bag => "bag",
            Unit::Sheet => "sheet",
            Unit::Pcs => "pcs",
            Unit::Gal => "gal",
            Unit::Lb => "lb",
        }
    }

    /// Normalize a free-form unit for customer estimates. Cubic yards are not
    /// an estimator unit.
    pub fn parse_estimate(raw: &str) -> Option<Unit> {
        match Self::parse_staff(raw)? {
            Unit::Yd3 => None,
            unit => Some(unit),
        }
    }

    /// Normalize a free-form unit for staff purchase and sales entry.
    pub fn parse_staff(raw: &str) -> Option<Unit> {
        let u = raw.trim().to_lowercase();
        let unit = match u.as_str() {
            "yd3" | "yd" | "yds" | "yard" | "yards" | "yd^3" | "yd³" | "cubic yard"
            | "cubic yards" => Unit::Yd3,
            "m3" | "m^3" | "m³" | "cubic meter" | "cubic meters" | "cubic metre"
            | "cubic metres" => Unit::M3,
            "m" | "meter" | "meters" | "metre" | "metres" => Unit::M,
            "kg" => Unit::Kg,
            "bag" | "bags" => Unit::Bag,
            "sheet" | "sheets" => Unit::Sheet,
            "pcs" | "piece" | "pieces" => Unit::Pcs,
            "gal" | "gallon" | "gallons" => Unit::Gal,
            "lb" | "pound" | "pounds" => Unit::Lb,
            _ => return None,
        };
        Some(unit)
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trips_through_str() {
        for key in MaterialKey::ALL {
            assert_eq!(key.as_str().parse::<MaterialKey>().unwrap(), key);
        }
        assert!("lumber_2x4".parse::<MaterialKey>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_key() {
        let json = serde_json::to_string(&MaterialKey::MeshA142Sheet).unwrap();
        assert_eq!(json, "\"mesh_A142_sheet\"");
    }

    #[test]
    fn test_pretty_name() {
        assert_eq!(MaterialKey::SharpSandM3.pretty_name(), "sharp sand (m³)");
        assert_eq!(MaterialKey::RebarCorr1_2M.pretty_name(), "rebar corr 1 2 (m)");
        assert_eq!(MaterialKey::CementBag.pretty_name(), "cement (bag)");
        assert_eq!(MaterialKey::Block4In.pretty_name(), "block 4in");
    }

    #[test]
    fn test_unit_synonyms() {
        assert_eq!(Unit::parse_estimate("Meters"), Some(Unit::M));
        assert_eq!(Unit::parse_estimate("cubic metres"), Some(Unit::M3));
        assert_eq!(Unit::parse_estimate("pieces"), Some(Unit::Pcs));
        assert_eq!(Unit::parse_estimate("yards"), None);
        assert_eq!(Unit::parse_staff("yards"), Some(Unit::Yd3));
        assert_eq!(Unit::parse_staff("tonnes"), None);
    }
}
