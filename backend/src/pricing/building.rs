//! General building materials list: cement, blocks, mesh, wire, purlins, paint

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use shared::{round2, MaterialKey};

use super::length::{parse_length, per_meter};
use super::numeric::parse_price;
use super::rows::CsvRow;
use super::steel::PurlinProfile;
use super::PriceMap;

/// Pounds in one 42.5 kg bag of cement
pub const LOOSE_LBS_PER_BAG: f64 = 42.5 * 2.20462;

const CEMENT_LOOKALIKES: [&str; 4] = ["BOARD", "ADHESIVE", "THINSET", "CONTACT"];

static BLOCK_SIZES: Lazy<Vec<(u8, Regex)>> = Lazy::new(|| {
    [4u8, 6, 8]
        .into_iter()
        .map(|size| {
            let pattern = format!(r#"(?:^|\s){size}\s*(?:"|IN(?:CH)?(?:ES)?)?\b|{size}X8X16"#);
            (size, Regex::new(&pattern).expect("valid block regex"))
        })
        .collect()
});

/// Which cement price is quoted as the plain `cement_bag`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CementGrade {
    Eco,
    Premium,
    Loose,
}

impl FromStr for CementGrade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eco" => Ok(CementGrade::Eco),
            "premium" => Ok(CementGrade::Premium),
            "loose" => Ok(CementGrade::Loose),
            other => Err(format!("unknown cement grade '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildingItem {
    Cement(MaterialKey),
    Block { size: Option<u8>, clay: bool },
    Mesh,
    TieWire,
    Purlin(Option<PurlinProfile>),
    Paint,
}

impl BuildingItem {
    fn key(&self) -> Option<MaterialKey> {
        match *self {
            BuildingItem::Cement(key) => Some(key),
            BuildingItem::Block { size: Some(4), clay: true } => Some(MaterialKey::BlockClay4In),
            BuildingItem::Block { clay: true, .. } => None,
            BuildingItem::Block { size, clay: false } => match size? {
                4 => Some(MaterialKey::Block4In),
                6 => Some(MaterialKey::Block6In),
                8 => Some(MaterialKey::Block8In),
                _ => None,
            },
            BuildingItem::Mesh => Some(MaterialKey::MeshA142Sheet),
            BuildingItem::TieWire => Some(MaterialKey::TieWireKg),
            BuildingItem::Purlin(profile) => profile.map(|p| p.key()),
            BuildingItem::Paint => Some(MaterialKey::PaintGal),
        }
    }
}

/// Classify an item name. Rules are tried in a fixed order and the first
/// one that matches decides, even when it yields no priced key. Within the
/// block rule the largest matching size wins.
pub fn classify(name: &str) -> Option<BuildingItem> {
    let up = name.to_uppercase();

    if up.contains("CEMENT") && !CEMENT_LOOKALIKES.iter().any(|w| up.contains(w)) {
        let key = if up.contains("PREMIUM") {
            MaterialKey::CementBagPremium
        } else if up.contains("ECO") {
            MaterialKey::CementBagEco
        } else if up.contains("LOOSE") || up.contains(" PER LB") || up.contains("LB") {
            MaterialKey::CementLooseLb
        } else {
            MaterialKey::CementBag
        };
        return Some(BuildingItem::Cement(key));
    }

    if up.contains("BLOCK") {
        let size = BLOCK_SIZES
            .iter()
            .rev()
            .find(|(_, re)| re.is_match(&up))
            .map(|(size, _)| *size);
        return Some(BuildingItem::Block {
            size,
            clay: up.contains("CLAY") || up.contains("RED"),
        });
    }

    if up.contains("MESH") && up.contains("A142") {
        return Some(BuildingItem::Mesh);
    }

    if up.contains("TIE WIRE") || up.contains("BINDING WIRE") {
        return Some(BuildingItem::TieWire);
    }

    if up.contains("PURLIN") {
        return Some(BuildingItem::Purlin(PurlinProfile::detect(&up)));
    }

    if (up.contains("PAINT") || up.contains("EMULSION")) && up.contains("GAL") {
        return Some(BuildingItem::Paint);
    }

    None
}

#[derive(Debug, Clone, Serialize)]
pub struct PurlinEntry {
    pub name: String,
    pub profile: Option<PurlinProfile>,
    pub price_per_m: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockEntry {
    pub name: String,
    pub size_in: Option<u8>,
    pub clay: bool,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CementEntry {
    pub name: String,
    pub key: MaterialKey,
    pub price: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildingMeta {
    pub purlins: Vec<PurlinEntry>,
    pub blocks: Vec<BlockEntry>,
    pub cement: Vec<CementEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildingPrices {
    pub prices: PriceMap,
    pub meta: BuildingMeta,
}

pub fn load_building(rows: &[CsvRow], cement_grade: Option<CementGrade>) -> BuildingPrices {
    let mut out = BuildingPrices::default();

    for row in rows {
        let (Some(name), Some(price)) = (row.name(), row.price_text().and_then(parse_price)) else {
            continue;
        };
        let Some(item) = classify(name) else {
            continue;
        };

        let price = match item {
            BuildingItem::Purlin(profile) => {
                let price_per_m = parse_length(name).map_or(price, |l| per_meter(price, l));
                out.meta.purlins.push(PurlinEntry {
                    name: name.to_string(),
                    profile,
                    price_per_m,
                });
                price_per_m
            }
            BuildingItem::Block { size, clay } => {
                out.meta.blocks.push(BlockEntry {
                    name: name.to_string(),
                    size_in: size,
                    clay,
                    price,
                });
                price
            }
            BuildingItem::Cement(key) => {
                out.meta.cement.push(CementEntry {
                    name: name.to_string(),
                    key,
                    price,
                });
                price
            }
            _ => price,
        };

        if let Some(key) = item.key() {
            out.prices.offer(key, price);
        }
    }

    if let Some(grade) = cement_grade {
        apply_cement_grade(&mut out.prices, grade);
    }
    out
}

/// Quote the preferred cement as `cement_bag`. Overrides any plain bag price.
pub fn apply_cement_grade(prices: &mut PriceMap, grade: CementGrade) {
    let bag = match grade {
        CementGrade::Eco => prices.get(MaterialKey::CementBagEco),
        CementGrade::Premium => prices.get(MaterialKey::CementBagPremium),
        CementGrade::Loose => prices
            .get(MaterialKey::CementLooseLb)
            .map(|lb| round2(LOOSE_LBS_PER_BAG * lb)),
    };
    match bag {
        Some(price) => prices.set(MaterialKey::CementBag, price),
        None => tracing::warn!("Cement grade {:?} preferred but not listed", grade),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::rows::read_rows_from;

    fn load(csv: &str, grade: Option<CementGrade>) -> BuildingPrices {
        load_building(&read_rows_from(csv.as_bytes()).unwrap(), grade)
    }

    #[test]
    fn test_cement_variants() {
        assert_eq!(
            classify("Premium Cement 42.5kg"),
            Some(BuildingItem::Cement(MaterialKey::CementBagPremium))
        );
        assert_eq!(
            classify("TCL Eco Cement"),
            Some(BuildingItem::Cement(MaterialKey::CementBagEco))
        );
        assert_eq!(
            classify("Cement loose per lb"),
            Some(BuildingItem::Cement(MaterialKey::CementLooseLb))
        );
        assert_eq!(
            classify("Cement 42.5kg bag"),
            Some(BuildingItem::Cement(MaterialKey::CementBag))
        );
        assert_eq!(classify("Cement Board 4x8"), None);
        assert_eq!(classify("Contact cement quart"), None);
    }

    #[test]
    fn test_block_sizes() {
        assert_eq!(
            classify("Concrete Block 6\""),
            Some(BuildingItem::Block { size: Some(6), clay: false })
        );
        assert_eq!(
            classify("BLOCK 4X8X16"),
            Some(BuildingItem::Block { size: Some(4), clay: false })
        );
        assert_eq!(
            classify("Block 8 inch"),
            Some(BuildingItem::Block { size: Some(8), clay: false })
        );
        assert_eq!(
            classify("Red clay block 4\""),
            Some(BuildingItem::Block { size: Some(4), clay: true })
        );
        assert_eq!(
            classify("Block 6\" x 8 x 16"),
            Some(BuildingItem::Block { size: Some(8), clay: false })
        );
        assert_eq!(
            classify("Block 4\" or 6\""),
            Some(BuildingItem::Block { size: Some(6), clay: false })
        );
        assert_eq!(classify("Block 40"), Some(BuildingItem::Block { size: None, clay: false }));
    }

    #[test]
    fn test_clay_marker_matches_inside_words() {
        let coloured = classify("Coloured block 4\"");
        assert_eq!(coloured, Some(BuildingItem::Block { size: Some(4), clay: true }));
        assert_eq!(coloured.and_then(|item| item.key()), Some(MaterialKey::BlockClay4In));

        let clay6 = classify("Clayblock 6in");
        assert_eq!(clay6, Some(BuildingItem::Block { size: Some(6), clay: true }));
        assert_eq!(clay6.and_then(|item| item.key()), None);

        let csv = "name,price\nColoured Block 6in,14\nConcrete Block 6in,11\n";
        let out = load(csv, None);
        assert_eq!(out.prices.get(MaterialKey::Block6In), Some(11.0));
        assert_eq!(out.prices.len(), 1);
    }

    #[test]
    fn test_other_rules() {
        assert_eq!(classify("Wire Mesh A142 sheet"), Some(BuildingItem::Mesh));
        assert_eq!(classify("Tie wire 25kg roll"), Some(BuildingItem::TieWire));
        assert_eq!(classify("Binding Wire"), Some(BuildingItem::TieWire));
        assert_eq!(
            classify("Z Purlin 2x4x20"),
            Some(BuildingItem::Purlin(Some(PurlinProfile::Z)))
        );
        assert_eq!(classify("Emulsion paint white 1 gal"), Some(BuildingItem::Paint));
        assert_eq!(classify("Paint brush 2\""), None);
        assert_eq!(classify("Plywood 4x8"), None);
    }

    #[test]
    fn test_rule_order_cement_before_block() {
        assert_eq!(
            classify("Block cement 42.5kg"),
            Some(BuildingItem::Cement(MaterialKey::CementBag))
        );
    }

    #[test]
    fn test_load_building() {
        let csv = "Item Name,SELLING\n\
            Z Purlin 2x4x20,380\n\
            Concrete Block 4in,9.50\n\
            Concrete Block 4 inch,8.75\n\
            Clay block 6in,12\n\
            Cement 42.5kg,\"$1,090.00\"\n\
            Mesh A142,450\n\
            Hammer,80\n";
        let out = load(csv, None);
        assert!((out.prices.get(MaterialKey::PurlinZM).unwrap() - 62.34).abs() < 0.01);
        assert_eq!(out.prices.get(MaterialKey::Block4In), Some(8.75));
        assert_eq!(out.prices.get(MaterialKey::CementBag), Some(1090.0));
        assert_eq!(out.prices.get(MaterialKey::MeshA142Sheet), Some(450.0));
        assert_eq!(out.prices.get(MaterialKey::BlockClay4In), None);
        assert_eq!(out.prices.len(), 4);
        assert_eq!(out.meta.blocks.len(), 3);
        assert_eq!(out.meta.purlins.len(), 1);
        assert_eq!(out.meta.cement.len(), 1);
    }

    #[test]
    fn test_cement_grade_preference() {
        let csv = "name,price\nCement,90\nEco cement,85\nPremium cement,95\nCement loose LB,1\n";

        let eco = load(csv, Some(CementGrade::Eco));
        assert_eq!(eco.prices.get(MaterialKey::CementBag), Some(85.0));

        let premium = load(csv, Some(CementGrade::Premium));
        assert_eq!(premium.prices.get(MaterialKey::CementBag), Some(95.0));

        let loose = load(csv, Some(CementGrade::Loose));
        assert_eq!(loose.prices.get(MaterialKey::CementBag), Some(93.7));

        let plain = load(csv, None);
        assert_eq!(plain.prices.get(MaterialKey::CementBag), Some(90.0));
    }

    #[test]
    fn test_cement_grade_parse() {
        assert_eq!("ECO".parse::<CementGrade>(), Ok(CementGrade::Eco));
        assert_eq!(" loose ".parse::<CementGrade>(), Ok(CementGrade::Loose));
        assert!("grey".parse::<CementGrade>().is_err());
    }
}
