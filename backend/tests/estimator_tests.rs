//! BuildAdvisor estimate pricing tests
//!
//! The model only ever proposes quantities; every price comes from the
//! table. These tests cover priced and unpriced lines and the total.

use conserv_backend::pricing::{PriceMap, PriceTable};
use conserv_backend::services::estimator::price_bom_lines;
use proptest::prelude::*;
use shared::{BomLine, MaterialKey, Unit, UNPRICED_SUFFIX};

fn table(entries: &[(MaterialKey, f64)]) -> PriceTable {
    let mut prices = PriceMap::default();
    for (key, price) in entries {
        prices.set(*key, *price);
    }
    PriceTable::from_prices(prices)
}

fn bom(key: MaterialKey, qty: f64, unit: Unit) -> BomLine {
    BomLine { key, qty, unit }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_slab_estimate() {
        let table = table(&[
            (MaterialKey::CementBag, 85.0),
            (MaterialKey::SandM3, 330.0),
            (MaterialKey::GravelM3, 520.0),
            (MaterialKey::MeshA142Sheet, 450.0),
        ]);
        let lines = [
            bom(MaterialKey::CementBag, 12.0, Unit::Bag),
            bom(MaterialKey::SandM3, 0.75, Unit::M3),
            bom(MaterialKey::GravelM3, 1.5, Unit::M3),
            bom(MaterialKey::MeshA142Sheet, 2.0, Unit::Sheet),
        ];
        let estimate = price_bom_lines(&lines, &table);

        assert_eq!(estimate.lines.len(), 4);
        assert!(estimate.lines.iter().all(|l| l.is_priced()));
        assert_eq!(estimate.lines[1].total, 247.5);
        // 1020 + 247.5 + 780 + 900
        assert_eq!(estimate.total, 2947.5);
    }

    #[test]
    fn test_unpriced_lines_are_kept_at_zero() {
        let table = table(&[(MaterialKey::Block6In, 7.5)]);
        let lines = [
            bom(MaterialKey::Block6In, 200.0, Unit::Pcs),
            bom(MaterialKey::PaintGal, 3.0, Unit::Gal),
        ];
        let estimate = price_bom_lines(&lines, &table);

        let paint = &estimate.lines[1];
        assert!(!paint.is_priced());
        assert!(paint.name.ends_with(UNPRICED_SUFFIX));
        assert_eq!(paint.qty, 3.0);
        assert_eq!(paint.unit_price, 0.0);
        assert_eq!(paint.total, 0.0);
        assert_eq!(estimate.total, 1500.0);
    }

    #[test]
    fn test_plain_cement_uses_eco_price() {
        let table = table(&[(MaterialKey::CementBagEco, 82.0)]);
        let estimate = price_bom_lines(&[bom(MaterialKey::CementBag, 10.0, Unit::Bag)], &table);
        assert!(estimate.lines[0].is_priced());
        assert_eq!(estimate.total, 820.0);
    }

    #[test]
    fn test_empty_bill_is_zero() {
        let estimate = price_bom_lines(&[], &PriceTable::empty());
        assert!(estimate.lines.is_empty());
        assert_eq!(estimate.total, 0.0);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn key_strategy() -> impl Strategy<Value = MaterialKey> {
    prop::sample::select(MaterialKey::ALL.to_vec())
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Every proposed line survives pricing, priced or not
        #[test]
        fn prop_lines_are_never_dropped(
            keys in prop::collection::vec(key_strategy(), 0..15),
            priced in prop::collection::vec(key_strategy(), 0..10),
        ) {
            let table = table(&priced.iter().map(|k| (*k, 10.0)).collect::<Vec<_>>());
            let lines: Vec<BomLine> = keys.iter().map(|k| bom(*k, 1.0, Unit::Pcs)).collect();
            let estimate = price_bom_lines(&lines, &table);
            prop_assert_eq!(estimate.lines.len(), lines.len());
            for (line, priced_line) in lines.iter().zip(&estimate.lines) {
                prop_assert_eq!(line.key, priced_line.key);
            }
        }

        /// Unpriced lines never contribute to the total
        #[test]
        fn prop_total_counts_priced_lines_only(qtys in prop::collection::vec(1u32..500, 1..10)) {
            let table = table(&[(MaterialKey::Block4In, 6.0)]);
            let mut lines = Vec::new();
            for q in &qtys {
                lines.push(bom(MaterialKey::Block4In, *q as f64, Unit::Pcs));
                lines.push(bom(MaterialKey::TieWireKg, *q as f64, Unit::Kg));
            }
            let estimate = price_bom_lines(&lines, &table);
            let expected: f64 = qtys.iter().map(|q| *q as f64 * 6.0).sum();
            prop_assert_eq!(estimate.total, expected);
        }
    }
}
