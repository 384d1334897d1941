//! Aggregates list: explicit `key,price` rows priced per cubic meter

use shared::MaterialKey;

use super::numeric::parse_price;
use super::rows::CsvRow;
use super::PriceMap;

pub fn load_aggregates(rows: &[CsvRow]) -> PriceMap {
    let mut prices = PriceMap::default();
    for row in rows {
        let Some(raw_key) = row.get("key") else {
            continue;
        };
        let Some(price) = row.first_of(&["price", "selling"]).and_then(parse_price) else {
            continue;
        };
        match raw_key.parse::<MaterialKey>() {
            Ok(key) => prices.offer(key, price),
            Err(e) => tracing::debug!("Skipping aggregate row: {}", e),
        }
    }
    prices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::rows::read_rows_from;

    #[test]
    fn test_load_aggregates() {
        let csv = "Key,Price\n\
            sand_m3,350\n\
            sharp_sand_m3,\"TTD 410\"\n\
            gravel_m3,520\n\
            sand_m3,330\n\
            topsoil_m3,200\n\
            backfill_m3,\n";
        let prices = load_aggregates(&read_rows_from(csv.as_bytes()).unwrap());
        assert_eq!(prices.get(MaterialKey::SandM3), Some(330.0));
        assert_eq!(prices.get(MaterialKey::SharpSandM3), Some(410.0));
        assert_eq!(prices.get(MaterialKey::GravelM3), Some(520.0));
        assert_eq!(prices.len(), 3);
    }
}
