//! Price table construction from CSV price lists
//!
//! Three spreadsheets feed one canonical map of material key to unit price:
//! aggregates (per m³), steel (per meter) and general building materials.
//! The table is built once, never mutated, and swapped wholesale on reload.

pub mod aggregates;
pub mod building;
pub mod length;
pub mod numeric;
pub mod rows;
pub mod steel;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::MaterialKey;
use thiserror::Error;

use crate::config::PricingConfig;

pub use building::CementGrade;
pub use numeric::parse_price;
pub use rows::normalize_header;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Material key to unit price, where the cheapest listing wins
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceMap(BTreeMap<MaterialKey, f64>);

impl PriceMap {
    /// Record a listing, keeping the lower price on duplicates
    pub fn offer(&mut self, key: MaterialKey, price: f64) {
        self.0
            .entry(key)
            .and_modify(|current| {
                if price < *current {
                    *current = price;
                }
            })
            .or_insert(price);
    }

    /// Overwrite a price regardless of what is listed
    pub fn set(&mut self, key: MaterialKey, price: f64) {
        self.0.insert(key, price);
    }

    pub fn get(&self, key: MaterialKey) -> Option<f64> {
        self.0.get(&key).copied()
    }

    pub fn merge(&mut self, other: &PriceMap) {
        for (key, price) in other.iter() {
            self.offer(key, price);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialKey, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What each loader saw, for diagnostics
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoaderMeta {
    pub steel_rows: Vec<steel::SteelRow>,
    pub building: building::BuildingMeta,
    pub aggregates: PriceMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceTable {
    prices: PriceMap,
    #[serde(skip)]
    meta: LoaderMeta,
    loaded_at: DateTime<Utc>,
}

impl PriceTable {
    pub fn empty() -> Self {
        Self::from_prices(PriceMap::default())
    }

    pub fn from_prices(prices: PriceMap) -> Self {
        Self {
            prices,
            meta: LoaderMeta::default(),
            loaded_at: Utc::now(),
        }
    }

    /// Build the table from the configured CSV files. Missing files contribute
    /// nothing; unreadable or undecodable files fail the whole load.
    pub fn load(config: &PricingConfig) -> Result<Self, PricingError> {
        let cement_grade = config
            .cement_grade
            .as_deref()
            .filter(|g| !g.trim().is_empty())
            .and_then(|g| match g.parse::<CementGrade>() {
                Ok(grade) => Some(grade),
                Err(e) => {
                    tracing::warn!("Ignoring pricing.cement_grade: {}", e);
                    None
                }
            });

        let aggregates = aggregates::load_aggregates(&rows::read_rows(&config.aggregates_path())?);
        let steel = steel::load_steel(&rows::read_rows(&config.steel_path())?);
        let building =
            building::load_building(&rows::read_rows(&config.building_path())?, cement_grade);

        let mut prices = PriceMap::default();
        prices.merge(&aggregates);
        prices.merge(&steel.prices);
        prices.merge(&building.prices);

        tracing::info!(
            "Loaded {} prices ({} aggregates, {} steel, {} building)",
            prices.len(),
            aggregates.len(),
            steel.prices.len(),
            building.prices.len()
        );

        Ok(Self {
            prices,
            meta: LoaderMeta {
                steel_rows: steel.rows,
                building: building.meta,
                aggregates,
            },
            loaded_at: Utc::now(),
        })
    }

    /// Unit price for a key. A plain cement bag falls back to the eco, then
    /// premium, price.
    pub fn get(&self, key: MaterialKey) -> Option<f64> {
        self.prices.get(key).or_else(|| match key {
            MaterialKey::CementBag => self
                .prices
                .get(MaterialKey::CementBagEco)
                .or_else(|| self.prices.get(MaterialKey::CementBagPremium)),
            _ => None,
        })
    }

    pub fn prices(&self) -> &PriceMap {
        &self.prices
    }

    pub fn meta(&self) -> &LoaderMeta {
        &self.meta
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[derive(Debug)]
struct PriceState {
    table: Arc<PriceTable>,
    error: Option<String>,
}

/// Shared handle to the current price table.
///
/// A failed load leaves an empty table and the error message; callers that
/// need prices get that message back instead of a table.
#[derive(Debug, Clone)]
pub struct PriceStore {
    inner: Arc<RwLock<PriceState>>,
}

impl PriceStore {
    pub fn new(table: PriceTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PriceState {
                table: Arc::new(table),
                error: None,
            })),
        }
    }

    /// Load from config, never failing
    pub fn load(config: &PricingConfig) -> Self {
        let store = Self::new(PriceTable::empty());
        if let Err(e) = store.reload(config) {
            tracing::error!("Prices unavailable: {}", e);
        }
        store
    }

    /// Rebuild from the CSV files and swap the table in. On failure the
    /// table is emptied and the error kept for health checks.
    pub fn reload(&self, config: &PricingConfig) -> Result<usize, String> {
        let result = PriceTable::load(config);
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(table) => {
                let count = table.len();
                state.table = Arc::new(table);
                state.error = None;
                Ok(count)
            }
            Err(e) => {
                let message = e.to_string();
                state.table = Arc::new(PriceTable::empty());
                state.error = Some(message.clone());
                Err(message)
            }
        }
    }

    /// Current table, or the reason prices are unavailable
    pub fn current(&self) -> Result<Arc<PriceTable>, String> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match &state.error {
            Some(e) => Err(e.clone()),
            None => Ok(Arc::clone(&state.table)),
        }
    }

    /// Current table and load error together, for reporting
    pub fn snapshot(&self) -> (Arc<PriceTable>, Option<String>) {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        (Arc::clone(&state.table), state.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_keeps_minimum() {
        let mut map = PriceMap::default();
        map.offer(MaterialKey::SandM3, 350.0);
        map.offer(MaterialKey::SandM3, 330.0);
        map.offer(MaterialKey::SandM3, 340.0);
        map.offer(MaterialKey::SandM3, 330.0);
        assert_eq!(map.get(MaterialKey::SandM3), Some(330.0));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_cement_fallback() {
        let mut map = PriceMap::default();
        map.offer(MaterialKey::CementBagPremium, 95.0);
        let table = PriceTable::from_prices(map.clone());
        assert_eq!(table.get(MaterialKey::CementBag), Some(95.0));

        map.offer(MaterialKey::CementBagEco, 85.0);
        let table = PriceTable::from_prices(map.clone());
        assert_eq!(table.get(MaterialKey::CementBag), Some(85.0));

        map.offer(MaterialKey::CementBag, 90.0);
        let table = PriceTable::from_prices(map);
        assert_eq!(table.get(MaterialKey::CementBag), Some(90.0));
        assert_eq!(table.get(MaterialKey::PaintGal), None);
    }

    #[test]
    fn test_serializes_as_key_map() {
        let mut map = PriceMap::default();
        map.offer(MaterialKey::MeshA142Sheet, 450.0);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["mesh_A142_sheet"], 450.0);
    }
}
