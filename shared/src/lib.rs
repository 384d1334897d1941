//! Shared types and arithmetic for ConServ
//!
//! This crate holds the domain types and pure calculations shared between the
//! backend and the browser (via WASM): material keys and units, ERP records,
//! delivery pricing and volume normalization. It performs no I/O.

pub mod delivery;
pub mod models;
pub mod types;
pub mod units;
pub mod validation;

pub use delivery::*;
pub use models::*;
pub use types::*;
pub use units::*;
pub use validation::*;
