//! Configuration management for ConServ
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with CONSERV_ prefix

use std::path::{Path, PathBuf};

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{DeliveryPricing, GeoPoint};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// File upload configuration
    pub uploads: UploadConfig,

    /// Price list CSV sources
    pub pricing: PricingConfig,

    /// Delivery fee knobs
    pub delivery: DeliveryConfig,

    /// Gross profit report constants
    pub reporting: ReportingConfig,

    /// Chat/vision model API
    pub openai: OpenAiConfig,

    /// Hosted payment gateway
    pub wipay: WiPayConfig,

    /// Geocoding and distance matrix
    pub maps: MapsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Externally visible base URL, used for payment redirect/callback URLs
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Directory uploaded images and PDFs are written to
    pub dir: PathBuf,

    /// Request body cap for uploads, in bytes
    pub max_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricingConfig {
    /// Directory bare CSV file names resolve against
    pub data_dir: PathBuf,
    pub aggregates_csv: String,
    pub building_csv: String,
    pub steel_csv: String,
    /// Reported by the health check; no loader reads it yet
    pub lumber_csv: String,
    /// Which cement price becomes `cement_bag`: eco, premium or loose
    #[serde(default)]
    pub cement_grade: Option<String>,
}

impl PricingConfig {
    /// Resolve a configured CSV name. Values that already look like a path
    /// are used as-is, bare file names live in `data_dir`.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() || name.contains('/') || name.contains('\\') {
            path.to_path_buf()
        } else {
            self.data_dir.join(name)
        }
    }

    pub fn aggregates_path(&self) -> PathBuf {
        self.resolve(&self.aggregates_csv)
    }

    pub fn building_path(&self) -> PathBuf {
        self.resolve(&self.building_csv)
    }

    pub fn steel_path(&self) -> PathBuf {
        self.resolve(&self.steel_csv)
    }

    pub fn lumber_path(&self) -> PathBuf {
        self.resolve(&self.lumber_csv)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeliveryConfig {
    /// Warehouse latitude
    pub base_lat: f64,

    /// Warehouse longitude
    pub base_lng: f64,

    pub base_fee: f64,
    pub per_km: f64,
    pub free_radius_km: f64,
}

impl DeliveryConfig {
    pub fn warehouse(&self) -> GeoPoint {
        GeoPoint::new(self.base_lat, self.base_lng)
    }

    pub fn pricing(&self) -> DeliveryPricing {
        DeliveryPricing {
            base_fee: self.base_fee,
            per_km: self.per_km,
            free_radius_km: self.free_radius_km,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportingConfig {
    /// Bags of loose aggregate per cubic yard
    pub bags_per_yd3: Decimal,

    /// Packaging cost of one empty bag
    pub bag_cost: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    /// API key; AI features degrade to empty results when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Primary model
    pub model: String,

    /// Comma-separated fallback models tried after the primary
    #[serde(default)]
    pub fallbacks: Option<String>,

    /// Chat completions endpoint base
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WiPayConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Hosted payment creation endpoint
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapsConfig {
    /// Server-side Google Maps key
    #[serde(default)]
    pub server_key: Option<String>,

    pub distance_matrix_url: String,
    pub geocode_url: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("CONSERV_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.public_url", "http://localhost:5000")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 86400)?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.max_bytes", 25 * 1024 * 1024)?
            .set_default("pricing.data_dir", "data")?
            .set_default("pricing.aggregates_csv", "buildadvisor_aggregates.csv")?
            .set_default("pricing.building_csv", "building materials.csv")?
            .set_default("pricing.steel_csv", "steel.csv")?
            .set_default("pricing.lumber_csv", "lumber.csv")?
            .set_default("delivery.base_lat", 0.0)?
            .set_default("delivery.base_lng", 0.0)?
            .set_default("delivery.base_fee", 50.0)?
            .set_default("delivery.per_km", 5.0)?
            .set_default("delivery.free_radius_km", 0.0)?
            .set_default("reporting.bags_per_yd3", "20")?
            .set_default("reporting.bag_cost", "0")?
            .set_default("openai.model", "gpt-4o-mini")?
            .set_default("openai.base_url", "https://api.openai.com/v1")?
            .set_default("wipay.endpoint", "https://sandbox-api.wipayfinancial.com/v1/payments")?
            .set_default(
                "maps.distance_matrix_url",
                "https://maps.googleapis.com/maps/api/distancematrix/json",
            )?
            .set_default("maps.geocode_url", "https://maps.googleapis.com/maps/api/geocode/json")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CONSERV_ prefix)
            .add_source(
                Environment::with_prefix("CONSERV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricing(data_dir: &str) -> PricingConfig {
        PricingConfig {
            data_dir: PathBuf::from(data_dir),
            aggregates_csv: "buildadvisor_aggregates.csv".into(),
            building_csv: "building materials.csv".into(),
            steel_csv: "/srv/prices/steel.csv".into(),
            lumber_csv: "nested/lumber.csv".into(),
            cement_grade: None,
        }
    }

    #[test]
    fn test_bare_names_resolve_in_data_dir() {
        let cfg = pricing("data");
        assert_eq!(cfg.building_path(), PathBuf::from("data/building materials.csv"));
        assert_eq!(cfg.aggregates_path(), PathBuf::from("data/buildadvisor_aggregates.csv"));
    }

    #[test]
    fn test_paths_are_used_as_is() {
        let cfg = pricing("data");
        assert_eq!(cfg.steel_path(), PathBuf::from("/srv/prices/steel.csv"));
        assert_eq!(cfg.lumber_path(), PathBuf::from("nested/lumber.csv"));
    }
}
