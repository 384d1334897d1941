//! ConServ backend
//!
//! Storefront, BuildAdvisor estimator and staff back office for a
//! construction-materials business.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod pricing;
pub mod routes;
pub mod services;

pub use config::Config;

use external::{MapsClient, OpenAiClient, WiPayClient};
use pricing::PriceStore;
use services::UploadService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub prices: PriceStore,
    pub openai: Arc<OpenAiClient>,
    pub maps: Arc<MapsClient>,
    pub wipay: Arc<WiPayClient>,
    pub uploads: UploadService,
}

impl AppState {
    /// Build the state, loading the price table from the configured CSVs.
    /// A failed load leaves an empty table and a stored error.
    pub fn new(db: PgPool, config: Config) -> Self {
        let prices = PriceStore::load(&config.pricing);
        Self {
            prices,
            openai: Arc::new(OpenAiClient::new(&config.openai)),
            maps: Arc::new(MapsClient::new(&config.maps)),
            wipay: Arc::new(WiPayClient::new(&config.wipay)),
            uploads: UploadService::new(config.uploads.dir.clone()),
            config: Arc::new(config),
            db,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = routes::api_routes(state.clone())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/payment-callback", post(handlers::payment_callback))
        .route("/payment-success", get(handlers::payment_success))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()))
        .layer(DefaultBodyLimit::max(state.config.uploads.max_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
